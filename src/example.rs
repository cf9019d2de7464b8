use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, XlsxError};
use std::path::Path;

use crate::book::ARCHETYPE_SHEET;
use crate::record::{TOTAL_HOURS, TOTAL_OT, TOTAL_REG};

const FONT_NAME: &str = "Verdana";
const DAYS_PER_WEEK: usize = 7;
const REGULAR_HOURS_PER_WEEK: f64 = 40.0;
/// Day rows 2..=15 hold a two week pay period.
const TEMPLATE_DAY_ROWS: u32 = 14;

struct Shift {
    clock_in: f64,
    clock_out: f64,
}

struct SampleEmployee {
    name: &'static str,
    position: &'static str,
    location: &'static str,
    shifts: [Option<Shift>; DAYS_PER_WEEK],
}

const fn shift(clock_in: f64, clock_out: f64) -> Option<Shift> {
    Some(Shift { clock_in, clock_out })
}

const SAMPLE: [SampleEmployee; 3] = [
    SampleEmployee {
        name: "Jane Doe",
        position: "Store Manager",
        location: "Main Street",
        shifts: [shift(8.0, 17.0), shift(8.0, 17.0), shift(8.0, 17.0), shift(8.0, 17.0), shift(8.0, 17.5), None, None],
    },
    SampleEmployee {
        name: "John Smith",
        position: "",
        location: "Warehouse",
        shifts: [None, shift(6.0, 14.5), shift(6.0, 14.5), shift(6.0, 14.5), shift(6.0, 14.5), shift(6.0, 12.0), None],
    },
    SampleEmployee {
        name: "María O'Neil",
        position: "Cashier",
        location: "Main Street",
        shifts: [shift(12.0, 16.25), None, shift(12.0, 16.25), None, shift(12.0, 16.25), None, None],
    },
];

/// Write a sample source workbook in the layout the generator expects.
pub fn write_example_source(path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let header_fmt = Format::new().set_bold().set_border(FormatBorder::Thin).set_background_color(Color::RGB(0xF28E00)).set_font_name(FONT_NAME).set_font_size(10);
    let text_fmt = Format::new().set_font_name(FONT_NAME).set_font_size(10);
    let time_fmt = Format::new().set_num_format("h:mm AM/PM").set_align(FormatAlign::Center).set_font_name(FONT_NAME).set_font_size(10);
    let hours_fmt = Format::new().set_num_format("0.00").set_align(FormatAlign::Center).set_font_name(FONT_NAME).set_font_size(10);

    // --- Header Row ---
    let mut headers: Vec<String> = vec!["Name".into(), "Position".into(), "Location".into()];
    for day in 1..=DAYS_PER_WEEK {
        headers.push(format!("Day {} In", day));
        headers.push(format!("Day {} Out", day));
        headers.push(format!("Day {} Hours", day));
    }
    headers.extend([TOTAL_HOURS.to_string(), TOTAL_REG.to_string(), TOTAL_OT.to_string()]);

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_fmt)?;
    }
    worksheet.set_column_width(0, 20)?;
    worksheet.set_column_width(1, 16)?;
    worksheet.set_column_width(2, 14)?;

    // --- Employee Rows ---
    for (idx, employee) in SAMPLE.iter().enumerate() {
        let row = (idx + 1) as u32;
        worksheet.write_string_with_format(row, 0, employee.name, &text_fmt)?;
        if !employee.position.is_empty() {
            worksheet.write_string_with_format(row, 1, employee.position, &text_fmt)?;
        }
        worksheet.write_string_with_format(row, 2, employee.location, &text_fmt)?;

        let mut week_total = 0.0;
        for (day, shift) in employee.shifts.iter().enumerate() {
            let col = (3 + day * 3) as u16;
            match shift {
                Some(s) => {
                    let hours = s.clock_out - s.clock_in;
                    week_total += hours;
                    worksheet.write_number_with_format(row, col, s.clock_in / 24.0, &time_fmt)?;
                    worksheet.write_number_with_format(row, col + 1, s.clock_out / 24.0, &time_fmt)?;
                    worksheet.write_number_with_format(row, col + 2, hours, &hours_fmt)?;
                }
                None => {
                    worksheet.write_number_with_format(row, col + 2, 0.0, &hours_fmt)?;
                }
            }
        }

        let totals_col = (3 + DAYS_PER_WEEK * 3) as u16;
        let regular = week_total.min(REGULAR_HOURS_PER_WEEK);
        worksheet.write_number_with_format(row, totals_col, week_total, &hours_fmt)?;
        worksheet.write_number_with_format(row, totals_col + 1, regular, &hours_fmt)?;
        worksheet.write_number_with_format(row, totals_col + 2, week_total - regular, &hours_fmt)?;
    }

    worksheet.set_freeze_panes(1, 3)?;
    workbook.save(path)?;
    Ok(())
}

/// Write a starter template: one `Template` sheet with the cells the generator
/// fills in already laid out.
pub fn write_template(path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(ARCHETYPE_SHEET)?;

    let identity_fmt = Format::new().set_bold().set_text_wrap().set_align(FormatAlign::Top).set_border(FormatBorder::Medium).set_font_name(FONT_NAME).set_font_size(10);
    let sheet_header_fmt = Format::new().set_bold().set_align(FormatAlign::Center).set_border(FormatBorder::Thin).set_background_color(Color::RGB(0xF28E00)).set_font_name(FONT_NAME).set_font_size(10);
    let date_fmt = Format::new().set_border(FormatBorder::Thin).set_font_name(FONT_NAME).set_font_size(10);
    let time_fmt = Format::new().set_num_format("h:mm AM/PM").set_align(FormatAlign::Center).set_border(FormatBorder::Thin).set_font_name(FONT_NAME).set_font_size(10);
    let hours_fmt = Format::new().set_num_format("0.00").set_align(FormatAlign::Center).set_border(FormatBorder::Thin).set_font_name(FONT_NAME).set_font_size(10);
    let summary_fmt = Format::new().set_bold().set_border(FormatBorder::Medium).set_font_name(FONT_NAME).set_font_size(10);

    // Layout
    worksheet.set_portrait();
    worksheet.set_paper_size(1); // Letter
    worksheet.set_print_gridlines(false);
    worksheet.set_print_fit_to_pages(1, 1);
    worksheet.set_column_width(0, 24)?;
    for col in 1..=5 { worksheet.set_column_width(col, 16)?; }
    worksheet.set_row_height(0, 42)?;

    // --- Header Row (A1 is replaced by name and position) ---
    worksheet.write_string_with_format(0, 0, "Employee\nPosition:", &identity_fmt)?;
    worksheet.write_string_with_format(0, 1, "Clock In", &sheet_header_fmt)?;
    worksheet.write_string_with_format(0, 2, "Clock Out", &sheet_header_fmt)?;
    worksheet.write_string_with_format(0, 3, "Hours", &sheet_header_fmt)?;

    // --- Day Block ---
    for r in 1..=TEMPLATE_DAY_ROWS {
        worksheet.write_blank(r, 0, &date_fmt)?;
        worksheet.write_blank(r, 1, &time_fmt)?;
        worksheet.write_blank(r, 2, &time_fmt)?;
        worksheet.write_blank(r, 3, &hours_fmt)?;
    }

    // --- Summary Row ---
    let summary_row = TEMPLATE_DAY_ROWS + 1;
    worksheet.write_string_with_format(summary_row, 0, "Location:", &summary_fmt)?;
    worksheet.write_string_with_format(summary_row, 3, "Regular:", &summary_fmt)?;
    worksheet.write_string_with_format(summary_row, 4, "OverTime:", &summary_fmt)?;
    worksheet.write_string_with_format(summary_row, 5, "Total Hours:", &summary_fmt)?;

    workbook.save(path)?;
    Ok(())
}
