use chrono::{Days, NaiveDate};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::book::{sanitize_sheet_name, TimesheetBook, ARCHETYPE_SHEET};
use crate::error::GenerationError;
use crate::export;
use crate::record::{EmployeeRecord, TotalColumns, Totals};
use crate::source::SourceSheet;

pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// First data row; row 1 holds the headers.
pub const FIRST_DATA_ROW: u32 = 2;

/// First row of the per-day block in a generated sheet.
const DAY_ANCHOR_ROW: usize = 2;

const IDENTITY_CELL: &str = "A1";
const LOCATION_CELL: &str = "A16";
const REGULAR_CELL: &str = "D16";
const OVERTIME_CELL: &str = "E16";
const TOTAL_CELL: &str = "F16";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndRow {
    Bounded(u32),
    /// Up to the source sheet's last populated row, looked up once per run.
    Unbounded,
}

/// Inclusive range of 1-based source rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: u32,
    pub end: EndRow,
}

impl Default for RowRange {
    fn default() -> Self {
        RowRange {
            start: FIRST_DATA_ROW,
            end: EndRow::Unbounded,
        }
    }
}

impl RowRange {
    pub fn new(start: u32, end: Option<u32>) -> Self {
        RowRange {
            start,
            end: end.map_or(EndRow::Unbounded, EndRow::Bounded),
        }
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.start < FIRST_DATA_ROW {
            return Err(GenerationError::Validation(format!(
                "start row must be {} or greater (row 1 holds the headers), got {}",
                FIRST_DATA_ROW, self.start
            )));
        }
        if let EndRow::Bounded(end) = self.end {
            if end < self.start {
                return Err(GenerationError::Validation(format!(
                    "end row {} is before start row {}",
                    end, self.start
                )));
            }
        }
        Ok(())
    }

    fn resolve(&self, max_row: u32) -> u32 {
        match self.end {
            EndRow::Bounded(end) => end,
            EndRow::Unbounded => max_row,
        }
    }
}

impl std::fmt::Display for RowRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            EndRow::Bounded(end) => write!(f, "{}-{}", self.start, end),
            EndRow::Unbounded => write!(f, "{}-end", self.start),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub source: PathBuf,
    pub source_sheet: String,
    pub template: PathBuf,
    pub output: PathBuf,
    /// MM/DD/YYYY
    pub start_date: String,
    pub row_range: RowRange,
    pub reveal_output: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSheet {
    pub sheet_name: String,
    pub employee: String,
    pub days: usize,
    pub totals: Totals,
}

#[derive(Debug, Clone)]
pub struct GenerationSummary {
    pub output: PathBuf,
    pub first_row: u32,
    pub last_row: u32,
    /// In output order. A sheet replaced by a later record appears once.
    pub sheets: Vec<GeneratedSheet>,
}

pub fn parse_start_date(text: &str) -> Result<NaiveDate, GenerationError> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|e| {
        GenerationError::Validation(format!(
            "start date '{}' is not a valid MM/DD/YYYY date: {}",
            text, e
        ))
    })
}

/// Build one timesheet per source row and save them all to `request.output`.
///
/// Rows are read top to bottom and the run stops at the first row with a blank
/// name. Nothing is written to disk unless every row succeeds and at least one
/// sheet was produced.
pub fn generate(request: &GenerationRequest) -> Result<GenerationSummary, GenerationError> {
    let start_date = parse_start_date(&request.start_date)?;
    request.row_range.validate()?;

    let source = SourceSheet::open(&request.source, &request.source_sheet)?;
    let mut book = TimesheetBook::open(&request.template)?;
    let columns = TotalColumns::resolve(&source.headers())?;

    let first_row = request.row_range.start;
    let last_row = request.row_range.resolve(source.max_row());
    info!(
        source = %request.source.display(),
        sheet = %request.source_sheet,
        first_row,
        last_row,
        width = source.width(),
        "generating timesheets"
    );

    let mut sheets: Vec<GeneratedSheet> = Vec::new();
    for row_number in first_row..=last_row {
        let row = source.row(row_number);
        let Some(record) = EmployeeRecord::parse(&row, row_number, &columns)? else {
            debug!(row = row_number, "blank name, stopping");
            break;
        };

        let sheet_name = sheet_name_for(&record, row_number)?;
        write_timesheet(&mut book, &sheet_name, &record, start_date, row_number)?;

        sheets.retain(|s| s.sheet_name != sheet_name);
        sheets.push(GeneratedSheet {
            sheet_name,
            employee: record.name,
            days: record.days.len(),
            totals: record.totals,
        });
    }

    if sheets.is_empty() {
        return Err(GenerationError::Validation(format!(
            "no rows with an employee name in rows {}-{}; nothing was saved",
            first_row, last_row
        )));
    }

    debug!(sheets = ?book.sheet_names(), "saving output");
    book.save(&request.output)?;
    info!(output = %request.output.display(), sheets = sheets.len(), "saved timesheets");

    if request.reveal_output {
        if let Err(e) = export::reveal(&request.output) {
            warn!("{}", e);
        }
    }

    Ok(GenerationSummary {
        output: request.output.clone(),
        first_row,
        last_row,
        sheets,
    })
}

fn sheet_name_for(record: &EmployeeRecord, row_number: u32) -> Result<String, GenerationError> {
    let name = sanitize_sheet_name(&record.name);
    if name.is_empty() {
        return Err(GenerationError::data(
            row_number,
            "Name",
            format!("'{}' has no letters or digits to name a sheet with", record.name),
        ));
    }
    if name == ARCHETYPE_SHEET {
        return Err(GenerationError::data(
            row_number,
            "Name",
            format!("'{}' would overwrite the '{}' sheet", record.name, ARCHETYPE_SHEET),
        ));
    }
    Ok(name)
}

fn write_timesheet(
    book: &mut TimesheetBook,
    sheet_name: &str,
    record: &EmployeeRecord,
    start_date: NaiveDate,
    row_number: u32,
) -> Result<(), GenerationError> {
    let mut sheet = book.add_sheet(sheet_name)?;

    sheet.set_text(
        IDENTITY_CELL,
        &format!("{}\nPosition: {}", record.name, record.position),
    );
    sheet.set_text(LOCATION_CELL, &format!("Location: {}", record.location));

    for (i, day) in record.days.iter().enumerate() {
        let date = start_date.checked_add_days(Days::new(i as u64)).ok_or_else(|| {
            GenerationError::data(row_number, "day", format!("day {} is past the last supported date", i + 1))
        })?;
        let r = DAY_ANCHOR_ROW + i;
        sheet.set_text(&format!("A{}", r), &date.format(DATE_FORMAT).to_string());
        sheet.set_data(&format!("B{}", r), &day.clock_in);
        sheet.set_data(&format!("C{}", r), &day.clock_out);
        sheet.set_data(&format!("D{}", r), &day.hours);
    }

    sheet.set_text(REGULAR_CELL, &record.totals.regular_label());
    sheet.set_text(OVERTIME_CELL, &record.totals.overtime_label());
    sheet.set_text(TOTAL_CELL, &record.totals.total_label());

    debug!(sheet = sheet_name, row = row_number, days = record.days.len(), "wrote timesheet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Data, Range, Reader};
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;
    use std::path::Path;
    use tempfile::TempDir;

    const HEADER: [&str; 12] = [
        "Name", "Position", "Location", "Mon In", "Mon Out", "Mon Hours", "Tue In", "Tue Out",
        "Tue Hours", "Total Hours", "Total REG", "Total OT",
    ];

    fn s(v: &str) -> Data {
        Data::String(v.into())
    }

    fn f(v: f64) -> Data {
        Data::Float(v)
    }

    fn employee(name: &str, position: &str, location: &str, totals: [Data; 3]) -> Vec<Data> {
        let mut row = vec![s(name), s(position), s(location)];
        row.extend([s("8:00 AM"), s("4:00 PM"), f(8.0), s("9:00 AM"), s("5:30 PM"), f(8.5)]);
        row.extend(totals);
        row
    }

    fn valid_totals() -> [Data; 3] {
        [f(16.5), f(16.0), f(0.5)]
    }

    fn write_grid(path: &Path, sheet_name: &str, rows: &[Vec<Data>]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Data::String(v) => {
                        sheet.write_string(r as u32, c as u16, v).unwrap();
                    }
                    Data::Float(v) => {
                        sheet.write_number(r as u32, c as u16, *v).unwrap();
                    }
                    _ => {}
                }
            }
        }
        workbook.save(path).unwrap();
    }

    fn write_source(dir: &TempDir, rows: &[Vec<Data>]) -> PathBuf {
        let header: Vec<Data> = HEADER.iter().map(|h| s(h)).collect();
        let mut all = vec![header];
        all.extend_from_slice(rows);
        let path = dir.path().join("source.xlsx");
        write_grid(&path, "Payroll", &all);
        path
    }

    fn write_template(dir: &TempDir, sheet_name: &str) -> PathBuf {
        let path = dir.path().join("template.xlsx");
        let labels = vec![vec![s("Employee"), s("Clock In"), s("Clock Out"), s("Hours")]];
        write_grid(&path, sheet_name, &labels);
        path
    }

    fn request(dir: &TempDir, source: PathBuf, template: PathBuf) -> GenerationRequest {
        GenerationRequest {
            source,
            source_sheet: "Payroll".into(),
            template,
            output: dir.path().join("out.xlsx"),
            start_date: "01/15/2024".into(),
            row_range: RowRange::default(),
            reveal_output: false,
        }
    }

    fn read_output(path: &Path) -> Vec<(String, Range<Data>)> {
        let mut workbook = open_workbook_auto(path).unwrap();
        let names = workbook.sheet_names().to_vec();
        names
            .into_iter()
            .map(|name| {
                let range = workbook.worksheet_range(&name).unwrap();
                (name, range)
            })
            .collect()
    }

    fn cell(range: &Range<Data>, coordinate: (u32, u32)) -> Data {
        range.get_value(coordinate).cloned().unwrap_or(Data::Empty)
    }

    #[test]
    fn generates_one_populated_sheet_per_employee() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, &[employee("Jane Doe", "Manager", "Main St", valid_totals())]);
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let req = request(&dir, source, template);

        let summary = generate(&req).unwrap();
        assert_eq!(summary.sheets.len(), 1);
        assert_eq!(summary.sheets[0].sheet_name, "JaneDoe");
        assert_eq!(summary.sheets[0].days, 2);
        assert_eq!((summary.first_row, summary.last_row), (2, 2));

        let output = read_output(&req.output);
        assert_eq!(output.len(), 1);
        let (name, range) = &output[0];
        assert_eq!(name, "JaneDoe");

        assert_eq!(cell(range, (0, 0)), s("Jane Doe\nPosition: Manager"));
        // template content survives the clone
        assert_eq!(cell(range, (0, 1)), s("Clock In"));

        assert_eq!(cell(range, (1, 0)), s("01/15/2024"));
        assert_eq!(cell(range, (1, 1)), s("8:00 AM"));
        assert_eq!(cell(range, (1, 2)), s("4:00 PM"));
        assert_eq!(cell(range, (1, 3)), f(8.0));
        assert_eq!(cell(range, (2, 0)), s("01/16/2024"));
        assert_eq!(cell(range, (2, 1)), s("9:00 AM"));
        assert_eq!(cell(range, (2, 2)), s("5:30 PM"));
        assert_eq!(cell(range, (2, 3)), f(8.5));
        assert_eq!(cell(range, (3, 0)), Data::Empty);

        assert_eq!(cell(range, (15, 0)), s("Location: Main St"));
        assert_eq!(cell(range, (15, 3)), s("Regular: 16.00"));
        assert_eq!(cell(range, (15, 4)), s("OverTime: 0.50"));
        assert_eq!(cell(range, (15, 5)), s("Total Hours: 16.50"));
    }

    #[test]
    fn stops_at_first_blank_name() {
        let dir = TempDir::new().unwrap();
        let source = write_source(
            &dir,
            &[
                employee("Ann", "", "North", valid_totals()),
                employee("Bob", "Driver", "South", valid_totals()),
                employee("", "Ghost", "Nowhere", valid_totals()),
                employee("Carl", "Cook", "East", valid_totals()),
            ],
        );
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let req = request(&dir, source, template);

        let summary = generate(&req).unwrap();
        assert_eq!((summary.first_row, summary.last_row), (2, 5));

        let output = read_output(&req.output);
        let names: Vec<&str> = output.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bob"]);
        assert_eq!(cell(&output[0].1, (0, 0)), s("Ann\nPosition: N/A"));
    }

    #[test]
    fn later_record_replaces_same_sanitized_name() {
        let dir = TempDir::new().unwrap();
        let source = write_source(
            &dir,
            &[
                employee("Jo Ann", "Clerk", "A", valid_totals()),
                employee("Jo-Ann", "Buyer", "B", valid_totals()),
            ],
        );
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let req = request(&dir, source, template);

        let summary = generate(&req).unwrap();
        assert_eq!(summary.sheets.len(), 1);
        assert_eq!(summary.sheets[0].employee, "Jo-Ann");

        let output = read_output(&req.output);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].0, "JoAnn");
        assert_eq!(cell(&output[0].1, (0, 0)), s("Jo-Ann\nPosition: Buyer"));
        assert_eq!(cell(&output[0].1, (15, 0)), s("Location: B"));
    }

    #[test]
    fn bounded_range_limits_rows() {
        let dir = TempDir::new().unwrap();
        let source = write_source(
            &dir,
            &[
                employee("Ann", "", "North", valid_totals()),
                employee("Bob", "", "South", valid_totals()),
                employee("Cat", "", "West", valid_totals()),
            ],
        );
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let mut req = request(&dir, source, template);
        req.row_range = RowRange::new(3, Some(3));

        let summary = generate(&req).unwrap();
        let names: Vec<&str> = summary.sheets.iter().map(|s| s.sheet_name.as_str()).collect();
        assert_eq!(names, vec!["Bob"]);
    }

    #[test]
    fn bounded_range_past_the_data_stops_at_blank_rows() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, &[employee("Ann", "", "North", valid_totals())]);
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let mut req = request(&dir, source, template);
        req.row_range = RowRange::new(2, Some(500));

        let summary = generate(&req).unwrap();
        assert_eq!(summary.sheets.len(), 1);
        assert_eq!(summary.last_row, 500);
    }

    #[test]
    fn dates_run_across_month_end() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, &[employee("Ann", "", "North", valid_totals())]);
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let mut req = request(&dir, source, template);
        req.start_date = "1/31/2024".into();

        generate(&req).unwrap();
        let output = read_output(&req.output);
        assert_eq!(cell(&output[0].1, (1, 0)), s("01/31/2024"));
        assert_eq!(cell(&output[0].1, (2, 0)), s("02/01/2024"));
    }

    #[test]
    fn totals_are_found_by_header_not_position() {
        let dir = TempDir::new().unwrap();
        let mut header: Vec<Data> = HEADER[..9].iter().map(|h| s(h)).collect();
        header.extend([s("Total OT"), s("Total Hours"), s("Total REG")]);
        let row = employee("Ann", "", "North", [f(2.0), f(42.0), f(40.0)]);
        let path = dir.path().join("source.xlsx");
        write_grid(&path, "Payroll", &[header, row]);
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let req = request(&dir, path, template);

        let summary = generate(&req).unwrap();
        assert_eq!(
            summary.sheets[0].totals,
            Totals { regular: 40.0, overtime: 2.0, total: 42.0 }
        );
    }

    #[test]
    fn non_numeric_total_fails_without_saving() {
        let dir = TempDir::new().unwrap();
        let source = write_source(
            &dir,
            &[
                employee("Ann", "", "North", valid_totals()),
                employee("Bob", "", "South", [f(16.5), f(16.0), s("n/a")]),
            ],
        );
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let req = request(&dir, source, template);

        let err = generate(&req).unwrap_err();
        assert!(matches!(err, GenerationError::Data { row: 3, .. }), "{err}");
        assert!(!req.output.exists());
    }

    #[test]
    fn missing_archetype_is_a_schema_error() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, &[employee("Ann", "", "North", valid_totals())]);
        let template = write_template(&dir, "Sheet1");
        let req = request(&dir, source, template);

        let err = generate(&req).unwrap_err();
        assert!(matches!(err, GenerationError::Schema(_)), "{err}");
        assert!(!req.output.exists());
    }

    #[test]
    fn missing_total_header_is_a_schema_error() {
        let dir = TempDir::new().unwrap();
        let header: Vec<Data> = HEADER[..11].iter().map(|h| s(h)).collect();
        let path = dir.path().join("source.xlsx");
        write_grid(&path, "Payroll", &[header]);
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let req = request(&dir, path, template);

        let err = generate(&req).unwrap_err();
        assert!(err.to_string().contains("Total OT"), "{err}");
    }

    #[test]
    fn bad_start_date_fails_before_reading_anything() {
        let dir = TempDir::new().unwrap();
        let mut req = request(&dir, dir.path().join("nope.xlsx"), dir.path().join("nope2.xlsx"));
        req.start_date = "2024-01-15".into();

        let err = generate(&req).unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)), "{err}");
    }

    #[test]
    fn row_range_is_validated() {
        assert!(RowRange::new(1, None).validate().is_err());
        assert!(RowRange::new(5, Some(4)).validate().is_err());
        assert!(RowRange::new(5, Some(5)).validate().is_ok());
        assert_eq!(RowRange::new(2, None).to_string(), "2-end");
    }

    #[test]
    fn unwritable_output_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, &[employee("Ann", "", "North", valid_totals())]);
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let mut req = request(&dir, source, template);
        req.output = dir.path().join("no-such-dir").join("out.xlsx");

        let err = generate(&req).unwrap_err();
        assert!(matches!(err, GenerationError::Persistence { .. }), "{err}");
    }

    #[test]
    fn range_without_employees_is_an_error_and_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, &[employee("Ann", "", "North", valid_totals())]);
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let mut req = request(&dir, source, template);
        req.row_range = RowRange::new(10, Some(12));

        let err = generate(&req).unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)), "{err}");
        assert!(err.to_string().contains("10-12"), "{err}");
        assert!(!req.output.exists());
    }

    #[test]
    fn blank_first_row_or_header_only_sheet_saves_nothing() {
        let dir = TempDir::new().unwrap();
        let template = write_template(&dir, ARCHETYPE_SHEET);

        let blank_first = write_source(
            &dir,
            &[
                employee("", "Ghost", "Nowhere", valid_totals()),
                employee("Bob", "Driver", "South", valid_totals()),
            ],
        );
        let req = request(&dir, blank_first, template.clone());
        assert!(matches!(generate(&req), Err(GenerationError::Validation(_))));
        assert!(!req.output.exists());

        let header_only = write_source(&dir, &[]);
        let req = request(&dir, header_only, template);
        assert!(matches!(generate(&req), Err(GenerationError::Validation(_))));
        assert!(!req.output.exists());
    }

    #[test]
    fn name_sanitized_to_archetype_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, &[employee("Tem-plate", "", "North", valid_totals())]);
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let req = request(&dir, source, template);

        let err = generate(&req).unwrap_err();
        match err {
            GenerationError::Data { row, column, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "Name");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!req.output.exists());
    }

    #[test]
    fn name_without_alphanumerics_is_rejected() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, &[employee("***", "", "North", valid_totals())]);
        let template = write_template(&dir, ARCHETYPE_SHEET);
        let req = request(&dir, source, template);

        let err = generate(&req).unwrap_err();
        assert!(matches!(err, GenerationError::Data { row: 2, .. }), "{err}");
    }
}
