use calamine::Data;
use std::path::Path;
use tracing::debug;
use umya_spreadsheet::{reader, writer, Cell, Spreadsheet, Worksheet};

use crate::error::GenerationError;

/// Name of the archetype sheet every timesheet is cloned from.
pub const ARCHETYPE_SHEET: &str = "Template";

/// Excel's sheet-name ceiling is 31; one character is kept in reserve.
pub const MAX_SHEET_NAME_LEN: usize = 30;

const TIME_FORMAT: &str = "h:mm AM/PM";
const DATETIME_FORMAT: &str = "mm/dd/yyyy h:mm AM/PM";

/// Reduce an employee name to a sheet name: ASCII letters and digits only, at
/// most 30 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_SHEET_NAME_LEN)
        .collect()
}

/// The template workbook being turned into the output document.
///
/// Sheets are added in memory only; nothing reaches disk until [`save`].
///
/// [`save`]: TimesheetBook::save
pub struct TimesheetBook {
    book: Spreadsheet,
    archetype: Worksheet,
}

impl TimesheetBook {
    pub fn open(path: &Path) -> Result<Self, GenerationError> {
        let book = reader::xlsx::read(path).map_err(|e| GenerationError::input(path, e))?;
        let archetype = book
            .get_sheet_by_name(ARCHETYPE_SHEET)
            .cloned()
            .ok_or_else(|| {
                GenerationError::Schema(format!(
                    "the template '{}' has no sheet named '{}'",
                    path.display(),
                    ARCHETYPE_SHEET
                ))
            })?;
        Ok(TimesheetBook { book, archetype })
    }

    /// Clone the archetype under `name`, replacing any sheet already called that.
    pub fn add_sheet(&mut self, name: &str) -> Result<TimesheetSheet<'_>, GenerationError> {
        if self.book.get_sheet_by_name(name).is_some() {
            debug!(sheet = name, "replacing existing sheet");
            self.book
                .remove_sheet_by_name(name)
                .map_err(|e| GenerationError::Schema(format!("could not replace sheet '{}': {}", name, e)))?;
        }

        let mut sheet = self.archetype.clone();
        sheet.set_name(name);
        let sheet = self
            .book
            .add_sheet(sheet)
            .map_err(|e| GenerationError::Schema(format!("could not add sheet '{}': {}", name, e)))?;
        Ok(TimesheetSheet { sheet })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|s| s.get_name().to_string())
            .collect()
    }

    /// Drop the archetype and write the document to `path` in one step.
    pub fn save(mut self, path: &Path) -> Result<(), GenerationError> {
        self.book
            .remove_sheet_by_name(ARCHETYPE_SHEET)
            .map_err(|e| GenerationError::Schema(format!("could not remove '{}': {}", ARCHETYPE_SHEET, e)))?;

        writer::xlsx::write(&self.book, path).map_err(|e| GenerationError::Persistence {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// A freshly cloned timesheet, borrowed from its book while it is filled in.
pub struct TimesheetSheet<'a> {
    sheet: &'a mut Worksheet,
}

impl TimesheetSheet<'_> {
    pub fn set_text(&mut self, coordinate: &str, text: &str) {
        self.sheet.get_cell_mut(coordinate).set_value_string(text);
    }

    /// Write a source value keeping its type: numbers stay numbers and
    /// date/time serials keep a time format. Empty clears the cell.
    pub fn set_data(&mut self, coordinate: &str, value: &Data) {
        let cell = self.sheet.get_cell_mut(coordinate);
        match value {
            Data::Empty => {
                cell.set_blank();
            }
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                cell.set_value_string(s.as_str());
            }
            Data::Float(f) => {
                cell.set_value_number(*f);
            }
            Data::Int(i) => {
                cell.set_value_number(*i as f64);
            }
            Data::Bool(b) => {
                cell.set_value_bool(*b);
            }
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                cell.set_value_number(serial);
                set_number_format(cell, if serial < 1.0 { TIME_FORMAT } else { DATETIME_FORMAT });
            }
            Data::Error(e) => {
                cell.set_value_string(e.to_string());
            }
        }
    }
}

fn set_number_format(cell: &mut Cell, code: &str) {
    cell.get_style_mut().get_number_format_mut().set_format_code(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sanitize_keeps_ascii_alphanumerics() {
        assert_eq!(sanitize_sheet_name("O'Brien, Mary-Kate 2"), "OBrienMaryKate2");
        assert_eq!(sanitize_sheet_name("José Núñez"), "JosNez");
        assert_eq!(sanitize_sheet_name("!!!"), "");
    }

    #[test]
    fn sanitize_truncates_to_thirty() {
        let long = "Abcdefghij Klmnopqrst Uvwxyzabcd Efghij";
        let name = sanitize_sheet_name(long);
        assert_eq!(name.len(), MAX_SHEET_NAME_LEN);
        assert_eq!(name, "AbcdefghijKlmnopqrstUvwxyzabcd");
    }

    #[test]
    fn replaced_sheets_are_not_duplicated() {
        let dir = tempfile::TempDir::new().unwrap();
        let template = dir.path().join("template.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        workbook.add_worksheet().set_name(ARCHETYPE_SHEET).unwrap();
        workbook.save(&template).unwrap();

        let mut book = TimesheetBook::open(&template).unwrap();
        book.add_sheet("Ann").unwrap().set_text("A1", "first");
        book.add_sheet("Bob").unwrap();
        book.add_sheet("Ann").unwrap().set_text("A1", "second");
        assert_eq!(book.sheet_names(), vec!["Template", "Bob", "Ann"]);

        let output = dir.path().join("out.xlsx");
        book.save(&output).unwrap();
        let saved = reader::xlsx::read(&output).unwrap();
        let names: Vec<&str> = saved.get_sheet_collection().iter().map(|s| s.get_name()).collect();
        assert_eq!(names, vec!["Bob", "Ann"]);
        assert_eq!(saved.get_sheet_by_name("Ann").unwrap().get_value("A1"), "second");
    }
}
