use calamine::{open_workbook_auto, Data, Range, Reader};
use std::{collections::HashMap, path::Path};
use tracing::debug;

use crate::error::GenerationError;

/// A sheet name together with its last populated row (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct SheetInfo {
    pub name: String,
    pub max_row: u32,
}

/// List the sheets of a workbook. Empty sheets report a max row of 2 so that a
/// row range starting at 2 is always valid against them.
pub fn list_sheets(path: &Path) -> Result<Vec<SheetInfo>, GenerationError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| GenerationError::input(path, e))?;
    let names: Vec<String> = workbook.sheet_names().to_vec();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| GenerationError::input(path, format!("sheet '{}': {}", name, e)))?;
        let max_row = last_row(&range).max(2);
        sheets.push(SheetInfo { name, max_row });
    }
    Ok(sheets)
}

/// Values-only copy of one source sheet, anchored at A1.
///
/// Every row is padded to the width of the sheet's used area, the way a
/// spreadsheet reports rows, so all records share one layout.
#[derive(Debug, Clone)]
pub struct SourceSheet {
    rows: Vec<Vec<Data>>,
    width: usize,
}

impl SourceSheet {
    /// Load `sheet` from the workbook at `path`. The workbook handle is released
    /// before this returns.
    pub fn open(path: &Path, sheet: &str) -> Result<Self, GenerationError> {
        let mut workbook = open_workbook_auto(path).map_err(|e| GenerationError::input(path, e))?;

        if !workbook.sheet_names().iter().any(|n| n == sheet) {
            return Err(GenerationError::Schema(format!(
                "the source file '{}' has no sheet named '{}'",
                path.display(),
                sheet
            )));
        }

        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| GenerationError::input(path, format!("sheet '{}': {}", sheet, e)))?;
        let sheet = Self::from_range(&range);
        debug!(rows = sheet.rows.len(), width = sheet.width, "loaded source sheet");
        Ok(sheet)
    }

    pub fn from_range(range: &Range<Data>) -> Self {
        let (height, width) = match range.end() {
            Some((row, col)) => (row as usize + 1, col as usize + 1),
            None => (0, 0),
        };

        let rows = (0..height)
            .map(|r| {
                (0..width)
                    .map(|c| {
                        range
                            .get_value((r as u32, c as u32))
                            .cloned()
                            .unwrap_or(Data::Empty)
                    })
                    .collect()
            })
            .collect();

        SourceSheet { rows, width }
    }

    /// Last populated row, 1-based. Zero for an empty sheet.
    pub fn max_row(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Row by 1-based number. Rows past the used area read as empty.
    pub fn row(&self, number: u32) -> Vec<Data> {
        match number.checked_sub(1).and_then(|i| self.rows.get(i as usize)) {
            Some(row) => row.clone(),
            None => vec![Data::Empty; self.width],
        }
    }

    pub fn headers(&self) -> HeaderIndex {
        HeaderIndex::from_row(&self.row(1))
    }
}

fn last_row(range: &Range<Data>) -> u32 {
    range.end().map(|(row, _)| row + 1).unwrap_or(0)
}

/// Header text → zero-based column. The first occurrence of a name wins.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn from_row(row: &[Data]) -> Self {
        let mut columns = HashMap::new();
        for (idx, cell) in row.iter().enumerate() {
            if let Data::String(name) = cell {
                columns.entry(name.clone()).or_insert(idx);
            }
        }
        HeaderIndex { columns }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<usize, GenerationError> {
        self.get(name).ok_or_else(|| {
            GenerationError::Schema(format!(
                "the source sheet has no '{}' column in its header row",
                name
            ))
        })
    }
}
