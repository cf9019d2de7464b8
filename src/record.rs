use calamine::Data;

use crate::error::GenerationError;
use crate::source::HeaderIndex;

pub const TOTAL_HOURS: &str = "Total Hours";
pub const TOTAL_REG: &str = "Total REG";
pub const TOTAL_OT: &str = "Total OT";

/// name, position, location
const LEADING_FIELDS: usize = 3;
/// the aggregate cells that close every row
const TRAILING_FIELDS: usize = 3;

/// Positions of the aggregate columns, resolved from the header row.
#[derive(Debug, Clone, Copy)]
pub struct TotalColumns {
    pub total: usize,
    pub regular: usize,
    pub overtime: usize,
}

impl TotalColumns {
    pub fn resolve(headers: &HeaderIndex) -> Result<Self, GenerationError> {
        Ok(TotalColumns {
            total: headers.require(TOTAL_HOURS)?,
            regular: headers.require(TOTAL_REG)?,
            overtime: headers.require(TOTAL_OT)?,
        })
    }
}

/// Clock-in, clock-out and hours for one day, as found in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub clock_in: Data,
    pub clock_out: Data,
    pub hours: Data,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub regular: f64,
    pub overtime: f64,
    pub total: f64,
}

impl Totals {
    pub fn regular_label(&self) -> String {
        format!("Regular: {:.2}", self.regular)
    }

    pub fn overtime_label(&self) -> String {
        format!("OverTime: {:.2}", self.overtime)
    }

    pub fn total_label(&self) -> String {
        format!("Total Hours: {:.2}", self.total)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRecord {
    pub name: String,
    pub position: String,
    pub location: String,
    pub days: Vec<DayGroup>,
    pub totals: Totals,
}

impl EmployeeRecord {
    /// Parse one source row. Returns `Ok(None)` when the name cell is blank,
    /// which marks the end of the real data.
    pub fn parse(row: &[Data], row_number: u32, columns: &TotalColumns) -> Result<Option<Self>, GenerationError> {
        let field = |idx: usize| row.get(idx).unwrap_or(&Data::Empty);

        let name = field(0);
        if is_blank(name) {
            return Ok(None);
        }

        let position = field(1);
        let position = if is_blank(position) {
            "N/A".to_string()
        } else {
            display(position)
        };

        // An absent location is written as-is rather than defaulted.
        let location = match field(2) {
            Data::Empty => "None".to_string(),
            other => display(other),
        };

        let rest = row.get(LEADING_FIELDS..).unwrap_or(&[]);
        let daily = &rest[..rest.len().saturating_sub(TRAILING_FIELDS)];
        // chunks_exact drops a dangling one or two cells
        let days = daily
            .chunks_exact(3)
            .map(|c| DayGroup {
                clock_in: c[0].clone(),
                clock_out: c[1].clone(),
                hours: c[2].clone(),
            })
            .collect();

        let totals = Totals {
            regular: number_at(row, columns.regular, row_number, TOTAL_REG)?,
            overtime: number_at(row, columns.overtime, row_number, TOTAL_OT)?,
            total: number_at(row, columns.total, row_number, TOTAL_HOURS)?,
        };

        Ok(Some(EmployeeRecord {
            name: display(name),
            position,
            location,
            days,
            totals,
        }))
    }
}

/// Blank in the loose sense: empty, empty text, zero or false.
fn is_blank(value: &Data) -> bool {
    match value {
        Data::Empty => true,
        Data::String(s) => s.is_empty(),
        Data::Int(i) => *i == 0,
        Data::Float(f) => *f == 0.0,
        Data::Bool(b) => !b,
        _ => false,
    }
}

/// Text form of a cell; floats keep their fraction, so `5.0` stays `5.0`.
pub fn display(value: &Data) -> String {
    match value {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => format!("{:?}", f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Error(e) => e.to_string(),
    }
}

fn number_at(row: &[Data], idx: usize, row_number: u32, column: &str) -> Result<f64, GenerationError> {
    let value = row.get(idx).unwrap_or(&Data::Empty);
    match value {
        Data::Float(f) => Ok(*f),
        Data::Int(i) => Ok(*i as f64),
        Data::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| GenerationError::data(row_number, column, format!("'{}' is not a number", s))),
        Data::Empty => Err(GenerationError::data(row_number, column, "the cell is empty")),
        other => Err(GenerationError::data(
            row_number,
            column,
            format!("'{}' is not a number", display(other)),
        )),
    }
}
