use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::{Number, Value};

use super::domain::RawApplication;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read application export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid application CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads applications from a CSV export whose header row names the fields.
///
/// Empty and `NaN` cells become missing values; numeric-looking cells become
/// numbers; everything else is kept as text for the validator to judge.
pub struct ApplicationCsvImporter;

impl ApplicationCsvImporter {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Vec<RawApplication>, ImportError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RawApplication>, ImportError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut applications = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut application = RawApplication::new();
            for (header, cell) in headers.iter().zip(row.iter()) {
                application.insert(header, parse_cell(cell));
            }
            applications.push(application);
        }

        Ok(applications)
    }
}

fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(integer) = cell.parse::<i64>() {
        return Value::Number(integer.into());
    }
    match cell.parse::<f64>() {
        Ok(float) if float.is_finite() => Number::from_f64(float)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Ok(_) => Value::Null,
        Err(_) => Value::String(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_numbers_text_and_missing_cells() {
        let csv = "person_age,loan_grade,loan_int_rate,person_emp_length\n32,B,13.5,\n41,C,NaN,7\n";

        let applications =
            ApplicationCsvImporter::from_reader(Cursor::new(csv)).expect("csv parses");

        assert_eq!(applications.len(), 2);
        assert_eq!(applications[0].get("person_age"), Some(&Value::from(32)));
        assert_eq!(applications[0].get("loan_grade"), Some(&Value::from("B")));
        assert_eq!(applications[0].get("loan_int_rate"), Some(&Value::from(13.5)));
        assert_eq!(applications[0].get("person_emp_length"), Some(&Value::Null));
        assert_eq!(applications[1].get("loan_int_rate"), Some(&Value::Null));
    }

    #[test]
    fn reports_ragged_rows() {
        let csv = "person_age,loan_grade\n32,B,extra\n";
        let result = ApplicationCsvImporter::from_reader(Cursor::new(csv));
        assert!(matches!(result, Err(ImportError::Csv(_))));
    }
}
