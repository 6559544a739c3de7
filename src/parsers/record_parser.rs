use crate::data_models::SensorReading;
use crate::errors::ParseError;
use csv::{ReaderBuilder, StringRecord, Terminator, Trim};
use std::str::FromStr;

/// Number of fields in one wire record.
pub const RECORD_FIELD_COUNT: usize = 5;

// Wire field order
const RAIN_FIELD: (usize, &str) = (0, "rain");
const SOIL_HUMIDITY_FIELD: (usize, &str) = (1, "soil_humidity");
const AMBIENT_HUMIDITY_FIELD: (usize, &str) = (2, "ambient_humidity");
const TEMPERATURE_FIELD: (usize, &str) = (3, "temperature");
const LUMINANCE_FIELD: (usize, &str) = (4, "luminance");

/// Parses one record of the form
/// `<rain:int>,<soil_humidity:float>,<ambient_humidity:float>,<temperature:float>,<luminance:int>`.
///
/// The record is all-or-nothing: a wrong field count or any field that does
/// not coerce to its type rejects the whole line. Whitespace around the line
/// and around each field is ignored. Any non-zero rain value counts as rain.
pub fn parse_record(line: &str) -> Result<SensorReading, ParseError> {
    let line = line.trim();
    let record = split_record(line)?;

    if record.len() != RECORD_FIELD_COUNT {
        return Err(ParseError::FieldCount {
            expected: RECORD_FIELD_COUNT,
            found: record.len(),
            line: line.to_string(),
        });
    }

    let rain_flag: i64 = parse_field(&record, RAIN_FIELD, "integer")?;

    Ok(SensorReading {
        rain_detected: rain_flag != 0,
        soil_humidity: parse_field(&record, SOIL_HUMIDITY_FIELD, "float")?,
        ambient_humidity: parse_field(&record, AMBIENT_HUMIDITY_FIELD, "float")?,
        temperature: parse_field(&record, TEMPERATURE_FIELD, "float")?,
        luminance: parse_field(&record, LUMINANCE_FIELD, "integer")?,
    })
}

// Splits the line with the csv reader configured for a bare comma list:
// no header row, no quoting, fields trimmed. Only `\n` ends a record, so a
// stray `\r` stays inside its field and fails coercion there.
fn split_record(line: &str) -> Result<StringRecord, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .trim(Trim::All)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(line.as_bytes());

    let csv_error = |e: csv::Error| ParseError::Csv {
        line: line.to_string(),
        source: e,
    };

    let mut record = StringRecord::new();
    if !reader.read_record(&mut record).map_err(csv_error)? {
        // Empty input yields no record at all
        record.clear();
        return Ok(record);
    }

    let mut rest = StringRecord::new();
    if reader.read_record(&mut rest).map_err(csv_error)? {
        return Err(ParseError::TrailingData { line: line.to_string() });
    }
    Ok(record)
}

fn parse_field<T: FromStr>(
    record: &StringRecord,
    (index, name): (usize, &'static str),
    expected_type: &'static str,
) -> Result<T, ParseError> {
    let raw = record.get(index).unwrap_or_default();
    raw.parse::<T>().map_err(|_| ParseError::InvalidField {
        field: name,
        value: raw.to_string(),
        expected_type,
    })
}
