//! Header-driven binding of sheet rows to records

use crate::config::ReadPolicy;
use crate::core::cell_reference::column_letters;
use crate::core::decoder::{
    date_from_serial, format_number, normalize_decimal_separator, parse_decimal, parse_float,
    serial_from_date, CellDecoder, DecodedValue,
};
use crate::core::schema::{dynamic_columns_field, find_field};
use crate::error::{SheetError, SheetResult};
use crate::types::{DynamicColumns, FieldDescriptor, FieldKind, FieldValue, FromExcelRow};
use crate::workbook::Row;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{trace, warn};

/// Date/time layouts accepted from text cells
const DATE_TIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Column letters → header text, from a sheet's first row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    columns: HashMap<String, String>,
}

impl HeaderMap {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A row that failed to bind
#[derive(Debug)]
pub struct RejectedRow {
    pub sheet: String,
    pub row: u32,
    pub error: SheetError,
}

/// Records read from a workbook plus the rows that could not be bound
#[derive(Debug)]
pub struct ReadReport<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> Default for ReadReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> ReadReport<T> {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Upper-case column letters of the cell at `position`
fn cell_column(row: &Row, position: usize) -> SheetResult<String> {
    match row.cells.get(position).map(|cell| cell.column()) {
        Some(letters) if !letters.is_empty() => Ok(letters.to_ascii_uppercase()),
        _ => column_letters(row.column_index_of(position)?),
    }
}

pub fn build_header_map(row: &Row, decoder: &CellDecoder<'_>) -> SheetResult<HeaderMap> {
    let mut columns = HashMap::with_capacity(row.cells.len());
    for (position, cell) in row.cells.iter().enumerate() {
        let column = cell_column(row, position)?;
        let header = decoder.decode(cell)?.to_text();
        columns.insert(column, header);
    }
    Ok(HeaderMap { columns })
}

/// Build one record from a data row
pub fn bind_row<T: FromExcelRow>(
    row: &Row,
    headers: &HeaderMap,
    fields: &[&'static FieldDescriptor],
    decoder: &CellDecoder<'_>,
) -> SheetResult<T> {
    let mut record = T::default();
    let dynamic = dynamic_columns_field(fields);
    let mut extra = DynamicColumns::new();

    for (position, cell) in row.cells.iter().enumerate() {
        let column = cell_column(row, position)?;
        let Some(header) = headers.get(&column) else {
            continue;
        };
        let reference = cell
            .reference
            .clone()
            .unwrap_or_else(|| format!("{}{}", column, row.index));

        match find_field(fields, header) {
            Some(field) => {
                decoder
                    .decode(cell)
                    .and_then(|decoded| coerce(decoded, &field.kind))
                    .and_then(|value| record.set_field_value(field.name, value))
                    .map_err(|e| e.at(field.name, &reference))?;
            }
            None => match dynamic {
                Some(field) => {
                    let decoded = decoder
                        .decode(cell)
                        .map_err(|e| e.at(field.name, &reference))?;
                    extra.insert(header.to_string(), decoded.to_text());
                }
                None => trace!(header, cell = %reference, "no field for column"),
            },
        }
    }

    if let Some(field) = dynamic {
        if !extra.is_empty() {
            record.set_field_value(field.name, FieldValue::Columns(extra))?;
        }
    }

    Ok(record)
}

/// Bind every row after the header row.
///
/// A malformed header aborts the sheet; malformed data rows follow `policy`.
pub fn read_rows<T: FromExcelRow>(
    sheet: &str,
    rows: &[Row],
    fields: &[&'static FieldDescriptor],
    decoder: &CellDecoder<'_>,
    policy: ReadPolicy,
    report: &mut ReadReport<T>,
) -> SheetResult<()> {
    let Some((header_row, data_rows)) = rows.split_first() else {
        return Ok(());
    };
    let headers = build_header_map(header_row, decoder)?;

    for row in data_rows {
        match bind_row::<T>(row, &headers, fields, decoder) {
            Ok(record) => report.records.push(record),
            Err(error) => match policy {
                ReadPolicy::FailFast => return Err(error),
                ReadPolicy::SkipInvalidRows => {
                    warn!(sheet, row = row.index, error = %error, "skipping row");
                    report.rejected.push(RejectedRow {
                        sheet: sheet.to_string(),
                        row: row.index,
                        error,
                    });
                }
            },
        }
    }

    Ok(())
}

/// Convert a decoded cell into a value of the field's declared kind
pub fn coerce(decoded: DecodedValue, kind: &FieldKind) -> SheetResult<FieldValue> {
    if decoded.is_blank() {
        return match kind {
            FieldKind::Nullable(_) => Ok(FieldValue::Empty),
            FieldKind::String => Ok(FieldValue::Text(decoded.to_text())),
            other => Err(SheetError::format(
                decoded.to_text(),
                format!("empty cell for a {} field", other.type_name()),
            )),
        };
    }

    match kind.unwrap_nullable() {
        FieldKind::String => Ok(FieldValue::Text(decoded.to_text())),
        FieldKind::Integer => to_integer(&decoded).map(FieldValue::Integer),
        FieldKind::Float => to_float(&decoded).map(FieldValue::Float),
        FieldKind::Decimal => to_decimal(&decoded).map(FieldValue::Decimal),
        FieldKind::Boolean => to_boolean(&decoded).map(FieldValue::Boolean),
        FieldKind::DateTime => to_date_time(&decoded).map(FieldValue::DateTime),
        FieldKind::Enum(symbols) => {
            let text = decoded.to_text();
            symbols
                .iter()
                .find(|symbol| **symbol == text.trim())
                .map(|symbol| FieldValue::Enum(symbol.to_string()))
                .ok_or_else(|| SheetError::format(text, "no enum symbol matches this value"))
        }
        FieldKind::DynamicColumns | FieldKind::Nullable(_) => Err(SheetError::format(
            decoded.to_text(),
            "field cannot be bound to a single column",
        )),
    }
}

fn not_convertible(decoded: &DecodedValue, target: &str) -> SheetError {
    SheetError::format(decoded.to_text(), format!("cannot convert to {}", target))
}

fn to_integer(decoded: &DecodedValue) -> SheetResult<i64> {
    let integral = |f: f64| {
        (f.fract() == 0.0 && f.abs() < 9.0e18).then_some(f as i64)
    };
    match decoded {
        DecodedValue::Number(n) => integral(*n),
        DecodedValue::Decimal(d) => d.fract().is_zero().then(|| d.to_i64()).flatten(),
        DecodedValue::Boolean(b) => Some(i64::from(*b)),
        DecodedValue::Text(s) => {
            let text = normalize_decimal_separator(s.trim()).into_owned();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(integral))
        }
        DecodedValue::Date(_) => None,
    }
    .ok_or_else(|| not_convertible(decoded, "integer"))
}

fn to_float(decoded: &DecodedValue) -> SheetResult<f64> {
    match decoded {
        DecodedValue::Number(n) => Some(*n),
        DecodedValue::Decimal(d) => d.to_f64(),
        DecodedValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        DecodedValue::Text(s) => parse_float(s),
        DecodedValue::Date(dt) => serial_from_date(*dt),
    }
    .ok_or_else(|| not_convertible(decoded, "float"))
}

fn to_decimal(decoded: &DecodedValue) -> SheetResult<Decimal> {
    match decoded {
        DecodedValue::Decimal(d) => Some(*d),
        DecodedValue::Number(n) => parse_decimal(&format_number(*n)).or_else(|| Decimal::from_f64(*n)),
        DecodedValue::Boolean(b) => Some(Decimal::from(i64::from(*b))),
        DecodedValue::Text(s) => parse_decimal(s),
        DecodedValue::Date(_) => None,
    }
    .ok_or_else(|| not_convertible(decoded, "decimal"))
}

fn to_boolean(decoded: &DecodedValue) -> SheetResult<bool> {
    match decoded {
        DecodedValue::Boolean(b) => Some(*b),
        DecodedValue::Number(n) => Some(*n != 0.0),
        DecodedValue::Decimal(d) => Some(!d.is_zero()),
        DecodedValue::Text(s) => {
            let text = s.trim();
            if text.eq_ignore_ascii_case("true") || text == "1" {
                Some(true)
            } else if text.eq_ignore_ascii_case("false") || text == "0" {
                Some(false)
            } else {
                None
            }
        }
        DecodedValue::Date(_) => None,
    }
    .ok_or_else(|| not_convertible(decoded, "boolean"))
}

fn to_date_time(decoded: &DecodedValue) -> SheetResult<NaiveDateTime> {
    match decoded {
        DecodedValue::Date(dt) => Some(*dt),
        DecodedValue::Number(n) => date_from_serial(*n),
        DecodedValue::Text(s) => parse_date_time(s.trim()),
        DecodedValue::Decimal(_) | DecodedValue::Boolean(_) => None,
    }
    .ok_or_else(|| not_convertible(decoded, "date/time"))
}

/// ISO-like text, a bare date, or a serial number
fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    DATE_TIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(text, layout).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .or_else(|| parse_float(text).and_then(date_from_serial))
}
