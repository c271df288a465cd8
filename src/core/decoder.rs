//! Cell value decoding
//!
//! A cell is decoded by its explicit data type first; untyped (numeric) cells are
//! interpreted through the number format behind their style index.

use crate::error::{FormatErrorContext, SheetResult};
use crate::types::DATE_TIME_FORMAT;
use crate::workbook::{Cell, CellDataType, Workbook};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Serial decoded for an empty date cell (1900-01-01)
pub const EMPTY_DATE_SERIAL: f64 = 2.0;

/// Largest serial Excel can display (9999-12-31)
const MAX_DATE_SERIAL: f64 = 2_958_465.999_999;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// How a number format id is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeKind {
    Date,
    Number,
    Currency,
    Text,
}

/// Number format id → decode kind
#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormatRegistry {
    kinds: HashMap<u32, DecodeKind>,
}

impl Default for NumberFormatRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NumberFormatRegistry {
    /// Registry with no ids at all
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Built-in format ids from ECMA-376 §18.8.30
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        // General, 0, 0.00, #,##0, #,##0.00, accounting variants, General (44), @
        for id in [0, 1, 2, 3, 4, 37, 38, 39, 40, 44, 49] {
            registry.register(id, DecodeKind::Text);
        }
        // Currency
        for id in 5..=8 {
            registry.register(id, DecodeKind::Currency);
        }
        // Percent, fraction, scientific
        for id in [9, 10, 11, 12, 13, 48] {
            registry.register(id, DecodeKind::Number);
        }
        // Dates and times, including the East Asian built-ins
        for id in (14..=22).chain(27..=36).chain(45..=47).chain(50..=58) {
            registry.register(id, DecodeKind::Date);
        }
        registry
    }

    pub fn register(&mut self, id: u32, kind: DecodeKind) -> &mut Self {
        self.kinds.insert(id, kind);
        self
    }

    /// Register every entry of `extra`, replacing existing ids
    pub fn extend(&mut self, extra: &BTreeMap<u32, DecodeKind>) -> &mut Self {
        for (&id, &kind) in extra {
            self.register(id, kind);
        }
        self
    }

    pub fn kind_of(&self, id: u32) -> Option<DecodeKind> {
        self.kinds.get(&id).copied()
    }
}

/// A decoded cell
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Text(String),
    Boolean(bool),
    Number(f64),
    Decimal(Decimal),
    Date(NaiveDateTime),
}

impl DecodedValue {
    /// Textual form used when a field wants text
    pub fn to_text(&self) -> String {
        match self {
            DecodedValue::Text(s) => s.clone(),
            DecodedValue::Boolean(b) => b.to_string(),
            DecodedValue::Number(n) => format_number(*n),
            DecodedValue::Decimal(d) => d.to_string(),
            DecodedValue::Date(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
        }
    }

    /// Empty text, i.e. a blank cell
    pub fn is_blank(&self) -> bool {
        matches!(self, DecodedValue::Text(s) if s.trim().is_empty())
    }
}

/// Integers without a trailing `.0`, everything else as Rust prints it
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Rewrite `,` decimal separators to `.` so Rust's parsers accept the text
pub fn normalize_decimal_separator(raw: &str) -> Cow<'_, str> {
    if raw.contains(',') {
        Cow::Owned(raw.replace(',', "."))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Date/time for a serial day number counted from 1899-12-30
pub fn date_from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * MILLIS_PER_DAY).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Serial day number of a date/time (inverse of [`date_from_serial`])
pub fn serial_from_date(date: NaiveDateTime) -> Option<f64> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (date - epoch).num_milliseconds();
    Some(millis as f64 / MILLIS_PER_DAY)
}

pub fn parse_float(raw: &str) -> Option<f64> {
    normalize_decimal_separator(raw.trim()).parse().ok()
}

pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let text = normalize_decimal_separator(raw.trim());
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Decodes cells against a workbook's shared strings and styles
pub struct CellDecoder<'a> {
    workbook: &'a Workbook,
    formats: &'a NumberFormatRegistry,
}

impl<'a> CellDecoder<'a> {
    pub fn new(workbook: &'a Workbook, formats: &'a NumberFormatRegistry) -> Self {
        Self { workbook, formats }
    }

    pub fn decode(&self, cell: &Cell) -> SheetResult<DecodedValue> {
        let raw = cell.value.as_str();

        match cell.data_type {
            Some(CellDataType::SharedString) => self.decode_shared_string(cell),
            Some(CellDataType::Boolean) => Ok(DecodedValue::Boolean(raw.trim() != "0")),
            Some(_) => Ok(DecodedValue::Text(raw.to_string())),
            None => self.decode_untyped(cell),
        }
    }

    fn decode_shared_string(&self, cell: &Cell) -> SheetResult<DecodedValue> {
        let raw = cell.value.as_str();
        if self.workbook.shared_strings().is_none() {
            return Ok(DecodedValue::Text(raw.to_string()));
        }

        raw.trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| self.workbook.shared_string(index))
            .map(|text| DecodedValue::Text(text.to_string()))
            .ok_or_else(|| {
                self.error(cell, "shared string index is not in the shared string table")
                    .into()
            })
    }

    fn decode_untyped(&self, cell: &Cell) -> SheetResult<DecodedValue> {
        let raw = cell.value.as_str();

        let Some(style_index) = cell.style_index else {
            return Ok(DecodedValue::Text(normalize_decimal_separator(raw).into_owned()));
        };

        let format_id = self
            .workbook
            .number_format_id(style_index)
            .ok_or_else(|| self.error(cell, format!("style index {} is not defined", style_index)))?;

        match self.formats.kind_of(format_id) {
            Some(DecodeKind::Text) => Ok(DecodedValue::Text(
                normalize_decimal_separator(raw).into_owned(),
            )),
            Some(DecodeKind::Number) => parse_float(raw)
                .map(DecodedValue::Number)
                .ok_or_else(|| self.error(cell, "not a number").with_format_id(format_id).into()),
            Some(DecodeKind::Currency) => parse_decimal(raw)
                .map(DecodedValue::Decimal)
                .ok_or_else(|| {
                    self.error(cell, "not a currency amount")
                        .with_format_id(format_id)
                        .into()
                }),
            Some(DecodeKind::Date) => {
                let serial = if raw.trim().is_empty() {
                    Some(EMPTY_DATE_SERIAL)
                } else {
                    parse_float(raw)
                };
                serial
                    .and_then(date_from_serial)
                    .map(DecodedValue::Date)
                    .ok_or_else(|| {
                        self.error(cell, "not a date serial")
                            .with_format_id(format_id)
                            .into()
                    })
            }
            None => Err(self
                .error(cell, "number format is not handled")
                .with_format_id(format_id)
                .into()),
        }
    }

    fn error(&self, cell: &Cell, reason: impl Into<String>) -> FormatErrorContext {
        let ctx = FormatErrorContext::new(cell.value.clone(), reason);
        match &cell.reference {
            Some(reference) => ctx.with_cell(reference.clone()),
            None => ctx,
        }
    }
}
