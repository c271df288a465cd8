use crate::error::{FormatErrorContext, SheetError, SheetResult};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::borrow::Cow;

/// Runtime value of a dynamic-columns field: header text → cell text, in column order.
pub type DynamicColumns = IndexMap<String, String>;

/// Text layout used for date/time fields written as string cells; sub-second digits only when present.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

//==============================================================================
// Field Descriptors
//==============================================================================

/// Declared type of a mappable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Decimal,
    Boolean,
    DateTime,
    /// Enumeration, listed by its symbolic names
    Enum(&'static [&'static str]),
    /// Optional wrapper; an empty cell maps to `FieldValue::Empty`
    Nullable(&'static FieldKind),
    /// String → string map expanded into one column per entry
    DynamicColumns,
}

impl FieldKind {
    /// Strip any `Nullable` wrappers
    pub fn unwrap_nullable(&self) -> &FieldKind {
        match self {
            FieldKind::Nullable(inner) => inner.unwrap_nullable(),
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, FieldKind::Nullable(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self.unwrap_nullable() {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Decimal => "decimal",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "date/time",
            FieldKind::Enum(_) => "enum",
            FieldKind::DynamicColumns => "dynamic columns",
            FieldKind::Nullable(_) => "nullable",
        }
    }
}

/// Static description of one record field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub display_name: Option<&'static str>,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            display_name: None,
        }
    }

    /// Use `display_name` instead of the field name as the column header
    pub const fn with_display_name(mut self, display_name: &'static str) -> Self {
        self.display_name = Some(display_name);
        self
    }

    /// Header text this field is written under and matched against
    pub fn column_name(&self) -> &'static str {
        self.display_name.unwrap_or(self.name)
    }

    pub fn is_dynamic_columns(&self) -> bool {
        matches!(self.kind, FieldKind::DynamicColumns)
    }
}

//==============================================================================
// Field Values
//==============================================================================

/// A field value moving between a record and a cell
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value (`None`), written as an empty cell
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    DateTime(NaiveDateTime),
    /// Enum symbol
    Enum(String),
    Columns(DynamicColumns),
}

impl FieldValue {
    /// Cell text for this value. `Columns` has no single-cell form and renders empty.
    pub fn to_cell_text(&self) -> String {
        match self {
            FieldValue::Empty | FieldValue::Columns(_) => String::new(),
            FieldValue::Text(s) | FieldValue::Enum(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Decimal(d) => d.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::DateTime(dt) => dt.format(DATE_TIME_FORMAT).to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    fn variant_name(&self) -> &'static str {
        match self {
            FieldValue::Empty => "empty",
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::DateTime(_) => "date/time",
            FieldValue::Enum(_) => "enum",
            FieldValue::Columns(_) => "columns",
        }
    }

    fn mismatch(&self, expected: &str) -> SheetError {
        SheetError::Format(FormatErrorContext::new(
            self.to_cell_text(),
            format!("expected {} value, found {}", expected, self.variant_name()),
        ))
    }

    /// Convert an enum value into its typed form
    pub fn into_enum<E: ExcelEnum>(self) -> SheetResult<E> {
        match &self {
            FieldValue::Enum(symbol) | FieldValue::Text(symbol) => E::from_symbol(symbol)
                .ok_or_else(|| {
                    SheetError::format(symbol.clone(), "no enum symbol matches this value")
                }),
            _ => Err(self.mismatch("enum")),
        }
    }

    /// Convert a nullable enum value into its typed form
    pub fn into_optional_enum<E: ExcelEnum>(self) -> SheetResult<Option<E>> {
        match self {
            FieldValue::Empty => Ok(None),
            other => other.into_enum().map(Some),
        }
    }
}

/// Symbol mapping for enum fields
pub trait ExcelEnum: Sized {
    /// Every symbol, in declaration order
    const SYMBOLS: &'static [&'static str];

    fn symbol(&self) -> &'static str;

    fn from_symbol(symbol: &str) -> Option<Self>;
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value.into())
                }
            }

            impl From<Option<$ty>> for FieldValue {
                fn from(value: Option<$ty>) -> Self {
                    value.map_or(FieldValue::Empty, FieldValue::from)
                }
            }
        )*
    };
}

impl_from_value!(
    String => Text,
    &str => Text,
    i32 => Integer,
    i64 => Integer,
    u32 => Integer,
    f32 => Float,
    f64 => Float,
    Decimal => Decimal,
    bool => Boolean,
    NaiveDateTime => DateTime,
);

impl From<DynamicColumns> for FieldValue {
    fn from(value: DynamicColumns) -> Self {
        FieldValue::Columns(value)
    }
}

impl TryFrom<FieldValue> for String {
    type Error = SheetError;

    fn try_from(value: FieldValue) -> SheetResult<Self> {
        match value {
            FieldValue::Empty => Ok(String::new()),
            columns @ FieldValue::Columns(_) => Err(columns.mismatch("text")),
            other => Ok(other.to_cell_text()),
        }
    }
}

impl TryFrom<FieldValue> for i64 {
    type Error = SheetError;

    fn try_from(value: FieldValue) -> SheetResult<Self> {
        match value {
            FieldValue::Integer(i) => Ok(i),
            other => Err(other.mismatch("integer")),
        }
    }
}

macro_rules! impl_try_from_integer {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<FieldValue> for $ty {
                type Error = SheetError;

                fn try_from(value: FieldValue) -> SheetResult<Self> {
                    let wide = i64::try_from(value)?;
                    <$ty>::try_from(wide).map_err(|_| {
                        SheetError::format(
                            wide.to_string(),
                            concat!("value out of range for ", stringify!($ty)),
                        )
                    })
                }
            }
        )*
    };
}

impl_try_from_integer!(i32, u32);

impl TryFrom<FieldValue> for f64 {
    type Error = SheetError;

    fn try_from(value: FieldValue) -> SheetResult<Self> {
        match value {
            FieldValue::Float(f) => Ok(f),
            FieldValue::Integer(i) => Ok(i as f64),
            FieldValue::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| SheetError::format(d.to_string(), "decimal out of range for float")),
            other => Err(other.mismatch("float")),
        }
    }
}

impl TryFrom<FieldValue> for f32 {
    type Error = SheetError;

    fn try_from(value: FieldValue) -> SheetResult<Self> {
        f64::try_from(value).map(|f| f as f32)
    }
}

impl TryFrom<FieldValue> for Decimal {
    type Error = SheetError;

    fn try_from(value: FieldValue) -> SheetResult<Self> {
        match value {
            FieldValue::Decimal(d) => Ok(d),
            FieldValue::Integer(i) => Ok(Decimal::from(i)),
            other => Err(other.mismatch("decimal")),
        }
    }
}

impl TryFrom<FieldValue> for bool {
    type Error = SheetError;

    fn try_from(value: FieldValue) -> SheetResult<Self> {
        match value {
            FieldValue::Boolean(b) => Ok(b),
            other => Err(other.mismatch("boolean")),
        }
    }
}

impl TryFrom<FieldValue> for NaiveDateTime {
    type Error = SheetError;

    fn try_from(value: FieldValue) -> SheetResult<Self> {
        match value {
            FieldValue::DateTime(dt) => Ok(dt),
            other => Err(other.mismatch("date/time")),
        }
    }
}

impl TryFrom<FieldValue> for DynamicColumns {
    type Error = SheetError;

    fn try_from(value: FieldValue) -> SheetResult<Self> {
        match value {
            FieldValue::Columns(columns) => Ok(columns),
            FieldValue::Empty => Ok(DynamicColumns::new()),
            other => Err(other.mismatch("columns")),
        }
    }
}

macro_rules! impl_try_from_optional {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<FieldValue> for Option<$ty> {
                type Error = SheetError;

                fn try_from(value: FieldValue) -> SheetResult<Self> {
                    match value {
                        FieldValue::Empty => Ok(None),
                        other => <$ty>::try_from(other).map(Some),
                    }
                }
            }
        )*
    };
}

impl_try_from_optional!(String, i64, i32, u32, f64, f32, Decimal, bool, NaiveDateTime);

//==============================================================================
// Record Contract
//==============================================================================

/// A record that can be written as one sheet row
pub trait ExcelRow {
    /// Sheet this record belongs to; records are grouped by this value
    fn sheet_name(&self) -> Cow<'_, str>;

    /// Field table, in column order
    fn describe(&self) -> &'static [FieldDescriptor];

    /// Current value of the field called `field`
    fn field_value(&self, field: &str) -> FieldValue;
}

/// A record that can be rebuilt from one sheet row
pub trait FromExcelRow: ExcelRow + Default {
    /// Assign a coerced value. The value already matches the field's declared kind.
    fn set_field_value(&mut self, field: &str, value: FieldValue) -> SheetResult<()>;
}

impl<T: ExcelRow + ?Sized> ExcelRow for &T {
    fn sheet_name(&self) -> Cow<'_, str> {
        (**self).sheet_name()
    }

    fn describe(&self) -> &'static [FieldDescriptor] {
        (**self).describe()
    }

    fn field_value(&self, field: &str) -> FieldValue {
        (**self).field_value(field)
    }
}

impl<T: ExcelRow + ?Sized> ExcelRow for Box<T> {
    fn sheet_name(&self) -> Cow<'_, str> {
        (**self).sheet_name()
    }

    fn describe(&self) -> &'static [FieldDescriptor] {
        (**self).describe()
    }

    fn field_value(&self, field: &str) -> FieldValue {
        (**self).field_value(field)
    }
}
