//! sheet-records - typed records ⇄ spreadsheet rows
//!
//! This library maps collections of typed records onto named sheets of an
//! .xlsx workbook and parses sheet rows back into records.
//!
//! # Features
//!
//! - Field tables (`ExcelRow::describe`) drive column layout, no reflection
//! - Header-driven reads: column order in the file does not matter
//! - Dynamic columns expanded from a string map field
//! - Number-format aware decoding (dates, currency, numbers, text)
//! - Create-only or append writes, atomic on disk
//!
//! # Example
//!
//! ```no_run
//! use sheet_records::{
//!     ExcelConverter, ExcelRow, FieldDescriptor, FieldKind, FieldValue, FromExcelRow,
//!     SheetResult,
//! };
//! use std::borrow::Cow;
//!
//! static FIELDS: [FieldDescriptor; 2] = [
//!     FieldDescriptor::new("Name", FieldKind::String),
//!     FieldDescriptor::new("Age", FieldKind::Integer),
//! ];
//!
//! #[derive(Default)]
//! struct Person {
//!     name: String,
//!     age: i64,
//! }
//!
//! impl ExcelRow for Person {
//!     fn sheet_name(&self) -> Cow<'_, str> {
//!         Cow::Borrowed("People")
//!     }
//!
//!     fn describe(&self) -> &'static [FieldDescriptor] {
//!         &FIELDS
//!     }
//!
//!     fn field_value(&self, field: &str) -> FieldValue {
//!         match field {
//!             "Name" => self.name.as_str().into(),
//!             "Age" => self.age.into(),
//!             _ => FieldValue::Empty,
//!         }
//!     }
//! }
//!
//! impl FromExcelRow for Person {
//!     fn set_field_value(&mut self, field: &str, value: FieldValue) -> SheetResult<()> {
//!         match field {
//!             "Name" => self.name = value.try_into()?,
//!             "Age" => self.age = value.try_into()?,
//!             _ => {}
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let converter = ExcelConverter::new();
//! let people = vec![Person { name: "Ada".into(), age: 36 }];
//! converter.write(&people, "people.xlsx")?;
//!
//! let back: Vec<Person> = converter.read("people.xlsx")?;
//! println!("Read {} people", back.len());
//! # Ok::<(), sheet_records::SheetError>(())
//! ```

pub mod config;
pub mod converter;
pub mod core;
pub mod error;
pub mod excel;
pub mod types;
pub mod workbook;

// Re-export commonly used types
pub use config::{ConverterConfig, ReadPolicy, WriteMode};
pub use converter::ExcelConverter;
pub use crate::core::{DecodeKind, NumberFormatRegistry, ReadReport, RejectedRow};
pub use error::{FormatErrorContext, SheetError, SheetResult};
pub use types::{
    DynamicColumns, ExcelEnum, ExcelRow, FieldDescriptor, FieldKind, FieldValue, FromExcelRow,
};
pub use workbook::{Cell, CellDataType, Row, Sheet, Workbook};
