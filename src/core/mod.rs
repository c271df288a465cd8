//! Mapping engine: schema resolution, cell decoding, row writing and reading

pub mod cell_reference;
pub mod decoder;
pub mod row_reader;
pub mod row_writer;
pub mod schema;

pub use cell_reference::{column_index, column_letters, parse_cell_reference, CellReferenceParser};
pub use decoder::{CellDecoder, DecodeKind, DecodedValue, NumberFormatRegistry};
pub use row_reader::{ReadReport, RejectedRow};
pub use row_writer::{resolve_cell_type, CellType, SheetLayout};
pub use schema::{header_matches, resolve_fields, ROW_IDENTITY_FIELD};
