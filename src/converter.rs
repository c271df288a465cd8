//! Record ⇄ workbook conversion
//!
//! Writing groups records by their sheet name and lays each group out as a
//! header row followed by one data row per record. Reading picks the sheets
//! named by the record type and binds every data row through the header.

use crate::config::{ConverterConfig, ReadPolicy, WriteMode};
use crate::core::decoder::{CellDecoder, NumberFormatRegistry};
use crate::core::row_reader::{read_rows, ReadReport};
use crate::core::row_writer::{write_data_row, write_header, SheetLayout};
use crate::core::schema::resolve_fields;
use crate::error::{SheetError, SheetResult};
use crate::types::{ExcelRow, FromExcelRow};
use crate::workbook::{Sheet, Workbook};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Converts record collections to and from spreadsheet documents
#[derive(Debug, Clone, Default)]
pub struct ExcelConverter {
    config: ConverterConfig,
    formats: NumberFormatRegistry,
}

impl ExcelConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ConverterConfig) -> Self {
        let formats = config.number_format_registry();
        Self { config, formats }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    //==========================================================================
    // Writing
    //==========================================================================

    /// Write `rows` to the file at `path`.
    ///
    /// With [`WriteMode::CreateOrAppend`] an existing file is loaded and its
    /// sheets extended; otherwise the file is replaced by a new document.
    pub fn write<R: ExcelRow, P: AsRef<Path>>(&self, rows: &[R], path: P) -> SheetResult<()> {
        let path = path.as_ref();
        let mut book = if self.config.write_mode == WriteMode::CreateOrAppend && path.exists() {
            Workbook::open(path)?
        } else {
            Workbook::new()
        };

        self.write_workbook(rows, &mut book)?;
        book.save(path)
    }

    /// Write `rows` as a new document to `writer`
    pub fn write_to_writer<R: ExcelRow, W: Write>(&self, rows: &[R], writer: W) -> SheetResult<()> {
        let mut book = Workbook::new();
        self.write_workbook(rows, &mut book)?;
        book.write_to(writer)
    }

    /// Write `rows` into a caller-owned workbook
    pub fn write_workbook<R: ExcelRow>(&self, rows: &[R], book: &mut Workbook) -> SheetResult<()> {
        let mut groups: IndexMap<String, Vec<&R>> = IndexMap::new();
        for row in rows {
            let name = row.sheet_name();
            if name.is_empty() {
                return Err(SheetError::InputDomain(
                    "record has an empty sheet name".to_string(),
                ));
            }
            groups.entry(name.into_owned()).or_default().push(row);
        }

        // Excel sheet names are case-insensitive; refuse before touching the book
        let mut seen = HashSet::new();
        for name in groups.keys() {
            if !seen.insert(name.to_lowercase()) {
                return Err(SheetError::DuplicateSheet(name.clone()));
            }
        }

        for (name, records) in &groups {
            self.write_sheet(name, records, book)?;
        }
        Ok(())
    }

    fn write_sheet<R: ExcelRow>(
        &self,
        name: &str,
        records: &[&R],
        book: &mut Workbook,
    ) -> SheetResult<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };
        let fields = resolve_fields(first.describe());

        let exists = book.sheet(name).is_some();
        if exists && self.config.write_mode == WriteMode::CreateOnly {
            return Err(SheetError::DuplicateSheet(name.to_string()));
        }
        let header = match book.sheet(name) {
            Some(sheet) => self.existing_header(book, sheet)?,
            None => None,
        };

        // One layout for the whole sheet so every row lines up with the header
        let mut layout = match &header {
            Some((_, cells)) => SheetLayout::from_header(&fields, cells),
            None => SheetLayout::new(),
        };
        let known_columns = layout.extend(&fields, records)?;

        let sheet = if exists {
            book.sheet_mut(name)
                .ok_or_else(|| SheetError::NotFound(format!("sheet '{}'", name)))?
        } else {
            debug!(sheet = name, "creating sheet");
            book.add_sheet(name)?
        };

        // Only a sheet without any rows gets a full header
        let mut next_row = sheet.last_row_index() + 1;
        match header {
            Some((header_index, _)) => {
                debug!(sheet = name, after_row = next_row - 1, "appending to sheet");
                if known_columns < layout.len() {
                    debug!(sheet = name, added = layout.len() - known_columns, "extending header");
                    write_header(&layout, sheet.row_at_mut(header_index), known_columns)?;
                }
            }
            None => {
                write_header(&layout, sheet.append_row(next_row), 0)?;
                next_row += 1;
            }
        }

        for record in records {
            write_data_row(&layout, sheet.append_row(next_row), *record)?;
            next_row += 1;
        }

        debug!(sheet = name, records = records.len(), "wrote records");
        Ok(())
    }

    /// Row index and (column, text) cells of a populated sheet's header row
    fn existing_header(
        &self,
        book: &Workbook,
        sheet: &Sheet,
    ) -> SheetResult<Option<(u32, Vec<(u32, String)>)>> {
        let Some(header) = sheet.rows().and_then(|rows| rows.first()) else {
            return Ok(None);
        };
        let decoder = CellDecoder::new(book, &self.formats);
        let mut cells = Vec::with_capacity(header.cells.len());
        for (position, cell) in header.cells.iter().enumerate() {
            let text = decoder.decode(cell)?.to_text();
            cells.push((header.column_index_of(position)?, text));
        }
        Ok(Some((header.index, cells)))
    }

    //==========================================================================
    // Reading
    //==========================================================================

    /// Read every record of type `T` from the file at `path`
    pub fn read<T: FromExcelRow, P: AsRef<Path>>(&self, path: P) -> SheetResult<Vec<T>> {
        let book = Workbook::open(path)?;
        self.read_workbook(&book)
    }

    /// Read every record of type `T` from an .xlsx stream
    pub fn read_from_reader<T: FromExcelRow, RS: Read + Seek>(&self, reader: RS) -> SheetResult<Vec<T>> {
        let book = Workbook::from_reader(reader)?;
        self.read_workbook(&book)
    }

    /// Read every record of type `T` from a workbook, following the configured read policy
    pub fn read_workbook<T: FromExcelRow>(&self, book: &Workbook) -> SheetResult<Vec<T>> {
        let report = self.collect::<T>(book, self.config.read_policy)?;
        Ok(report.records)
    }

    /// Read every bindable record of type `T`; rows that fail are reported
    /// instead of aborting the read
    pub fn read_report<T: FromExcelRow>(&self, book: &Workbook) -> SheetResult<ReadReport<T>> {
        self.collect::<T>(book, ReadPolicy::SkipInvalidRows)
    }

    fn collect<T: FromExcelRow>(
        &self,
        book: &Workbook,
        policy: ReadPolicy,
    ) -> SheetResult<ReadReport<T>> {
        let prototype = T::default();
        let sheet_name = prototype.sheet_name();
        let fields = resolve_fields(prototype.describe());
        let decoder = CellDecoder::new(book, &self.formats);
        let mut report = ReadReport::default();

        for sheet in book.sheets().iter().filter(|sheet| sheet.name == sheet_name) {
            let Some(rows) = sheet.rows() else {
                warn!(sheet = %sheet.name, "sheet has no backing part, skipping");
                continue;
            };
            debug!(sheet = %sheet.name, rows = rows.len(), "reading sheet");
            read_rows(&sheet.name, rows, &fields, &decoder, policy, &mut report)?;
        }

        Ok(report)
    }
}
