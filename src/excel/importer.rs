//! Excel importer implementation - Excel (.xlsx) → Workbook

use super::styles::{PackageStyles, FIRST_CUSTOM_FORMAT_ID};
use crate::core::decoder::format_number;
use crate::error::{SheetError, SheetResult};
use crate::workbook::{CellDataType, Sheet, Workbook};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Built-in number format ids for cells calamine reports as dates without a
/// built-in date style of their own
const DATE_FORMAT_ID: u32 = 14;
const DATE_TIME_FORMAT_ID: u32 = 22;
const DURATION_FORMAT_ID: u32 = 46;

/// Excel importer for loading .xlsx files into a [`Workbook`]
pub struct ExcelImporter {
    path: PathBuf,
}

impl ExcelImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Import the file at this importer's path
    pub fn import(&self) -> SheetResult<Workbook> {
        if !self.path.exists() {
            return Err(SheetError::NotFound(self.path.display().to_string()));
        }
        let workbook: Xlsx<_> = open_workbook(&self.path)?;
        let styles = PackageStyles::read(BufReader::new(File::open(&self.path)?))?;
        debug!(path = %self.path.display(), "opened workbook");
        Self::import_workbook(workbook, styles)
    }

    /// Import an .xlsx document from any seekable stream
    pub fn import_reader<RS: Read + Seek>(mut reader: RS) -> SheetResult<Workbook> {
        // The package is read twice: cell values through calamine, styles directly
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let workbook = Xlsx::new(Cursor::new(bytes.as_slice()))?;
        let styles = PackageStyles::read(Cursor::new(bytes.as_slice()))?;
        Self::import_workbook(workbook, styles)
    }

    fn import_workbook<RS: Read + Seek>(
        mut source: Xlsx<RS>,
        mut styles: PackageStyles,
    ) -> SheetResult<Workbook> {
        let mut book = Workbook::new();
        book.set_cell_formats(std::mem::take(&mut styles.cell_formats));
        for (id, code) in std::mem::take(&mut styles.format_codes) {
            book.set_number_format_code(id, code);
        }

        for sheet_name in source.sheet_names() {
            let range = match source.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    warn!(sheet = %sheet_name, error = %e, "worksheet part unreadable");
                    book.push_sheet(Sheet::missing(sheet_name))?;
                    continue;
                }
            };

            let mut sheet = Sheet::new(sheet_name.as_str());
            let cell_styles = styles.cell_styles.get(&sheet_name);
            Self::import_values(&range, cell_styles, &mut sheet, &mut book)?;

            // Formulas live in a separate range with its own origin
            if let Ok(formulas) = source.worksheet_formula(&sheet_name) {
                Self::import_formulas(&formulas, &mut sheet)?;
            }

            debug!(sheet = %sheet.name, rows = sheet.row_count(), "imported sheet");
            book.push_sheet(sheet)?;
        }

        Ok(book)
    }

    fn import_values(
        range: &Range<Data>,
        cell_styles: Option<&HashMap<String, u32>>,
        sheet: &mut Sheet,
        book: &mut Workbook,
    ) -> SheetResult<()> {
        let Some((start_row, start_col)) = range.start() else {
            return Ok(());
        };

        for (row, col, data) in range.used_cells() {
            let Some((text, data_type, date_format)) = Self::convert_cell(data, book) else {
                continue;
            };
            let (row_index, column) = Self::position(start_row, start_col, row, col)?;
            let cell = sheet.row_at_mut(row_index).append_cell(column, text, data_type)?;
            let style = cell
                .reference
                .as_deref()
                .and_then(|reference| cell_styles?.get(reference))
                .copied();
            cell.style_index = Self::style_index(style, date_format, book);
        }

        Ok(())
    }

    /// The cell's own style, except that dates calamine recognised from a
    /// custom format code get the matching built-in date style
    fn style_index(style: Option<u32>, date_format: Option<u32>, book: &mut Workbook) -> Option<u32> {
        match (style, date_format) {
            (Some(style), Some(date_format)) => {
                let custom = book
                    .number_format_id(style)
                    .map_or(true, |id| id >= FIRST_CUSTOM_FORMAT_ID);
                if custom {
                    Some(book.style_for_number_format(date_format))
                } else {
                    Some(style)
                }
            }
            (Some(style), None) => Some(style),
            (None, Some(date_format)) => Some(book.style_for_number_format(date_format)),
            (None, None) => None,
        }
    }

    fn import_formulas(formulas: &Range<String>, sheet: &mut Sheet) -> SheetResult<()> {
        let Some((start_row, start_col)) = formulas.start() else {
            return Ok(());
        };

        for (row, col, formula) in formulas.used_cells() {
            if formula.is_empty() {
                continue;
            }
            let (row_index, column) = Self::position(start_row, start_col, row, col)?;
            let cell = sheet.row_at_mut(row_index).cell_at_mut(column)?;
            cell.formula = Some(formula.clone());
        }

        Ok(())
    }

    /// 1-based (row, column) from a range origin and offsets into it
    fn position(start_row: u32, start_col: u32, row: usize, col: usize) -> SheetResult<(u32, u32)> {
        let offset = |base: u32, delta: usize| {
            u32::try_from(delta)
                .ok()
                .and_then(|delta| base.checked_add(delta))
                .and_then(|absolute| absolute.checked_add(1))
                .ok_or_else(|| SheetError::InputDomain("cell position out of range".to_string()))
        };
        Ok((offset(start_row, row)?, offset(start_col, col)?))
    }

    /// Raw text, explicit type and, for dates, a built-in date format id
    fn convert_cell(
        data: &Data,
        book: &mut Workbook,
    ) -> Option<(String, Option<CellDataType>, Option<u32>)> {
        let converted = match data {
            Data::Empty => return None,
            Data::String(s) => (
                book.intern_shared_string(s).to_string(),
                Some(CellDataType::SharedString),
                None,
            ),
            Data::Int(i) => (i.to_string(), None, None),
            Data::Float(f) => (format_number(*f), None, None),
            Data::Bool(b) => (
                if *b { "1" } else { "0" }.to_string(),
                Some(CellDataType::Boolean),
                None,
            ),
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                let format_id = if dt.is_duration() {
                    DURATION_FORMAT_ID
                } else if serial.fract() != 0.0 {
                    DATE_TIME_FORMAT_ID
                } else {
                    DATE_FORMAT_ID
                };
                (format_number(serial), None, Some(format_id))
            }
            Data::DateTimeIso(s) => (s.clone(), Some(CellDataType::Date), None),
            Data::DurationIso(s) => (s.clone(), Some(CellDataType::String), None),
            Data::Error(e) => (e.to_string(), Some(CellDataType::Error), None),
        };
        Some(converted)
    }
}
