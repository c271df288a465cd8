//! Excel exporter implementation - Workbook → Excel (.xlsx)

use crate::core::cell_reference::CellReferenceParser;
use crate::error::{FormatErrorContext, SheetError, SheetResult};
use crate::workbook::{Cell, CellDataType, Sheet, Workbook};
use rust_xlsxwriter::{Format, Formula, Workbook as XlsxWorkbook, Worksheet};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Excel exporter writing a [`Workbook`] through rust_xlsxwriter
pub struct ExcelExporter<'a> {
    book: &'a Workbook,
}

impl<'a> ExcelExporter<'a> {
    pub fn new(book: &'a Workbook) -> Self {
        Self { book }
    }

    /// Serialize the whole document to .xlsx bytes
    pub fn to_bytes(&self) -> SheetResult<Vec<u8>> {
        let mut output = XlsxWorkbook::new();
        let references = CellReferenceParser::new()?;

        for sheet in self.book.sheets() {
            self.export_sheet(&mut output, sheet, &references)?;
        }

        Ok(output.save_to_buffer()?)
    }

    /// Save to `path`. The document is built in memory first and then moved
    /// over the target, so a failed export leaves any existing file untouched.
    pub fn save(&self, path: &Path) -> SheetResult<()> {
        let bytes = self.to_bytes()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&bytes)?;
        staged.flush()?;
        staged.persist(path).map_err(|e| SheetError::Io(e.error))?;

        debug!(path = %path.display(), bytes = bytes.len(), "saved workbook");
        Ok(())
    }

    fn export_sheet(
        &self,
        output: &mut XlsxWorkbook,
        sheet: &Sheet,
        references: &CellReferenceParser,
    ) -> SheetResult<()> {
        let worksheet = output.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for row in sheet.rows().unwrap_or_default() {
            for (position, cell) in row.cells.iter().enumerate() {
                let (column, row_index) = match cell.reference.as_deref() {
                    Some(reference) => references.parse(reference)?,
                    None => (row.column_index_of(position)?, row.index),
                };
                let (row_num, col_num) = Self::zero_based(row_index, column)?;
                self.export_cell(worksheet, row_num, col_num, cell)?;
            }
        }

        Ok(())
    }

    /// 1-based (row, column) to rust_xlsxwriter's 0-based coordinates
    fn zero_based(row_index: u32, column: u32) -> SheetResult<(u32, u16)> {
        let row_num = row_index
            .checked_sub(1)
            .ok_or_else(|| SheetError::InputDomain("row index 0".to_string()))?;
        let col_num = column
            .checked_sub(1)
            .and_then(|c| u16::try_from(c).ok())
            .ok_or_else(|| SheetError::InputDomain(format!("column {} out of range", column)))?;
        Ok((row_num, col_num))
    }

    fn export_cell(
        &self,
        worksheet: &mut Worksheet,
        row_num: u32,
        col_num: u16,
        cell: &Cell,
    ) -> SheetResult<()> {
        if let Some(formula) = &cell.formula {
            let formula = Formula::new(formula).set_result(cell.value.as_str());
            worksheet.write_formula(row_num, col_num, formula)?;
            return Ok(());
        }

        let value = cell.value.as_str();
        match cell.data_type {
            Some(CellDataType::Number) => {
                if value.trim().is_empty() {
                    return Ok(());
                }
                let number = Self::number(value).ok_or_else(|| {
                    FormatErrorContext::new(value, "numeric cell holds non-numeric text")
                        .with_cell(cell.reference.clone().unwrap_or_default())
                })?;
                worksheet.write_number(row_num, col_num, number)?;
            }
            Some(CellDataType::SharedString) => {
                let text = value
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.book.shared_string(index))
                    .unwrap_or(value);
                worksheet.write_string(row_num, col_num, text)?;
            }
            Some(CellDataType::Boolean) => {
                worksheet.write_boolean(row_num, col_num, value.trim() != "0")?;
            }
            Some(
                CellDataType::String
                | CellDataType::InlineString
                | CellDataType::Date
                | CellDataType::Error,
            ) => {
                if !value.is_empty() {
                    worksheet.write_string(row_num, col_num, value)?;
                }
            }
            None => self.export_untyped(worksheet, row_num, col_num, cell)?,
        }
        Ok(())
    }

    /// Cells without a type: styled numbers keep their format, the rest are
    /// numbers when they parse and strings otherwise
    fn export_untyped(
        &self,
        worksheet: &mut Worksheet,
        row_num: u32,
        col_num: u16,
        cell: &Cell,
    ) -> SheetResult<()> {
        let value = cell.value.as_str();
        if value.trim().is_empty() {
            return Ok(());
        }

        let format = cell.style_index.and_then(|style| self.number_format(style));

        match (Self::number(value), format) {
            (Some(number), Some(format)) => {
                worksheet.write_number_with_format(row_num, col_num, number, &format)?;
            }
            (Some(number), None) => {
                worksheet.write_number(row_num, col_num, number)?;
            }
            (None, _) => {
                worksheet.write_string(row_num, col_num, value)?;
            }
        }
        Ok(())
    }

    /// Number format behind a style: the declared code for custom ids, the
    /// built-in index otherwise. General needs no format.
    fn number_format(&self, style: u32) -> Option<Format> {
        let id = self.book.number_format_id(style).filter(|&id| id != 0)?;
        match self.book.number_format_code(id) {
            Some(code) => Some(Format::new().set_num_format(code)),
            None => u8::try_from(id)
                .ok()
                .map(|index| Format::new().set_num_format_index(index)),
        }
    }

    fn number(value: &str) -> Option<f64> {
        value.trim().replace(',', ".").parse::<f64>().ok()
    }
}
