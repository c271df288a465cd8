//! In-memory spreadsheet document
//!
//! Holds exactly what the mapping engine needs from a workbook: named sheets of
//! sparse rows, a shared-string table and the style → number-format table.
//! Persistence goes through [`crate::excel`] (calamine in, rust_xlsxwriter out).

use crate::core::cell_reference::{cell_reference, column_index, column_of};
use crate::error::{SheetError, SheetResult};
use crate::excel::{ExcelExporter, ExcelImporter};
use indexmap::IndexSet;
use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};
use std::path::Path;

/// Explicit cell data type (the `t` attribute of a cell)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellDataType {
    Number,
    String,
    SharedString,
    InlineString,
    Boolean,
    Error,
    /// ISO 8601 date text
    Date,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    /// A1 reference; absent when the producer did not record one
    pub reference: Option<String>,
    /// Raw text, or the cached result for formula cells
    pub value: String,
    pub data_type: Option<CellDataType>,
    pub style_index: Option<u32>,
    pub formula: Option<String>,
}

impl Cell {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_data_type(mut self, data_type: CellDataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_style(mut self, style_index: u32) -> Self {
        self.style_index = Some(style_index);
        self
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    /// Column letters from the reference
    pub fn column(&self) -> &str {
        column_of(self.reference.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based
    pub index: u32,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            cells: Vec::new(),
        }
    }

    /// Append a cell at `column` (1-based), filling in its reference
    pub fn append_cell(
        &mut self,
        column: u32,
        value: impl Into<String>,
        data_type: Option<CellDataType>,
    ) -> SheetResult<&mut Cell> {
        let mut cell = Cell::new(value).with_reference(cell_reference(self.index, column)?);
        cell.data_type = data_type;
        let position = self.cells.len();
        self.cells.push(cell);
        Ok(&mut self.cells[position])
    }

    /// Cell at `column`, created in column order if missing
    pub fn cell_at_mut(&mut self, column: u32) -> SheetResult<&mut Cell> {
        let mut position = self.cells.len();
        let mut found = None;
        for i in 0..self.cells.len() {
            let existing = self.column_index_of(i)?;
            if existing == column {
                found = Some(i);
                break;
            }
            if existing > column {
                position = i;
                break;
            }
        }
        if let Some(i) = found {
            return Ok(&mut self.cells[i]);
        }
        let cell = Cell::default().with_reference(cell_reference(self.index, column)?);
        self.cells.insert(position, cell);
        Ok(&mut self.cells[position])
    }

    /// Column index of the cell at `position`: from its reference, else from its position
    pub fn column_index_of(&self, position: usize) -> SheetResult<u32> {
        match self.cells.get(position) {
            Some(cell) if !cell.column().is_empty() => column_index(cell.column()),
            _ => u32::try_from(position + 1)
                .map_err(|_| SheetError::InputDomain(format!("cell position {} too large", position))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    /// `None` when the sheet is declared but its worksheet part is missing
    rows: Option<Vec<Row>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Some(Vec::new()),
        }
    }

    /// A sheet whose backing part could not be found
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.rows.is_none()
    }

    pub fn rows(&self) -> Option<&[Row]> {
        self.rows.as_deref()
    }

    /// Highest row index present, 0 for an empty or missing sheet
    pub fn last_row_index(&self) -> u32 {
        self.rows
            .iter()
            .flatten()
            .map(|row| row.index)
            .max()
            .unwrap_or(0)
    }

    /// Append a new empty row; a missing sheet gets a fresh row collection
    pub fn append_row(&mut self, index: u32) -> &mut Row {
        let rows = self.rows.get_or_insert_with(Vec::new);
        rows.push(Row::new(index));
        let last = rows.len() - 1;
        &mut rows[last]
    }

    /// Row with `index`, inserted in row order if missing
    pub fn row_at_mut(&mut self, index: u32) -> &mut Row {
        let rows = self.rows.get_or_insert_with(Vec::new);
        let position = match rows.iter().rposition(|row| row.index <= index) {
            Some(p) if rows[p].index == index => p,
            Some(p) => {
                rows.insert(p + 1, Row::new(index));
                p + 1
            }
            None => {
                rows.insert(0, Row::new(index));
                0
            }
        };
        &mut rows[position]
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }
}

/// A spreadsheet document
#[derive(Debug, Clone, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    shared_strings: Option<IndexSet<String>>,
    /// Style index → number format id
    cell_formats: Vec<u32>,
    /// Format codes of the custom (non built-in) number format ids
    format_codes: BTreeMap<u32, String>,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    /// Empty document; style 0 is the General format
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            shared_strings: None,
            cell_formats: vec![0],
            format_codes: BTreeMap::new(),
        }
    }

    /// Open an .xlsx file
    pub fn open<P: AsRef<Path>>(path: P) -> SheetResult<Self> {
        ExcelImporter::new(path).import()
    }

    /// Load an .xlsx document from a stream
    pub fn from_reader<R: Read + Seek>(reader: R) -> SheetResult<Self> {
        ExcelImporter::import_reader(reader)
    }

    /// Save as .xlsx; the target is only replaced once the document is fully built
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SheetResult<()> {
        ExcelExporter::new(self).save(path.as_ref())
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> SheetResult<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> SheetResult<Vec<u8>> {
        ExcelExporter::new(self).to_bytes()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|sheet| sheet.name == name)
    }

    /// Sheet whose name equals `name` ignoring case, as Excel compares sheet names
    pub fn sheet_ignoring_case(&self, name: &str) -> Option<&Sheet> {
        let wanted = name.to_lowercase();
        self.sheets
            .iter()
            .find(|sheet| sheet.name.to_lowercase() == wanted)
    }

    /// Add an empty sheet. Lookups are case-sensitive, but two names may not
    /// differ only by case.
    pub fn add_sheet(&mut self, name: &str) -> SheetResult<&mut Sheet> {
        self.push_sheet(Sheet::new(name))
    }

    pub(crate) fn push_sheet(&mut self, sheet: Sheet) -> SheetResult<&mut Sheet> {
        if self.sheet_ignoring_case(&sheet.name).is_some() {
            return Err(SheetError::DuplicateSheet(sheet.name));
        }
        self.sheets.push(sheet);
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    pub fn shared_strings(&self) -> Option<&IndexSet<String>> {
        self.shared_strings.as_ref()
    }

    pub fn shared_string(&self, index: usize) -> Option<&str> {
        self.shared_strings
            .as_ref()
            .and_then(|table| table.get_index(index))
            .map(String::as_str)
    }

    /// Index of `text` in the shared-string table, adding it if needed
    pub fn intern_shared_string(&mut self, text: &str) -> usize {
        let table = self.shared_strings.get_or_insert_with(IndexSet::new);
        match table.get_index_of(text) {
            Some(index) => index,
            None => table.insert_full(text.to_string()).0,
        }
    }

    /// Number format id behind a style index
    pub fn number_format_id(&self, style_index: u32) -> Option<u32> {
        self.cell_formats.get(style_index as usize).copied()
    }

    /// Replace the style table, e.g. with the `cellXfs` list of a loaded file
    pub fn set_cell_formats(&mut self, number_format_ids: Vec<u32>) {
        if number_format_ids.is_empty() {
            self.cell_formats = vec![0];
        } else {
            self.cell_formats = number_format_ids;
        }
    }

    /// Format code declared for a custom number format id
    pub fn number_format_code(&self, number_format_id: u32) -> Option<&str> {
        self.format_codes.get(&number_format_id).map(String::as_str)
    }

    pub fn set_number_format_code(&mut self, number_format_id: u32, code: impl Into<String>) {
        self.format_codes.insert(number_format_id, code.into());
    }

    /// Style index using `number_format_id`, adding a style if none exists
    pub fn style_for_number_format(&mut self, number_format_id: u32) -> u32 {
        let index = match self
            .cell_formats
            .iter()
            .position(|&id| id == number_format_id)
        {
            Some(index) => index,
            None => {
                self.cell_formats.push(number_format_id);
                self.cell_formats.len() - 1
            }
        };
        index as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_cell_sets_reference() {
        let mut row = Row::new(3);
        row.append_cell(1, "a", Some(CellDataType::String)).unwrap();
        row.append_cell(28, "b", None).unwrap();
        assert_eq!(row.cells[0].reference.as_deref(), Some("A3"));
        assert_eq!(row.cells[1].reference.as_deref(), Some("AB3"));
        assert_eq!(row.cells[1].column(), "AB");
    }

    #[test]
    fn test_cell_at_mut_keeps_column_order() {
        let mut row = Row::new(1);
        row.append_cell(1, "a", None).unwrap();
        row.append_cell(3, "c", None).unwrap();
        row.cell_at_mut(2).unwrap().value = "b".to_string();
        let values: Vec<&str> = row.cells.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
        row.cell_at_mut(3).unwrap().formula = Some("A1&B1".to_string());
        assert_eq!(row.cells.len(), 3);
    }

    #[test]
    fn test_column_index_falls_back_to_position() {
        let mut row = Row::new(1);
        row.cells.push(Cell::new("x"));
        row.cells.push(Cell::new("y").with_reference("D1"));
        assert_eq!(row.column_index_of(0).unwrap(), 1);
        assert_eq!(row.column_index_of(1).unwrap(), 4);
    }

    #[test]
    fn test_sheet_last_row_index() {
        let mut sheet = Sheet::new("Data");
        assert_eq!(sheet.last_row_index(), 0);
        sheet.append_row(1);
        sheet.append_row(7);
        assert_eq!(sheet.last_row_index(), 7);
        assert_eq!(Sheet::missing("Gone").last_row_index(), 0);
    }

    #[test]
    fn test_row_at_mut_keeps_row_order() {
        let mut sheet = Sheet::new("Data");
        sheet.row_at_mut(3);
        sheet.row_at_mut(1);
        sheet.row_at_mut(2).append_cell(1, "x", None).unwrap();
        sheet.row_at_mut(3);
        let indexes: Vec<u32> = sheet.rows().unwrap().iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
        assert_eq!(sheet.rows().unwrap()[1].cells.len(), 1);
    }

    #[test]
    fn test_duplicate_sheet_rejected() {
        let mut book = Workbook::new();
        book.add_sheet("Sheet1").unwrap();
        assert!(matches!(
            book.add_sheet("Sheet1"),
            Err(SheetError::DuplicateSheet(name)) if name == "Sheet1"
        ));
    }

    #[test]
    fn test_sheet_names_differing_by_case_rejected() {
        let mut book = Workbook::new();
        book.add_sheet("Sheet1").unwrap();
        assert!(matches!(
            book.add_sheet("sheet1"),
            Err(SheetError::DuplicateSheet(name)) if name == "sheet1"
        ));
        assert!(book.sheet("sheet1").is_none());
        assert_eq!(book.sheet_ignoring_case("SHEET1").map(|s| s.name.as_str()), Some("Sheet1"));
    }

    #[test]
    fn test_shared_strings_interning() {
        let mut book = Workbook::new();
        assert_eq!(book.shared_string(0), None);
        assert_eq!(book.intern_shared_string("alpha"), 0);
        assert_eq!(book.intern_shared_string("beta"), 1);
        assert_eq!(book.intern_shared_string("alpha"), 0);
        assert_eq!(book.shared_string(1), Some("beta"));
        assert_eq!(book.shared_strings().map(|table| table.len()), Some(2));
    }

    #[test]
    fn test_interning_many_strings_keeps_indexes() {
        let mut book = Workbook::new();
        for i in 0..50_000 {
            assert_eq!(book.intern_shared_string(&format!("text {}", i)), i);
        }
        assert_eq!(book.intern_shared_string("text 49999"), 49_999);
        assert_eq!(book.shared_string(12_345), Some("text 12345"));
    }

    #[test]
    fn test_loaded_style_table_and_codes() {
        let mut book = Workbook::new();
        book.set_cell_formats(vec![0, 7, 164]);
        book.set_number_format_code(164, "0.000");
        assert_eq!(book.number_format_id(2), Some(164));
        assert_eq!(book.number_format_code(164), Some("0.000"));
        assert_eq!(book.number_format_code(7), None);
        book.set_cell_formats(Vec::new());
        assert_eq!(book.number_format_id(0), Some(0));
    }

    #[test]
    fn test_styles_map_to_number_formats() {
        let mut book = Workbook::new();
        assert_eq!(book.number_format_id(0), Some(0));
        let date_style = book.style_for_number_format(14);
        assert_eq!(date_style, 1);
        assert_eq!(book.style_for_number_format(14), 1);
        assert_eq!(book.number_format_id(date_style), Some(14));
        assert_eq!(book.number_format_id(99), None);
    }
}
