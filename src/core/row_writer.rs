//! Header and data cells for one record

use crate::core::schema::{dynamic_columns_field, find_field};
use crate::error::{SheetError, SheetResult};
use crate::types::{DynamicColumns, ExcelRow, FieldDescriptor, FieldKind, FieldValue};
use crate::workbook::{CellDataType, Row};

/// Cell type written for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Numeric,
    String,
}

impl CellType {
    pub fn data_type(self) -> CellDataType {
        match self {
            CellType::Numeric => CellDataType::Number,
            CellType::String => CellDataType::String,
        }
    }
}

/// Only arithmetic kinds get numeric cells; the rest round-trip as text
pub fn resolve_cell_type(kind: &FieldKind) -> CellType {
    match kind.unwrap_nullable() {
        FieldKind::Integer | FieldKind::Float | FieldKind::Decimal => CellType::Numeric,
        _ => CellType::String,
    }
}

/// What one sheet column is filled from
#[derive(Debug, Clone, PartialEq)]
enum ColumnSource {
    Field(&'static FieldDescriptor),
    /// One key of a dynamic-columns field
    Entry(&'static FieldDescriptor, String),
    /// Header text no field of the record type maps to
    Unmapped,
}

/// Column layout shared by a sheet's header and every data row written to it.
///
/// Built once per sheet: from the existing header row when appending, then
/// extended with every scalar field and dynamic key the new records carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    columns: Vec<(u32, ColumnSource)>,
}

impl SheetLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout of an existing header row, given as (column, header text) pairs
    pub fn from_header(fields: &[&'static FieldDescriptor], header: &[(u32, String)]) -> Self {
        let dynamic = dynamic_columns_field(fields);
        let columns = header
            .iter()
            .map(|(column, text)| {
                let source = match (find_field(fields, text), dynamic) {
                    (Some(field), _) => ColumnSource::Field(field),
                    (None, Some(field)) => ColumnSource::Entry(field, text.clone()),
                    (None, None) => ColumnSource::Unmapped,
                };
                (*column, source)
            })
            .collect();
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn next_column(&self) -> u32 {
        self.columns.iter().map(|(column, _)| *column).max().unwrap_or(0) + 1
    }

    fn has_field(&self, field: &FieldDescriptor) -> bool {
        self.columns
            .iter()
            .any(|(_, source)| matches!(source, ColumnSource::Field(f) if f.name == field.name))
    }

    fn has_entry(&self, field: &FieldDescriptor, key: &str) -> bool {
        self.columns.iter().any(|(_, source)| {
            matches!(source, ColumnSource::Entry(f, k) if f.name == field.name && k == key)
        })
    }

    fn push(&mut self, source: ColumnSource) {
        let column = self.next_column();
        self.columns.push((column, source));
    }

    /// Add columns for the fields and dynamic keys of `records` that the
    /// layout lacks, in field order and then first-appearance order of keys.
    /// Returns how many columns the layout had before.
    pub fn extend<R: ExcelRow + ?Sized>(
        &mut self,
        fields: &[&'static FieldDescriptor],
        records: &[&R],
    ) -> SheetResult<usize> {
        let before = self.columns.len();
        for &field in fields {
            if field.is_dynamic_columns() {
                for record in records {
                    for key in dynamic_columns(field, *record)?.keys() {
                        if !self.has_entry(field, key) {
                            self.push(ColumnSource::Entry(field, key.clone()));
                        }
                    }
                }
            } else if !self.has_field(field) {
                self.push(ColumnSource::Field(field));
            }
        }
        Ok(before)
    }
}

/// Header cells for the layout's columns from position `start` on.
///
/// A new sheet passes 0; appending passes what [`SheetLayout::extend`] returned
/// so only the added columns get a header cell.
pub fn write_header(layout: &SheetLayout, row: &mut Row, start: usize) -> SheetResult<()> {
    for (column, source) in layout.columns.iter().skip(start) {
        let text = match source {
            ColumnSource::Field(field) => field.column_name(),
            ColumnSource::Entry(_, key) => key.as_str(),
            ColumnSource::Unmapped => continue,
        };
        row.append_cell(*column, text, Some(CellDataType::String))?;
    }
    Ok(())
}

/// Data row: every layout column gets a cell. Dynamic entries are looked up by
/// their header key, so map order never matters; a missing key writes "".
pub fn write_data_row<R: ExcelRow + ?Sized>(
    layout: &SheetLayout,
    row: &mut Row,
    record: &R,
) -> SheetResult<()> {
    let mut maps: Vec<(&str, DynamicColumns)> = Vec::new();

    for (column, source) in &layout.columns {
        match source {
            ColumnSource::Field(field) => {
                let text = record.field_value(field.name).to_cell_text();
                let cell_type = resolve_cell_type(&field.kind);
                row.append_cell(*column, text, Some(cell_type.data_type()))?;
            }
            ColumnSource::Entry(field, key) => {
                let position = match maps.iter().position(|(name, _)| *name == field.name) {
                    Some(position) => position,
                    None => {
                        maps.push((field.name, dynamic_columns(field, record)?));
                        maps.len() - 1
                    }
                };
                let value = maps[position].1.get(key).map_or("", String::as_str);
                row.append_cell(*column, value, Some(CellDataType::String))?;
            }
            ColumnSource::Unmapped => {
                row.append_cell(*column, "", Some(CellDataType::String))?;
            }
        }
    }
    Ok(())
}

fn dynamic_columns<R: ExcelRow + ?Sized>(
    field: &FieldDescriptor,
    record: &R,
) -> SheetResult<DynamicColumns> {
    match record.field_value(field.name) {
        FieldValue::Columns(columns) => Ok(columns),
        FieldValue::Empty => Ok(DynamicColumns::new()),
        other => Err(SheetError::format(
            other.to_cell_text(),
            "dynamic columns field must hold a string map",
        )
        .at(field.name, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::resolve_fields;
    use std::borrow::Cow;

    const AGE: FieldKind = FieldKind::Nullable(&FieldKind::Integer);

    static FIELDS: [FieldDescriptor; 5] = [
        FieldDescriptor::new("SheetName", FieldKind::String),
        FieldDescriptor::new("Name", FieldKind::String).with_display_name("Full Name"),
        FieldDescriptor::new("Age", AGE),
        FieldDescriptor::new("Attributes", FieldKind::DynamicColumns),
        FieldDescriptor::new("Active", FieldKind::Boolean),
    ];

    struct Person {
        name: String,
        age: Option<i32>,
        attributes: DynamicColumns,
        active: bool,
    }

    impl ExcelRow for Person {
        fn sheet_name(&self) -> Cow<'_, str> {
            Cow::Borrowed("People")
        }

        fn describe(&self) -> &'static [FieldDescriptor] {
            &FIELDS
        }

        fn field_value(&self, field: &str) -> FieldValue {
            match field {
                "Name" => self.name.as_str().into(),
                "Age" => self.age.into(),
                "Attributes" => self.attributes.clone().into(),
                "Active" => self.active.into(),
                _ => FieldValue::Empty,
            }
        }
    }

    fn person() -> Person {
        let mut attributes = DynamicColumns::new();
        attributes.insert("Eyes".to_string(), "Green".to_string());
        attributes.insert("Hair".to_string(), "Brown".to_string());
        Person {
            name: "Ada".to_string(),
            age: None,
            attributes,
            active: true,
        }
    }

    fn texts(row: &Row) -> Vec<&str> {
        row.cells.iter().map(|c| c.value.as_str()).collect()
    }

    #[test]
    fn test_resolve_cell_type() {
        assert_eq!(resolve_cell_type(&FieldKind::Integer), CellType::Numeric);
        assert_eq!(resolve_cell_type(&FieldKind::Float), CellType::Numeric);
        assert_eq!(resolve_cell_type(&FieldKind::Decimal), CellType::Numeric);
        assert_eq!(resolve_cell_type(&AGE), CellType::Numeric);
        assert_eq!(resolve_cell_type(&FieldKind::Boolean), CellType::String);
        assert_eq!(resolve_cell_type(&FieldKind::DateTime), CellType::String);
        assert_eq!(resolve_cell_type(&FieldKind::Enum(&["A"])), CellType::String);
        assert_eq!(resolve_cell_type(&FieldKind::String), CellType::String);
    }

    fn layout_for(records: &[&Person]) -> SheetLayout {
        let fields = resolve_fields(&FIELDS);
        let mut layout = SheetLayout::new();
        layout.extend(&fields, records).unwrap();
        layout
    }

    #[test]
    fn test_header_expands_dynamic_columns() {
        let record = person();
        let layout = layout_for(&[&record]);
        let mut row = Row::new(1);
        write_header(&layout, &mut row, 0).unwrap();

        assert_eq!(texts(&row), vec!["Full Name", "Age", "Eyes", "Hair", "Active"]);
        assert!(row
            .cells
            .iter()
            .all(|c| c.data_type == Some(CellDataType::String)));
        assert_eq!(row.cells[4].reference.as_deref(), Some("E1"));
    }

    #[test]
    fn test_data_row_mirrors_header() {
        let record = person();
        let layout = layout_for(&[&record]);
        let mut header = Row::new(1);
        let mut data = Row::new(2);
        write_header(&layout, &mut header, 0).unwrap();
        write_data_row(&layout, &mut data, &record).unwrap();

        assert_eq!(header.cells.len(), data.cells.len());
        assert_eq!(texts(&data), vec!["Ada", "", "Green", "Brown", "true"]);
        assert_eq!(data.cells[1].data_type, Some(CellDataType::Number));
        assert_eq!(data.cells[2].data_type, Some(CellDataType::String));
        assert_eq!(data.cells[0].reference.as_deref(), Some("A2"));
    }

    #[test]
    fn test_entries_follow_header_not_map_order() {
        let first = person();
        let mut second = person();
        second.attributes.clear();
        second.attributes.insert("Hair".to_string(), "Grey".to_string());
        second.attributes.insert("Eyes".to_string(), "Blue".to_string());

        let layout = layout_for(&[&first, &second]);
        let mut data = Row::new(3);
        write_data_row(&layout, &mut data, &second).unwrap();
        assert_eq!(texts(&data), vec!["Ada", "", "Blue", "Grey", "true"]);
    }

    #[test]
    fn test_keys_from_later_records_extend_header() {
        let first = person();
        let mut second = person();
        second.attributes.clear();
        second.attributes.insert("Height".to_string(), "180".to_string());

        let layout = layout_for(&[&first, &second]);
        let mut header = Row::new(1);
        write_header(&layout, &mut header, 0).unwrap();
        assert_eq!(
            texts(&header),
            vec!["Full Name", "Age", "Eyes", "Hair", "Height", "Active"]
        );

        let mut data = Row::new(2);
        write_data_row(&layout, &mut data, &first).unwrap();
        assert_eq!(texts(&data), vec!["Ada", "", "Green", "Brown", "", "true"]);

        let mut data = Row::new(3);
        write_data_row(&layout, &mut data, &second).unwrap();
        assert_eq!(texts(&data), vec!["Ada", "", "", "", "180", "true"]);
    }

    #[test]
    fn test_layout_from_existing_header() {
        let fields = resolve_fields(&FIELDS);
        let header = vec![
            (1, "Active".to_string()),
            (2, "Hair".to_string()),
            (3, "full name".to_string()),
        ];
        let mut layout = SheetLayout::from_header(&fields, &header);
        let record = person();
        let before = layout.extend(&fields, &[&record]).unwrap();
        assert_eq!(before, 3);
        assert_eq!(layout.len(), 5);

        // Only the added columns get header cells
        let mut added = Row::new(1);
        write_header(&layout, &mut added, before).unwrap();
        assert_eq!(texts(&added), vec!["Age", "Eyes"]);
        assert_eq!(added.cells[0].reference.as_deref(), Some("D1"));

        let mut data = Row::new(2);
        write_data_row(&layout, &mut data, &record).unwrap();
        assert_eq!(texts(&data), vec!["true", "Brown", "Ada", "", "Green"]);
    }

    #[test]
    fn test_unmapped_header_column_left_blank() {
        static PLAIN: [FieldDescriptor; 1] = [FieldDescriptor::new("Name", FieldKind::String)];
        let fields = resolve_fields(&PLAIN);
        let layout =
            SheetLayout::from_header(&fields, &[(1, "Notes".to_string()), (2, "Name".to_string())]);

        let mut header = Row::new(1);
        write_header(&layout, &mut header, 0).unwrap();
        assert_eq!(texts(&header), vec!["Name"]);

        let mut data = Row::new(2);
        write_data_row(&layout, &mut data, &person()).unwrap();
        assert_eq!(texts(&data), vec!["", "Ada"]);
    }
}
