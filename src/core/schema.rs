//! Which record fields become columns, and under what names

use crate::types::FieldDescriptor;

/// Field carrying the record's sheet name; it selects the sheet and is never a column
pub const ROW_IDENTITY_FIELD: &str = "SheetName";

/// Exact, ordinal name comparison against the row-identity contract
pub fn is_row_identity(field: &FieldDescriptor) -> bool {
    field.name == ROW_IDENTITY_FIELD
}

/// Mappable fields of a record type, in column order
pub fn resolve_fields(descriptors: &'static [FieldDescriptor]) -> Vec<&'static FieldDescriptor> {
    descriptors
        .iter()
        .filter(|field| !is_row_identity(field))
        .collect()
}

/// The first dynamic-columns field, if the type declares one
pub fn dynamic_columns_field<'a>(
    fields: &[&'a FieldDescriptor],
) -> Option<&'a FieldDescriptor> {
    fields.iter().copied().find(|field| field.is_dynamic_columns())
}

/// Whether a header cell belongs to a field's column name.
///
/// Whitespace is removed from both sides and letters compare case-insensitively,
/// so `First Name`, `FirstName` and `firstname` all match each other.
pub fn header_matches(column_name: &str, header: &str) -> bool {
    let mut left = column_name.chars().filter(|c| !c.is_whitespace());
    let mut right = header.chars().filter(|c| !c.is_whitespace());
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(a), Some(b)) if a.to_lowercase().eq(b.to_lowercase()) => continue,
            _ => return false,
        }
    }
}

/// Scalar field bound to a header, skipping dynamic-columns fields
pub fn find_field<'a>(
    fields: &[&'a FieldDescriptor],
    header: &str,
) -> Option<&'a FieldDescriptor> {
    fields
        .iter()
        .copied()
        .filter(|field| !field.is_dynamic_columns())
        .find(|field| header_matches(field.column_name(), header))
}
