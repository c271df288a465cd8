//! A1-style cell addressing
//!
//! Columns are 1-based and use bijective base-26 letters (no zero digit):
//! 1 → A, 26 → Z, 27 → AA, 53 → BA, 702 → ZZ, 703 → AAA.

use crate::error::{SheetError, SheetResult};
use regex::Regex;

/// Convert a 1-based column index to its letters
pub fn column_letters(index: u32) -> SheetResult<String> {
    if index == 0 {
        return Err(SheetError::InputDomain(
            "column index must be 1 or greater".to_string(),
        ));
    }

    let mut letters = Vec::new();
    let mut remaining = index;
    while remaining > 0 {
        let digit = (remaining - 1) % 26;
        letters.push(b'A' + digit as u8);
        remaining = (remaining - 1) / 26;
    }
    letters.reverse();

    Ok(letters.into_iter().map(char::from).collect())
}

/// Convert column letters back to a 1-based index (case-insensitive)
pub fn column_index(letters: &str) -> SheetResult<u32> {
    if letters.is_empty() {
        return Err(SheetError::InputDomain("empty column letters".to_string()));
    }

    letters.chars().try_fold(0u32, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return Err(SheetError::InputDomain(format!(
                "invalid column letters '{}'",
                letters
            )));
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        acc.checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| {
                SheetError::InputDomain(format!("column letters '{}' overflow", letters))
            })
    })
}

/// Compose a cell reference: row 4, column 1 → `A4`
pub fn cell_reference(row: u32, column: u32) -> SheetResult<String> {
    if row == 0 {
        return Err(SheetError::InputDomain(
            "row index must be 1 or greater".to_string(),
        ));
    }
    Ok(format!("{}{}", column_letters(column)?, row))
}

/// Leading letter run of a reference: `AB12` → `AB`. Empty for an absent reference.
pub fn column_of(reference: Option<&str>) -> &str {
    let Some(reference) = reference else {
        return "";
    };
    let end = reference
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(reference.len());
    &reference[..end]
}

/// Parses `A1`-style references into (column, row)
pub struct CellReferenceParser {
    pattern: Regex,
}

impl CellReferenceParser {
    pub fn new() -> SheetResult<Self> {
        // Absolute markers ($A$1) are tolerated and ignored
        let pattern = Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$")
            .map_err(|e| SheetError::InputDomain(format!("Regex error: {}", e)))?;
        Ok(Self { pattern })
    }

    pub fn parse(&self, reference: &str) -> SheetResult<(u32, u32)> {
        let captures = self.pattern.captures(reference.trim()).ok_or_else(|| {
            SheetError::InputDomain(format!("invalid cell reference '{}'", reference))
        })?;

        let letters = captures.get(1).map_or("", |m| m.as_str());
        let digits = captures.get(2).map_or("", |m| m.as_str());

        let column = column_index(letters)?;
        let row: u32 = digits.parse().map_err(|_| {
            SheetError::InputDomain(format!("invalid row in cell reference '{}'", reference))
        })?;
        if row == 0 {
            return Err(SheetError::InputDomain(format!(
                "row 0 in cell reference '{}'",
                reference
            )));
        }

        Ok((column, row))
    }
}

/// One-off parse of a reference into (column, row)
pub fn parse_cell_reference(reference: &str) -> SheetResult<(u32, u32)> {
    CellReferenceParser::new()?.parse(reference)
}
