//! Cell styles read from the package parts
//!
//! calamine turns date-styled numbers into dates but exposes neither a cell's
//! style index nor the style → number format table, so both are read from
//! `xl/styles.xml` and the worksheet parts.

use crate::error::SheetResult;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

/// First number format id available to custom `numFmt` declarations
pub const FIRST_CUSTOM_FORMAT_ID: u32 = 164;

/// Style information of one .xlsx package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageStyles {
    /// `cellXfs` position → numFmtId
    pub cell_formats: Vec<u32>,
    /// numFmtId → formatCode from `numFmts`
    pub format_codes: BTreeMap<u32, String>,
    /// Sheet name → A1 reference → style index, styled cells only
    pub cell_styles: HashMap<String, HashMap<String, u32>>,
}

impl PackageStyles {
    pub fn read<RS: Read + Seek>(reader: RS) -> SheetResult<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut styles = Self::default();

        if let Some(part) = open_part(&mut archive, "xl/styles.xml")? {
            styles.read_style_sheet(part)?;
        }

        for (name, path) in sheet_parts(&mut archive)? {
            if let Some(part) = open_part(&mut archive, &path)? {
                styles.cell_styles.insert(name, read_cell_styles(part)?);
            }
        }

        Ok(styles)
    }

    fn read_style_sheet(&mut self, part: impl Read) -> SheetResult<()> {
        let mut reader = Reader::from_reader(BufReader::new(part));
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        // cellStyleXfs also holds `xf` elements; only cellXfs maps style indexes
        let mut in_cell_xfs = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
                Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"numFmt" => {
                        let id = attribute(&e, b"numFmtId")?.and_then(|v| v.parse().ok());
                        if let (Some(id), Some(code)) = (id, attribute(&e, b"formatCode")?) {
                            self.format_codes.insert(id, code);
                        }
                    }
                    b"xf" if in_cell_xfs => {
                        let id = attribute(&e, b"numFmtId")?
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                        self.cell_formats.push(id);
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

fn open_part<'a, R: Read + Seek>(
    archive: &'a mut ZipArchive<R>,
    name: &str,
) -> SheetResult<Option<impl Read + 'a>> {
    match archive.by_name(name) {
        Ok(part) => Ok(Some(part)),
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Visit every start and empty element of an XML part
fn for_each_element(
    part: impl Read,
    mut visit: impl FnMut(&BytesStart<'_>) -> SheetResult<()>,
) -> SheetResult<()> {
    let mut reader = Reader::from_reader(BufReader::new(part));
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => visit(&e)?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Attribute value by local name, so `r:id` is found as `id`
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> SheetResult<Option<String>> {
    for attr in element.attributes().flatten() {
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// (sheet name, worksheet part path) in workbook order
fn sheet_parts<R: Read + Seek>(archive: &mut ZipArchive<R>) -> SheetResult<Vec<(String, String)>> {
    let mut sheets = Vec::new();
    if let Some(part) = open_part(archive, "xl/workbook.xml")? {
        for_each_element(part, |e| {
            if e.local_name().as_ref() == b"sheet" {
                if let (Some(name), Some(id)) = (attribute(e, b"name")?, attribute(e, b"id")?) {
                    sheets.push((name, id));
                }
            }
            Ok(())
        })?;
    }

    let mut targets = HashMap::new();
    if let Some(part) = open_part(archive, "xl/_rels/workbook.xml.rels")? {
        for_each_element(part, |e| {
            if e.local_name().as_ref() == b"Relationship" {
                if let (Some(id), Some(target)) = (attribute(e, b"Id")?, attribute(e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            Ok(())
        })?;
    }

    Ok(sheets
        .into_iter()
        .filter_map(|(name, id)| targets.get(&id).map(|target| (name, part_path(target))))
        .collect())
}

/// Relationship targets are relative to `xl/` unless absolute
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn read_cell_styles(part: impl Read) -> SheetResult<HashMap<String, u32>> {
    let mut styles = HashMap::new();
    for_each_element(part, |e| {
        if e.local_name().as_ref() == b"c" {
            let style = attribute(e, b"s")?.and_then(|s| s.parse::<u32>().ok());
            if let (Some(reference), Some(style)) = (attribute(e, b"r")?, style) {
                if style != 0 {
                    styles.insert(reference, style);
                }
            }
        }
        Ok(())
    })?;
    Ok(styles)
}
