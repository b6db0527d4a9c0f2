//! XLSX first-sheet reader.

use mailmerge_core::{CellValue, DataRow, Error, Result, Table};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

/// Column count of a worksheet (`A` through `XFD`).
const MAX_COLUMNS: usize = 16_384;
/// Row count of a worksheet.
const MAX_ROWS: usize = 1_048_576;

/// Read the first worksheet of the workbook at `path` into a [`Table`].
pub fn read_table(path: &Path) -> Result<Table> {
    XlsxReader::new().read_file(path)
}

/// Reader for XLSX (Office Open XML) workbooks.
pub struct XlsxReader;

impl XlsxReader {
    /// Create a new XLSX reader.
    pub fn new() -> Self {
        Self
    }

    /// Read a workbook file. Every failure is reported as a source read error
    /// naming `path`.
    pub fn read_file(&self, path: &Path) -> Result<Table> {
        let file = File::open(path).map_err(|e| Error::source_read(path, e))?;
        let table = self
            .read(BufReader::new(file))
            .map_err(|e| Error::source_read(path, e))?;
        log::info!(
            "Read {} column(s) and {} row(s) from {}",
            table.width(),
            table.rows.len(),
            path.display()
        );
        Ok(table)
    }

    /// Read a workbook from any seekable reader.
    pub fn read<R: Read + Seek>(&self, reader: R) -> Result<Table> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let sheet_path = self.first_sheet_path(&mut archive)?;
        log::debug!("Reading worksheet {}", sheet_path);

        let has_shared_strings = archive.file_names().any(|n| n == SHARED_STRINGS_PATH);
        let shared = if has_shared_strings {
            parse_shared_strings(&self.read_file_from_archive(&mut archive, SHARED_STRINGS_PATH)?)?
        } else {
            Vec::new()
        };

        let xml = self.read_file_from_archive(&mut archive, &sheet_path)?;
        build_table(parse_sheet(&xml, &shared)?)
    }

    /// Path of the first worksheet in workbook order.
    fn first_sheet_path<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<String> {
        let workbook = self.read_file_from_archive(archive, WORKBOOK_PATH)?;
        let rid = first_sheet_rid(&workbook)?
            .ok_or_else(|| Error::XlsxParseError("Workbook has no worksheets".to_string()))?;

        let rels = self.read_file_from_archive(archive, WORKBOOK_RELS_PATH)?;
        let target = relationship_target(&rels, &rid)?.ok_or_else(|| {
            Error::XlsxParseError(format!("Worksheet relationship '{}' not found", rid))
        })?;

        Ok(match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{}", target),
        })
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content.trim_start_matches('\u{feff}').to_string())
    }
}

impl Default for XlsxReader {
    fn default() -> Self {
        Self::new()
    }
}

/// A physical `<row>` of the worksheet: its 1-based number and the cells it
/// carries as (0-based column, value).
#[derive(Debug, Default)]
struct SheetRow {
    number: usize,
    cells: Vec<(usize, CellValue)>,
}

/// Where text events inside a cell currently go.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TextTarget {
    None,
    Value,
    Inline,
}

/// A `<c>` being read.
#[derive(Debug, Default)]
struct PendingCell {
    column: usize,
    kind: String,
    raw: String,
    inline: String,
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<SheetRow>> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<SheetRow> = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut target = TextTarget::None;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"row" => rows.push(start_row(e, rows.last())?),
                b"c" => cell = Some(start_cell(e, rows.last_mut())?),
                b"v" if cell.is_some() => target = TextTarget::Value,
                b"rPh" => phonetic_depth += 1,
                b"t" if cell.is_some() && phonetic_depth == 0 => target = TextTarget::Inline,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"row" => rows.push(start_row(e, rows.last())?),
                // A cell without content is empty; it only advances the column.
                b"c" => {
                    let pending = start_cell(e, rows.last_mut())?;
                    if let Some(row) = rows.last_mut() {
                        row.cells.push((pending.column, CellValue::Empty));
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if target != TextTarget::None => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::XmlError(format!("Error reading cell text: {}", e)))?;
                push_text(&mut cell, target, &text);
            }
            Ok(Event::CData(e)) if target != TextTarget::None => {
                push_text(&mut cell, target, &String::from_utf8_lossy(&e));
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"v" | b"t" => target = TextTarget::None,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"c" => {
                    if let Some(pending) = cell.take() {
                        let value = cell_value(&pending, shared)?;
                        if let Some(row) = rows.last_mut() {
                            row.cells.push((pending.column, value));
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing worksheet: {}", e)));
            }
            _ => {}
        }
    }

    Ok(rows)
}

fn push_text(cell: &mut Option<PendingCell>, target: TextTarget, text: &str) {
    if let Some(cell) = cell.as_mut() {
        match target {
            TextTarget::Value => cell.raw.push_str(text),
            TextTarget::Inline => cell.inline.push_str(text),
            TextTarget::None => {}
        }
    }
}

fn start_row(e: &BytesStart, previous: Option<&SheetRow>) -> Result<SheetRow> {
    let number = match attribute(e, b"r") {
        Some(r) => r
            .trim()
            .parse()
            .map_err(|_| Error::XlsxParseError(format!("Invalid row number '{}'", r)))?,
        None => previous.map(|p| p.number + 1).unwrap_or(1),
    };
    if number == 0 || number > MAX_ROWS {
        return Err(Error::XlsxParseError(format!("Invalid row number {}", number)));
    }
    Ok(SheetRow {
        number,
        cells: Vec::new(),
    })
}

fn start_cell(e: &BytesStart, row: Option<&mut SheetRow>) -> Result<PendingCell> {
    let row = row.ok_or_else(|| Error::XlsxParseError("Cell outside of a row".to_string()))?;
    let column = match attribute(e, b"r") {
        Some(r) => parse_cell_ref(&r)
            .map(|(column, _)| column)
            .ok_or_else(|| Error::XlsxParseError(format!("Invalid cell reference '{}'", r)))?,
        None => row.cells.last().map(|(c, _)| c + 1).unwrap_or(0),
    };
    if column >= MAX_COLUMNS {
        return Err(Error::XlsxParseError(format!(
            "Cell past the last column {} in row {}",
            column_name(MAX_COLUMNS - 1),
            row.number
        )));
    }
    Ok(PendingCell {
        column,
        kind: attribute(e, b"t").unwrap_or_default(),
        ..PendingCell::default()
    })
}

fn cell_value(cell: &PendingCell, shared: &[String]) -> Result<CellValue> {
    let raw = cell.raw.trim();
    let value = match cell.kind.as_str() {
        "inlineStr" => CellValue::Text(cell.inline.clone()),
        _ if cell.raw.is_empty() => CellValue::Empty,
        "s" => {
            let index: usize = raw.parse().map_err(|_| {
                Error::XlsxParseError(format!("Invalid shared string index '{}'", raw))
            })?;
            let text = shared.get(index).ok_or_else(|| {
                Error::XlsxParseError(format!("Shared string {} out of range", index))
            })?;
            CellValue::Text(text.clone())
        }
        "str" | "d" => CellValue::Text(cell.raw.clone()),
        "b" => CellValue::Bool(raw == "1" || raw.eq_ignore_ascii_case("true")),
        "e" => CellValue::Error(raw.to_string()),
        _ => CellValue::Number(
            raw.parse()
                .map_err(|_| Error::XlsxParseError(format!("Invalid number '{}'", raw)))?,
        ),
    };
    Ok(value)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" if phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if local_name(e.name().as_ref()) == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::XmlError(format!("Error reading shared string: {}", e)))?;
                if let Some(s) = current.as_mut() {
                    s.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"t" => in_text = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"si" => strings.extend(current.take()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing shared strings: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(strings)
}

/// Turn the physical rows into a table: first row is the header row.
fn build_table(sheet_rows: Vec<SheetRow>) -> Result<Table> {
    let mut sheet_rows = sheet_rows.into_iter();
    let header_row = sheet_rows
        .next()
        .ok_or_else(|| Error::XlsxParseError("Worksheet is empty".to_string()))?;

    let mut headers: Vec<String> = Vec::new();
    for (column, value) in header_row.cells {
        let text = value.to_text().map_err(|reason| {
            Error::XlsxParseError(format!("Header {}: {}", column_name(column), reason))
        })?;
        if headers.len() <= column {
            headers.resize(column + 1, String::new());
        }
        headers[column] = text;
    }
    while headers.last().is_some_and(|h| h.is_empty()) {
        headers.pop();
    }
    if headers.is_empty() {
        return Err(Error::XlsxParseError("Header row is empty".to_string()));
    }
    if let Some(column) = headers.iter().position(String::is_empty) {
        return Err(Error::XlsxParseError(format!(
            "Header {} is empty",
            column_name(column)
        )));
    }

    let width = headers.len();
    let mut rows: Vec<DataRow> = Vec::new();
    let mut next_number = header_row.number + 1;
    for sheet_row in sheet_rows {
        while next_number < sheet_row.number {
            rows.push(DataRow::new(next_number, vec![CellValue::Empty; width]));
            next_number += 1;
        }

        let mut values = vec![CellValue::Empty; width];
        for (column, value) in sheet_row.cells {
            if column >= width {
                if value == CellValue::Empty {
                    continue;
                }
                values.resize(column + 1, CellValue::Empty);
            }
            values[column] = value;
        }
        rows.push(DataRow::new(sheet_row.number, values));
        next_number = sheet_row.number + 1;
    }
    while rows.last().is_some_and(DataRow::is_blank) {
        rows.pop();
    }

    Ok(Table { headers, rows })
}

/// Relationship id of the first `<sheet>` in `xl/workbook.xml`.
fn first_sheet_rid(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sheet" =>
            {
                for attr in e.attributes().flatten() {
                    let key = attr.key.as_ref();
                    if key != b"id" && local_name(key) == b"id" {
                        return Ok(Some(String::from_utf8_lossy(&attr.value).to_string()));
                    }
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing workbook: {}", e)));
            }
            _ => {}
        }
    }
}

fn relationship_target(xml: &str, rid: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                if attribute(e, b"Id").as_deref() == Some(rid) {
                    return Ok(attribute(e, b"Target"));
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }
}

fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Split a cell reference like "B3" into (0-based column, 1-based row).
fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut column = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        column = column.checked_mul(26)?.checked_add(digit)?;
        if column > MAX_COLUMNS {
            return None;
        }
    }
    Some((column - 1, digits.parse().ok()?))
}

/// Column letters for a 0-based index, for messages.
fn column_name(column: usize) -> String {
    let mut n = column + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).to_string()
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailmerge_core::resolve;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const SHEET_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#;
    const SHEET_TAIL: &str = "</sheetData></worksheet>";

    /// Build a workbook whose first sheet (in workbook order) is `first`.
    /// A decoy sheet is listed in the relationships before it.
    fn build_workbook(first: &str, shared: &[&str]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        zip.start_file(WORKBOOK_PATH, options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Guests" sheetId="2" r:id="rId2"/><sheet name="Other" sheetId="1" r:id="rId1"/></sheets></workbook>"#)
            .unwrap();

        zip.start_file(WORKBOOK_RELS_PATH, options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/></Relationships>"#)
            .unwrap();

        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        zip.write_all(
            format!(
                r#"{}<row r="1"><c r="A1" t="inlineStr"><is><t>decoy</t></is></c></row>{}"#,
                SHEET_HEAD, SHEET_TAIL
            )
            .as_bytes(),
        )
        .unwrap();

        zip.start_file("xl/worksheets/sheet2.xml", options).unwrap();
        zip.write_all(format!("{}{}{}", SHEET_HEAD, first, SHEET_TAIL).as_bytes())
            .unwrap();

        if !shared.is_empty() {
            let items: String = shared
                .iter()
                .map(|s| format!("<si><t xml:space=\"preserve\">{}</t></si>", s))
                .collect();
            zip.start_file(SHARED_STRINGS_PATH, options).unwrap();
            zip.write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">{1}</sst>"#,
                    shared.len(),
                    items
                )
                .as_bytes(),
            )
            .unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    fn read(bytes: Vec<u8>) -> Result<Table> {
        XlsxReader::new().read(Cursor::new(bytes))
    }

    #[test]
    fn test_reads_first_sheet_in_workbook_order() {
        let sheet = concat!(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>"#,
            r#"<row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>42</v></c></row>"#,
            r#"<row r="3"><c r="A3" t="s"><v>3</v></c><c r="B3"><v>7.5</v></c></row>"#,
        );
        let table = read(build_workbook(sheet, &["name", "amount", "Alice", "Bob &amp; Co"])).unwrap();

        assert_eq!(table.headers, vec!["name", "amount"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].number, 2);
        assert_eq!(
            table.rows[0].values,
            vec![CellValue::Text("Alice".into()), CellValue::Number(42.0)]
        );
        assert_eq!(
            table.rows[1].values,
            vec![CellValue::Text("Bob & Co".into()), CellValue::Number(7.5)]
        );

        let map = resolve(&table.headers, &table.rows[0]).unwrap();
        assert_eq!(map.get("amount"), Some("42"));
    }

    #[test]
    fn test_cell_types_and_omitted_cells() {
        let sheet = concat!(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>a</t></is></c><c r="B1" t="inlineStr"><is><t>b</t></is></c><c r="C1" t="inlineStr"><is><t>c</t></is></c><c r="D1" t="inlineStr"><is><t>d</t></is></c></row>"#,
            r#"<row r="2"><c r="A2" t="b"><v>1</v></c><c r="C2" t="e"><v>#N/A</v></c><c r="D2" t="str"><f>A1&amp;"x"</f><v> ax </v></c></row>"#,
        );
        let table = read(build_workbook(sheet, &[])).unwrap();

        assert_eq!(
            table.rows[0].values,
            vec![
                CellValue::Bool(true),
                CellValue::Empty,
                CellValue::Error("#N/A".into()),
                CellValue::Text(" ax ".into()),
            ]
        );
    }

    #[test]
    fn test_missing_rows_are_materialized() {
        let sheet = concat!(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c></row>"#,
            r#"<row r="2"><c r="A2" t="inlineStr"><is><t>Ann</t></is></c></row>"#,
            r#"<row r="4"><c r="A4" t="inlineStr"><is><t>Cy</t></is></c></row>"#,
        );
        let table = read(build_workbook(sheet, &[])).unwrap();

        let numbers: Vec<usize> = table.rows.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![2, 3, 4]);
        assert!(table.rows[1].is_blank());
        assert_eq!(table.rows[1].values.len(), 1);
    }

    #[test]
    fn test_trailing_blank_rows_dropped() {
        let sheet = concat!(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c></row>"#,
            r#"<row r="2"><c r="A2" t="inlineStr"><is><t>Ann</t></is></c></row>"#,
            r#"<row r="3"><c r="A3" s="1"/></row>"#,
        );
        let table = read(build_workbook(sheet, &[])).unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_trailing_empty_headers_dropped() {
        let sheet = concat!(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c><c r="B1" t="inlineStr"><is><t></t></is></c><c r="C1" s="2"/></row>"#,
            r#"<row r="2"><c r="A2" t="inlineStr"><is><t>Ann</t></is></c></row>"#,
        );
        let table = read(build_workbook(sheet, &[])).unwrap();
        assert_eq!(table.headers, vec!["name"]);
        assert_eq!(table.rows[0].values.len(), 1);
    }

    #[test]
    fn test_interior_empty_header_is_an_error() {
        let sheet = r#"<row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c><c r="C1" t="inlineStr"><is><t>city</t></is></c></row>"#;
        let err = read(build_workbook(sheet, &[])).unwrap_err();
        match err {
            Error::XlsxParseError(msg) => assert!(msg.contains("Header B")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_value_beyond_headers_makes_row_too_long() {
        let sheet = concat!(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c></row>"#,
            r#"<row r="2"><c r="A2" t="inlineStr"><is><t>Ann</t></is></c><c r="C2"><v>1</v></c></row>"#,
        );
        let table = read(build_workbook(sheet, &[])).unwrap();
        assert_eq!(table.rows[0].values.len(), 3);

        let err = resolve(&table.headers, &table.rows[0]).unwrap_err();
        assert!(matches!(
            err,
            Error::RowShapeMismatch {
                row: 2,
                expected: 1,
                found: 3
            }
        ));
    }

    #[test]
    fn test_rich_text_shared_string_skips_phonetic() {
        let xml = r#"<sst><si><r><t>Hello </t></r><r><rPr><b/></rPr><t>World</t></r><rPh sb="0" eb="1"><t>x</t></rPh></si><si/></sst>"#;
        assert_eq!(
            parse_shared_strings(xml).unwrap(),
            vec!["Hello World".to_string(), String::new()]
        );
    }

    #[test]
    fn test_read_file_errors_are_source_read() {
        let err = read_table(Path::new("/nonexistent/data.xlsx")).unwrap_err();
        assert!(matches!(err, Error::SourceRead { .. }));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        let err = read_table(&path).unwrap_err();
        assert_eq!(err.class(), mailmerge_core::ErrorClass::SourceRead);
    }

    #[test]
    fn test_read_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xlsx");
        let sheet = concat!(
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#,
            r#"<row r="2"><c r="A2" t="s"><v>1</v></c></row>"#,
        );
        std::fs::write(&path, build_workbook(sheet, &["name", "Ann"])).unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.headers, vec!["name"]);
        assert_eq!(table.rows[0].values, vec![CellValue::Text("Ann".into())]);
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 1)));
        assert_eq!(parse_cell_ref("B3"), Some((1, 3)));
        assert_eq!(parse_cell_ref("AA10"), Some((26, 10)));
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("A"), None);
        assert_eq!(parse_cell_ref("XFD1"), Some((16_383, 1)));
        assert_eq!(parse_cell_ref("XFE1"), None);
        assert_eq!(parse_cell_ref("ZZZZZZ1"), None);
        assert_eq!(parse_cell_ref("ZZZZZZZZZZZZZZZ1"), None);
    }

    #[test]
    fn test_cell_past_last_column_is_an_error() {
        let sheet = concat!(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c></row>"#,
            r#"<row r="2"><c r="ZZZZZZ2"><v>1</v></c></row>"#,
        );
        match read(build_workbook(sheet, &[])).unwrap_err() {
            Error::XlsxParseError(msg) => assert!(msg.contains("Invalid cell reference 'ZZZZZZ2'")),
            other => panic!("unexpected error: {:?}", other),
        }

        let overflow = r#"<row r="1"><c r="ZZZZZZZZZZZZZZZ1" t="inlineStr"><is><t>x</t></is></c></row>"#;
        assert!(matches!(
            read(build_workbook(overflow, &[])).unwrap_err(),
            Error::XlsxParseError(_)
        ));
    }

    #[test]
    fn test_row_past_last_row_is_an_error() {
        let sheet = concat!(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>name</t></is></c></row>"#,
            r#"<row r="99999999"><c r="A99999999"><v>1</v></c></row>"#,
        );
        assert!(matches!(
            read(build_workbook(sheet, &[])).unwrap_err(),
            Error::XlsxParseError(_)
        ));
    }

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
    }
}
