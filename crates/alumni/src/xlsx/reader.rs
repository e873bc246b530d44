use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::ImportError;

/// Decompressed size limit for any single package part.
pub const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

/// Columns run from `A` to `XFD`.
pub const MAX_COLUMNS: usize = 16_384;

/// One non-empty row of the first worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    /// 1-based row number as shown by spreadsheet applications.
    pub number: u32,
    /// Cell values by column index. Missing cells are empty strings.
    pub cells: Vec<String>,
}

impl SheetRow {
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// Reads the rows of the first worksheet of an xlsx workbook.
///
/// Shared strings, inline strings and booleans are resolved to text.
/// Integral numbers lose any trailing `.0`.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<SheetRow>, ImportError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let path = first_sheet_path(&mut archive)?;
    let xml = read_part(&mut archive, &path)?.ok_or(ImportError::NoWorksheet)?;
    parse_sheet(&xml, &shared)
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, ImportError> {
    read_part_limited(archive, name, MAX_PART_BYTES)
}

fn read_part_limited<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    limit: u64,
) -> Result<Option<String>, ImportError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.take(limit + 1).read_to_string(&mut content)?;
    if content.len() as u64 > limit {
        return Err(ImportError::PartTooLarge(name.to_string()));
    }
    Ok(Some(content))
}

/// Follows workbook.xml → workbook.xml.rels to the first sheet part,
/// falling back to the conventional path and then any worksheet part.
fn first_sheet_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String, ImportError> {
    if let (Some(workbook), Some(rels)) = (
        read_part(archive, "xl/workbook.xml")?,
        read_part(archive, "xl/_rels/workbook.xml.rels")?,
    ) {
        if let Some(rel_id) = first_sheet_rel_id(&workbook)? {
            if let Some(target) = relationship_targets(&rels)?.remove(&rel_id) {
                let path = match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{}", target),
                };
                if archive.index_for_name(&path).is_some() {
                    return Ok(path);
                }
            }
        }
    }

    if archive.index_for_name("xl/worksheets/sheet1.xml").is_some() {
        return Ok("xl/worksheets/sheet1.xml".to_string());
    }

    let mut sheets: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/") && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    sheets.sort();
    sheets.into_iter().next().ok_or(ImportError::NoWorksheet)
}

fn first_sheet_rel_id(workbook: &str) -> Result<Option<String>, ImportError> {
    let mut reader = Reader::from_str(workbook);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                return attribute(e, b"id");
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn relationship_targets(rels: &str) -> Result<HashMap<String, String>, ImportError> {
    let mut reader = Reader::from_str(rels);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(e, b"Id")?, attribute(e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => return Ok(targets),
            _ => {}
        }
    }
}

/// Looks up an attribute by local name, ignoring any namespace prefix.
fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, ImportError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ImportError::Xml(err.to_string()))?;
        if attr.key.local_name().as_ref() == name {
            return decode_text(&attr.value).map(Some);
        }
    }
    Ok(None)
}

fn decode_text(raw: &[u8]) -> Result<String, ImportError> {
    let text = std::str::from_utf8(raw).map_err(|e| ImportError::Xml(e.to_string()))?;
    let unescaped = unescape(text).map_err(|e| ImportError::Xml(e.to_string()))?;
    Ok(unescaped.into_owned())
}

/// Resolves an entity or character reference name (`amp`, `#38`).
fn decode_reference(name: &[u8]) -> Result<String, ImportError> {
    let mut raw = Vec::with_capacity(name.len() + 2);
    raw.push(b'&');
    raw.extend_from_slice(name);
    raw.push(b';');
    decode_text(&raw)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ImportError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic runs repeat the text in another script.
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(ref t) if in_text => current.push_str(&decode_text(t)?),
            Event::CData(ref t) if in_text => current.push_str(&String::from_utf8_lossy(t)),
            Event::GeneralRef(ref r) if in_text => current.push_str(&decode_reference(r)?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Debug, Default)]
struct PendingCell {
    column: Option<usize>,
    kind: Option<String>,
    value: String,
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<SheetRow>, ImportError> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut current: Option<SheetRow> = None;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut next_row_number = 1u32;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    let number = attribute(e, b"r")?
                        .and_then(|r| r.parse().ok())
                        .unwrap_or(next_row_number);
                    next_row_number = number.saturating_add(1);
                    current = Some(SheetRow {
                        number,
                        cells: Vec::new(),
                    });
                }
                b"c" => {
                    let column = match attribute(e, b"r")? {
                        Some(reference) => Some(column_index(&reference).ok_or_else(|| {
                            ImportError::Xml(format!("Invalid cell reference {}", reference))
                        })?),
                        None => None,
                    };
                    cell = Some(PendingCell {
                        column,
                        kind: attribute(e, b"t")?,
                        value: String::new(),
                    });
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                next_row_number = attribute(e, b"r")?
                    .and_then(|r| r.parse::<u32>().ok())
                    .unwrap_or(next_row_number)
                    .saturating_add(1);
            }
            Event::Text(ref t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&decode_text(t)?);
                }
            }
            Event::GeneralRef(ref r) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&decode_reference(r)?);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(pending), Some(row)) = (cell.take(), current.as_mut()) {
                        let column = pending.column.unwrap_or(row.cells.len());
                        if column >= MAX_COLUMNS {
                            return Err(ImportError::Xml(format!(
                                "Row {} has more than {} columns",
                                row.number, MAX_COLUMNS
                            )));
                        }
                        let value = resolve_cell(pending, shared);
                        if row.cells.len() <= column {
                            row.cells.resize(column + 1, String::new());
                        }
                        row.cells[column] = value;
                    }
                }
                b"row" => {
                    if let Some(row) = current.take() {
                        if !row.is_blank() {
                            rows.push(row);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn resolve_cell(cell: PendingCell, shared: &[String]) -> String {
    match cell.kind.as_deref() {
        Some("s") => cell
            .value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i).cloned())
            .unwrap_or_default(),
        Some("b") => match cell.value.trim() {
            "1" => "TRUE".to_string(),
            _ => "FALSE".to_string(),
        },
        Some("inlineStr") | Some("str") | Some("e") => cell.value,
        _ => normalize_number(&cell.value),
    }
}

/// `"42.0"` and `"4.2E1"` both become `"42"`; other values pass through.
fn normalize_number(raw: &str) -> String {
    const MAX_EXACT: f64 = 9_007_199_254_740_991.0;
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT => {
            format!("{}", n as i64)
        }
        _ => raw.to_string(),
    }
}

/// Extracts the zero-based column index from a cell reference like `AB12`.
/// `None` when the reference has no column letters or lies past `XFD`.
pub fn column_index(reference: &str) -> Option<usize> {
    let mut letters = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .peekable();
    letters.peek()?;
    let mut index = 0usize;
    for b in letters {
        let digit = (b.to_ascii_uppercase() - b'A' + 1) as usize;
        index = index.checked_mul(26)?.checked_add(digit)?;
        if index > MAX_COLUMNS {
            return None;
        }
    }
    Some(index - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::writer::{column_name, Cell, Workbook};
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    #[test]
    fn column_index_matches_column_name() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("z9"), Some(25));
        assert_eq!(column_index("AA3"), Some(26));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("XFD1"), Some(MAX_COLUMNS - 1));
        assert_eq!(column_index("XFE1"), None);
        assert_eq!(column_index(&format!("{}1", "Z".repeat(40))), None);
        for i in [0, 7, 25, 26, 51, 700, 702] {
            assert_eq!(column_index(&format!("{}1", column_name(i))), Some(i));
        }
    }

    #[test]
    fn normalize_integral_numbers() {
        assert_eq!(normalize_number("42"), "42");
        assert_eq!(normalize_number("42.0"), "42");
        assert_eq!(normalize_number("4.2E1"), "42");
        assert_eq!(normalize_number("42.5"), "42.5");
        assert_eq!(normalize_number("abc"), "abc");
    }

    #[test]
    fn reads_back_written_workbook() {
        let mut book = Workbook::new();
        book.add_sheet("Students")
            .push_bold_row(["studentId", "name"])
            .push_row([Cell::Int(7), Cell::from("Ada & Co")])
            .push_blank_row()
            .push_row([Cell::Int(8), Cell::from("Grace")]);
        let rows = read_first_sheet(&book.to_bytes().unwrap()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cells, vec!["studentId", "name"]);
        assert_eq!(rows[1].number, 2);
        assert_eq!(rows[1].cells, vec!["7", "Ada & Co"]);
        assert_eq!(rows[2].number, 4);
    }

    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn resolves_shared_strings_and_sparse_cells() {
        let bytes = package(&[
            (
                "xl/workbook.xml",
                r#"<workbook xmlns:r="rel"><sheets><sheet name="Data" sheetId="1" r:id="rId5"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships><Relationship Id="rId5" Target="worksheets/data.xml"/></Relationships>"#,
            ),
            (
                "xl/sharedStrings.xml",
                r#"<sst><si><t>name</t></si><si><r><t>Ada </t></r><r><t>Lovelace</t></r></si></sst>"#,
            ),
            (
                "xl/worksheets/data.xml",
                r#"<worksheet><sheetData>
                    <row r="1"><c r="A1" t="s"><v>0</v></c></row>
                    <row r="3"><c r="C3" t="s"><v>1</v></c><c r="D3"><v>1.0</v></c></row>
                </sheetData></worksheet>"#,
            ),
        ]);

        let rows = read_first_sheet(&bytes).unwrap();
        assert_eq!(rows[0].cells, vec!["name"]);
        assert_eq!(rows[1].number, 3);
        assert_eq!(rows[1].cells, vec!["", "", "Ada Lovelace", "1"]);
    }

    #[test]
    fn falls_back_to_any_worksheet() {
        let bytes = package(&[(
            "xl/worksheets/sheet9.xml",
            r#"<worksheet><sheetData><row><c t="inlineStr"><is><t>x</t></is></c></row></sheetData></worksheet>"#,
        )]);
        let rows = read_first_sheet(&bytes).unwrap();
        assert_eq!(rows, vec![SheetRow { number: 1, cells: vec!["x".to_string()] }]);
    }

    fn single_sheet(body: &str) -> Vec<u8> {
        let xml = format!("<worksheet><sheetData>{}</sheetData></worksheet>", body);
        package(&[("xl/worksheets/sheet1.xml", xml.as_str())])
    }

    #[test]
    fn rejects_columns_past_xfd() {
        let long_reference = format!(r#"<row><c r="{}1"><v>1</v></c></row>"#, "Z".repeat(64));
        for body in [
            r#"<row><c r="XFE1"><v>1</v></c></row>"#.to_string(),
            long_reference,
        ] {
            assert!(matches!(
                read_first_sheet(&single_sheet(&body)),
                Err(ImportError::Xml(_))
            ));
        }

        let unreferenced = format!("<row>{}</row>", "<c><v>1</v></c>".repeat(MAX_COLUMNS + 1));
        assert!(matches!(
            read_first_sheet(&single_sheet(&unreferenced)),
            Err(ImportError::Xml(_))
        ));
    }

    #[test]
    fn last_row_number_does_not_wrap() {
        let body = format!(
            r#"<row r="{max}"><c r="A{max}"><v>1</v></c></row><row/><row><c><v>2</v></c></row>"#,
            max = u32::MAX
        );
        let rows = read_first_sheet(&single_sheet(&body)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, u32::MAX);
        assert_eq!(rows[1].number, u32::MAX);
    }

    #[test]
    fn rejects_parts_past_decompressed_limit() {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        zip.write_all(&vec![b' '; 64 * 1024]).unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(bytes.len() < 1024);

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let err = read_part_limited(&mut archive, "xl/worksheets/sheet1.xml", 4096).unwrap_err();
        assert!(matches!(err, ImportError::PartTooLarge(ref name) if name == "xl/worksheets/sheet1.xml"));

        let whole = read_part_limited(&mut archive, "xl/worksheets/sheet1.xml", 64 * 1024).unwrap();
        assert_eq!(whole.map(|s| s.len()), Some(64 * 1024));
    }

    #[test]
    fn rejects_non_zip_input() {
        assert!(matches!(
            read_first_sheet(b"not a workbook"),
            Err(ImportError::Archive(_))
        ));
    }
}
