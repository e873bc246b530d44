use std::io::Write;

use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ReportError;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Sheet names are limited to 31 characters by spreadsheet applications.
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Int(value.into())
    }
}

#[derive(Debug, Clone, Default)]
struct Row {
    cells: Vec<Cell>,
    bold: bool,
}

#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    rows: Vec<Row>,
    widths: Vec<f64>,
}

impl Worksheet {
    pub fn push_row<I, C>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        self.rows.push(Row {
            cells: cells.into_iter().map(Into::into).collect(),
            bold: false,
        });
        self
    }

    pub fn push_bold_row<I, C>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        self.rows.push(Row {
            cells: cells.into_iter().map(Into::into).collect(),
            bold: true,
        });
        self
    }

    pub fn push_blank_row(&mut self) -> &mut Self {
        self.rows.push(Row::default());
        self
    }

    /// Column widths in character units, left to right.
    pub fn set_widths(&mut self, widths: &[f64]) -> &mut Self {
        self.widths = widths.to_vec();
        self
    }

    fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.rows.len() * 128);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(&format!(r#"<worksheet xmlns="{}">"#, MAIN_NS));

        if !self.widths.is_empty() {
            xml.push_str("<cols>");
            for (i, width) in self.widths.iter().enumerate() {
                xml.push_str(&format!(
                    r#"<col min="{n}" max="{n}" width="{w}" customWidth="1"/>"#,
                    n = i + 1,
                    w = width
                ));
            }
            xml.push_str("</cols>");
        }

        xml.push_str("<sheetData>");
        for (r, row) in self.rows.iter().enumerate() {
            let row_number = r + 1;
            xml.push_str(&format!(r#"<row r="{}">"#, row_number));
            let style = if row.bold { r#" s="1""# } else { "" };
            for (c, cell) in row.cells.iter().enumerate() {
                let reference = format!("{}{}", column_name(c), row_number);
                match cell {
                    Cell::Text(text) => xml.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"{}><is><t xml:space="preserve">{}</t></is></c>"#,
                        reference,
                        style,
                        escape(text.as_str())
                    )),
                    Cell::Int(n) => {
                        xml.push_str(&format!(r#"<c r="{}"{}><v>{}</v></c>"#, reference, style, n))
                    }
                    Cell::Empty => {}
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }
}

/// An in-memory workbook written as a minimal OOXML package.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: &str) -> &mut Worksheet {
        let name: String = name
            .chars()
            .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
            .take(MAX_SHEET_NAME)
            .collect();
        let index = self.sheets.len();
        self.sheets.push(Worksheet {
            name: if name.is_empty() {
                format!("Sheet{}", index + 1)
            } else {
                name
            },
            rows: Vec::new(),
            widths: Vec::new(),
        });
        &mut self.sheets[index]
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ReportError> {
        self.write_to(Vec::new())
    }

    /// Streams the package into `sink` part by part. The sink never has to
    /// seek, so it can be a socket or a channel.
    pub fn write_to<W: Write>(&self, sink: W) -> Result<W, ReportError> {
        let mut zip = ZipWriter::new_stream(sink);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut put = |path: &str, content: &str| -> Result<(), ReportError> {
            zip.start_file(path, options)
                .map_err(|e| ReportError::Workbook(e.to_string()))?;
            zip.write_all(content.as_bytes())?;
            Ok(())
        };

        put("[Content_Types].xml", &self.content_types())?;
        put("_rels/.rels", ROOT_RELS)?;
        put("xl/workbook.xml", &self.workbook_xml())?;
        put("xl/_rels/workbook.xml.rels", &self.workbook_rels())?;
        put("xl/styles.xml", STYLES)?;
        for (i, sheet) in self.sheets.iter().enumerate() {
            put(&format!("xl/worksheets/sheet{}.xml", i + 1), &sheet.to_xml())?;
        }

        let mut stream = zip
            .finish()
            .map_err(|e| ReportError::Workbook(e.to_string()))?;
        stream.flush()?;
        Ok(stream.into_inner())
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{}" xmlns:r="{}"><sheets>"#,
            MAIN_NS, REL_NS
        );
        for (i, sheet) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(sheet.name.as_str()),
                i + 1,
                i + 1
            ));
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn workbook_rels(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{i}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            ));
        }
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{}/styles" Target="styles.xml"/>"#,
            self.sheets.len() + 1,
            REL_NS
        ));
        xml.push_str("</Relationships>");
        xml
    }
}

/// Converts a zero-based column index to its letter name (`0` → `A`,
/// `26` → `AA`).
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

// Style 0 is the default, style 1 is bold.
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;
