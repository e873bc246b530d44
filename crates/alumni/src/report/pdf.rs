use std::io::Write;

use lopdf::{dictionary, Document, Object, Stream};

use super::{ReportRow, ReportSummary};
use crate::error::ReportError;

// A4 in points.
const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;
const MARGIN: f64 = 36.0;
const LINE_HEIGHT: f64 = 14.0;
const ENTRY_FONT_SIZE: f64 = 9.0;

/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
struct TextLine {
    size: f64,
    y: f64,
    text: String,
    underline: bool,
}

/// Lays out lines top to bottom, starting a new page whenever the cursor
/// would run into the bottom margin.
struct Layout {
    pages: Vec<Vec<TextLine>>,
    y: f64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ensure_room(&mut self) {
        if self.y < MARGIN + 2.0 * LINE_HEIGHT {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn text(&mut self, size: f64, text: &str, underline: bool) {
        for line in wrap(text, max_chars(size)) {
            self.ensure_room();
            self.y -= size.max(LINE_HEIGHT);
            if let Some(page) = self.pages.last_mut() {
                page.push(TextLine {
                    size,
                    y: self.y,
                    text: line,
                    underline,
                });
            }
        }
    }

    fn gap(&mut self, points: f64) {
        self.y -= points;
    }
}

fn max_chars(size: f64) -> usize {
    let printable = PAGE_WIDTH - 2.0 * MARGIN;
    ((printable / (size * AVG_GLYPH_WIDTH)).floor() as usize).max(1)
}

/// Greedy word wrap. Words longer than a line are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub(super) fn entry_line(row: &ReportRow) -> String {
    let year = row.year.map(|y| y.to_string()).unwrap_or_default();
    let job = if row.job.is_empty() { "Unemployed" } else { row.job.as_str() };
    format!(
        "{} | {} | {} | {} ({}) | {} | {}",
        row.student_id, row.name, row.gender, row.batch, year, row.class_name, job
    )
}

/// The page tree is assembled in memory because the cross-reference table
/// needs every object. Serialization then goes straight to `sink`.
pub(super) fn write<W: Write>(
    rows: &[ReportRow],
    summary: ReportSummary,
    generated: &str,
    mut sink: W,
) -> Result<(), ReportError> {
    let mut layout = Layout::new();
    layout.text(18.0, "Alumni Management System", false);
    layout.gap(4.0);
    layout.text(12.0, "Students Report", false);
    layout.gap(6.0);
    layout.text(10.0, &format!("Generated: {}", generated), false);
    layout.text(
        10.0,
        &format!(
            "Total: {} | Employed: {} | Unemployed: {}",
            summary.total, summary.employed, summary.unemployed
        ),
        false,
    );
    layout.gap(LINE_HEIGHT);
    layout.text(10.0, "Entries:", true);
    layout.gap(6.0);
    for row in rows {
        layout.text(ENTRY_FONT_SIZE, &entry_line(row), false);
    }

    let mut doc = build_document(&layout.pages);
    doc.save_to(&mut sink)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;
    sink.flush()?;
    Ok(())
}

fn build_document(pages: &[Vec<TextLine>]) -> Document {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::with_capacity(pages.len());
    for lines in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_stream(lines).into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (PAGE_WIDTH as i64).into(), (PAGE_HEIGHT as i64).into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| (*id).into()).collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Students Report"),
        "Producer" => Object::string_literal("Alumni Management System"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc
}

fn content_stream(lines: &[TextLine]) -> String {
    let mut content = String::new();
    for line in lines {
        content.push_str(&format!(
            "BT /F1 {} Tf {} {} Td ({}) Tj ET\n",
            line.size,
            MARGIN,
            line.y,
            escape_pdf_string(&line.text)
        ));
        if line.underline {
            let width = line.text.chars().count() as f64 * line.size * AVG_GLYPH_WIDTH;
            content.push_str(&format!(
                "0.5 w {x} {y} m {x2} {y} l S\n",
                x = MARGIN,
                x2 = MARGIN + width,
                y = line.y - 2.0
            ));
        }
    }
    content
}

/// Escapes a string for a PDF literal. Latin-1 characters are written as
/// octal escapes (WinAnsi); anything else becomes `?`.
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_control() => out.push(c),
            c if ('\u{a0}'..='\u{ff}').contains(&c) => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            _ => out.push('?'),
        }
    }
    out
}
