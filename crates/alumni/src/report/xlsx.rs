use std::io::Write;

use super::{ReportRow, ReportSummary, HEADERS};
use crate::error::ReportError;
use crate::xlsx::{Cell, Workbook};

const WIDTHS: [f64; 13] = [
    14.0, 24.0, 10.0, 28.0, 16.0, 18.0, 22.0, 16.0, 14.0, 8.0, 22.0, 18.0, 22.0,
];

/// Layout: generated row, totals row, blank row, bold header, data.
pub(super) fn write<W: Write>(
    rows: &[ReportRow],
    summary: ReportSummary,
    generated: &str,
    sink: W,
) -> Result<(), ReportError> {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Students");
    sheet.set_widths(&WIDTHS);

    sheet.push_bold_row([Cell::Empty, Cell::from(format!("Report generated: {}", generated))]);

    let mut totals = vec![Cell::Empty; HEADERS.len()];
    totals[1] = Cell::from(format!("Total: {}", summary.total));
    totals[11] = Cell::from(format!(
        "Employed: {} | Unemployed: {}",
        summary.employed, summary.unemployed
    ));
    sheet.push_bold_row(totals);
    sheet.push_blank_row();
    sheet.push_bold_row(HEADERS);

    for row in rows {
        let mut cells: Vec<Cell> = row.text_fields().into_iter().map(Cell::Text).collect();
        cells[0] = Cell::Int(row.student_id);
        cells[9] = row.year.map_or(Cell::Empty, Cell::from);
        sheet.push_row(cells);
    }

    book.write_to(sink)?;
    Ok(())
}
