use crate::error::ReportError;
use crate::xlsx::{Cell, Workbook};

pub const TEMPLATE_FILENAME: &str = "students-import-template.xlsx";

const COLUMNS: [(&str, f64); 7] = [
    ("studentId", 14.0),
    ("name", 26.0),
    ("gender", 12.0),
    ("email", 32.0),
    ("phoneNumber", 18.0),
    ("jobName", 24.0),
    ("description", 42.0),
];

const NOTES: [&str; 9] = [
    "Required fields:",
    "studentId (positive integer, unique)",
    "name",
    "Optional fields:",
    "gender (Male/Female, default Male)",
    "email (must be unique if provided)",
    "phoneNumber",
    "jobName (must match existing Job name; otherwise unemployed)",
    "description",
];

/// Builds the workbook clients fill in for a bulk import: a data sheet with
/// the expected header and two sample rows, plus a notes sheet.
pub fn import_template() -> Result<Vec<u8>, ReportError> {
    let mut book = Workbook::new();

    let sheet = book.add_sheet("Students Import");
    let widths: Vec<f64> = COLUMNS.iter().map(|(_, w)| *w).collect();
    sheet.set_widths(&widths);
    sheet.push_bold_row(COLUMNS.iter().map(|(name, _)| *name));
    sheet.push_row([
        Cell::Int(1001),
        "Ahmed Ali".into(),
        "Male".into(),
        "ahmed.ali@example.com".into(),
        "+252611234567".into(),
        "Software Engineer".into(),
        "Batch import sample row 1".into(),
    ]);
    sheet.push_row([
        Cell::Int(1002),
        "Amina Hassan".into(),
        "Female".into(),
        "amina.hassan@example.com".into(),
        "+252611112233".into(),
        Cell::Empty,
        "Leave jobName empty for unemployed".into(),
    ]);

    let notes = book.add_sheet("Notes");
    notes.set_widths(&[110.0]);
    for (i, line) in NOTES.iter().enumerate() {
        if i == 0 || i == 3 {
            notes.push_bold_row([*line]);
        } else {
            notes.push_row([*line]);
        }
    }
    notes.push_blank_row();
    notes.push_row([
        "Class/Batch are selected in the import dialog and applied to every row in this file.",
    ]);

    book.to_bytes()
}
