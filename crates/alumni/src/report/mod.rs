//! Student exports.
//!
//! Every format renders the same flattened [`ReportRow`] projection of the
//! filtered students, newest first.

mod csv;
mod pdf;
mod xlsx;

use std::fmt;
use std::io::Write;

use chrono::{DateTime, Utc};

use crate::db::student_repo::{self, StudentRecord};
use crate::db::Database;
use crate::error::{ReportError, Result};
use crate::filter::{resolve, StudentQuery};
use crate::model::{format_timestamp, EmploymentStatus};

pub const HEADERS: [&str; 13] = [
    "Student ID",
    "Name",
    "Gender",
    "Email",
    "Phone",
    "Faculty",
    "Department",
    "Class",
    "Batch",
    "Year",
    "Job",
    "Employment Status",
    "Created At",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    /// Parses the `format` query value. Missing means CSV.
    pub fn parse(value: Option<&str>) -> std::result::Result<Self, ReportError> {
        let raw = value.map(str::trim).unwrap_or("");
        match raw.to_ascii_lowercase().as_str() {
            "" | "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ReportError::InvalidFormat(raw.to_string())),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => crate::xlsx::CONTENT_TYPE,
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One student flattened for export. Missing values are empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub student_id: i64,
    pub name: String,
    pub gender: String,
    pub email: String,
    pub phone_number: String,
    pub faculty: String,
    pub department: String,
    pub class_name: String,
    pub batch: String,
    pub year: Option<i32>,
    pub job: String,
    pub employment_status: &'static str,
    pub created_at: String,
}

impl ReportRow {
    pub fn from_record(record: &StudentRecord) -> Self {
        let student = &record.student;
        Self {
            student_id: student.student_id,
            name: student.name.clone(),
            gender: student.gender.to_string(),
            email: student.email.clone().unwrap_or_default(),
            phone_number: student.phone_number.clone(),
            faculty: record.faculty_name().unwrap_or_default().to_string(),
            department: record.department_name().unwrap_or_default().to_string(),
            class_name: record
                .class
                .as_ref()
                .map(|c| c.class_name.clone())
                .unwrap_or_default(),
            batch: record
                .batch
                .as_ref()
                .map(|b| b.batch_name.clone())
                .unwrap_or_default(),
            year: record.batch.as_ref().map(|b| b.year),
            job: record
                .job
                .as_ref()
                .map(|j| j.job_name.clone())
                .unwrap_or_default(),
            employment_status: EmploymentStatus::label(student.job_id.is_some()),
            created_at: student.created_at.clone(),
        }
    }

    /// The row as text cells in [`HEADERS`] order.
    pub fn text_fields(&self) -> [String; 13] {
        [
            self.student_id.to_string(),
            self.name.clone(),
            self.gender.clone(),
            self.email.clone(),
            self.phone_number.clone(),
            self.faculty.clone(),
            self.department.clone(),
            self.class_name.clone(),
            self.batch.clone(),
            self.year.map(|y| y.to_string()).unwrap_or_default(),
            self.job.clone(),
            self.employment_status.to_string(),
            self.created_at.clone(),
        ]
    }

    fn is_employed(&self) -> bool {
        self.employment_status == EmploymentStatus::label(true)
    }
}

/// Head counts shown above the rows in xlsx and PDF exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub employed: usize,
    pub unemployed: usize,
}

impl ReportSummary {
    pub fn of(rows: &[ReportRow]) -> Self {
        let employed = rows.iter().filter(|r| r.is_employed()).count();
        Self {
            total: rows.len(),
            employed,
            unemployed: rows.len() - employed,
        }
    }
}

/// A finished export body and the headers it should be sent with.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Rows loaded for an export, ready to be written to any sink.
///
/// Loading happens up front so filter errors surface before a response
/// starts. Writing is separate so a caller can stream the body.
#[derive(Debug, Clone)]
pub struct PreparedExport {
    rows: Vec<ReportRow>,
    format: ExportFormat,
    generated_at: DateTime<Utc>,
}

impl PreparedExport {
    pub fn new(rows: Vec<ReportRow>, format: ExportFormat, generated_at: DateTime<Utc>) -> Self {
        Self {
            rows,
            format,
            generated_at,
        }
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn filename(&self) -> String {
        export_filename(self.format, self.generated_at)
    }

    /// Writes the export into `sink` as it is produced.
    pub fn write_to<W: Write>(&self, sink: W) -> std::result::Result<(), ReportError> {
        write_rows(&self.rows, self.format, self.generated_at, sink)
    }

    /// Buffers the whole export.
    pub fn render(&self) -> std::result::Result<RenderedReport, ReportError> {
        render(&self.rows, self.format, self.generated_at)
    }
}

/// Resolves `query` and loads every matching student for `format`.
pub fn prepare_export(
    db: &Database,
    query: &StudentQuery,
    format: ExportFormat,
    generated_at: DateTime<Utc>,
) -> Result<PreparedExport> {
    let filter = resolve(db, query)?;
    let records = student_repo::query_all(db, &filter)?;
    let rows: Vec<ReportRow> = records.iter().map(ReportRow::from_record).collect();
    Ok(PreparedExport::new(rows, format, generated_at))
}

/// Resolves `query`, loads every matching student and renders `format`
/// into memory.
pub fn export_students(
    db: &Database,
    query: &StudentQuery,
    format: ExportFormat,
    generated_at: DateTime<Utc>,
) -> Result<RenderedReport> {
    Ok(prepare_export(db, query, format, generated_at)?.render()?)
}

pub fn render(
    rows: &[ReportRow],
    format: ExportFormat,
    generated_at: DateTime<Utc>,
) -> std::result::Result<RenderedReport, ReportError> {
    let mut bytes = Vec::new();
    write_rows(rows, format, generated_at, &mut bytes)?;
    Ok(RenderedReport {
        bytes,
        content_type: format.content_type(),
        filename: export_filename(format, generated_at),
    })
}

pub fn write_rows<W: Write>(
    rows: &[ReportRow],
    format: ExportFormat,
    generated_at: DateTime<Utc>,
    sink: W,
) -> std::result::Result<(), ReportError> {
    let _span = tracing::info_span!("write_report", %format, rows = rows.len()).entered();

    let summary = ReportSummary::of(rows);
    let generated = format_timestamp(generated_at);
    match format {
        ExportFormat::Csv => csv::write(rows, sink)?,
        ExportFormat::Xlsx => xlsx::write(rows, summary, &generated, sink)?,
        ExportFormat::Pdf => pdf::write(rows, summary, &generated, sink)?,
    }

    tracing::info!("Report written");
    Ok(())
}

fn export_filename(format: ExportFormat, generated_at: DateTime<Utc>) -> String {
    format!(
        "students-{}.{}",
        generated_at.format("%Y-%m-%d"),
        format.extension()
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sample_rows() -> Vec<ReportRow> {
        vec![
            ReportRow {
                student_id: 7,
                name: "Ada Lovelace".to_string(),
                gender: "Female".to_string(),
                email: "ada@example.com".to_string(),
                phone_number: String::new(),
                faculty: "Engineering".to_string(),
                department: "Civil".to_string(),
                class_name: "CE-1".to_string(),
                batch: "Batch 2021".to_string(),
                year: Some(2021),
                job: "Engineer".to_string(),
                employment_status: "Employed",
                created_at: "2026-01-02T00:00:00.000Z".to_string(),
            },
            ReportRow {
                student_id: 8,
                name: "Grace, \"Amazing\" Hopper".to_string(),
                gender: "Female".to_string(),
                email: String::new(),
                phone_number: String::new(),
                faculty: String::new(),
                department: String::new(),
                class_name: String::new(),
                batch: String::new(),
                year: None,
                job: String::new(),
                employment_status: "Unemployed",
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        ]
    }

    #[test]
    fn format_parsing() {
        assert_eq!(ExportFormat::parse(None).unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse(Some("EXCEL")).unwrap(), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::parse(Some("pdf")).unwrap(), ExportFormat::Pdf);
        let err = ExportFormat::parse(Some("doc")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid format. Use csv, xlsx, or pdf.");
    }

    #[test]
    fn summary_counts_employment() {
        let summary = ReportSummary::of(&sample_rows());
        assert_eq!(
            summary,
            ReportSummary {
                total: 2,
                employed: 1,
                unemployed: 1
            }
        );
    }

    #[test]
    fn filename_is_dated() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        for (format, name) in [
            (ExportFormat::Csv, "students-2026-03-09.csv"),
            (ExportFormat::Xlsx, "students-2026-03-09.xlsx"),
            (ExportFormat::Pdf, "students-2026-03-09.pdf"),
        ] {
            let report = render(&sample_rows(), format, at).unwrap();
            assert_eq!(report.filename, name);
            assert_eq!(report.content_type, format.content_type());
            assert!(!report.bytes.is_empty());
        }
    }

    #[test]
    fn prepared_export_streams_what_render_buffers() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let export = PreparedExport::new(sample_rows(), ExportFormat::Csv, at);
        assert_eq!(export.filename(), "students-2026-03-09.csv");

        let mut streamed = Vec::new();
        export.write_to(&mut streamed).unwrap();
        assert_eq!(streamed, export.render().unwrap().bytes);

        let failing = PreparedExport::new(sample_rows(), ExportFormat::Xlsx, at);
        assert!(failing.write_to(ClosedSink).is_err());
    }

    /// A sink whose reader went away.
    struct ClosedSink;

    impl Write for ClosedSink {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn missing_values_render_empty() {
        let fields = sample_rows()[1].text_fields();
        assert_eq!(fields[9], "");
        assert_eq!(fields[10], "");
        assert_eq!(fields[11], "Unemployed");
    }
}
