use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::db::{Constraint, DatabaseError};
use crate::import::ImportReport;

/// Top-level error returned by every service operation.
///
/// The HTTP layer maps each variant onto a status code; see
/// [`ServiceError::kind`].
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    ImportRejected {
        message: String,
        report: Box<ImportReport>,
    },

    #[error("Database error: {0}")]
    Database(DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    Internal,
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl ServiceError {
    /// A validation failure with a single message and no field list.
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// A `Validation error` carrying one entry per failing field.
    pub fn fields(errors: Vec<FieldError>) -> Self {
        ServiceError::Validation {
            message: "Validation error".to_string(),
            errors,
        }
    }

    pub fn not_found(entity: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", entity))
    }

    pub fn kind(&self) -> ErrorKind {
        use crate::auth::AuthError;
        match self {
            ServiceError::Validation { .. }
            | ServiceError::ImportRejected { .. }
            | ServiceError::Import(_) => ErrorKind::BadRequest,
            ServiceError::Report(ReportError::InvalidFormat(_)) => ErrorKind::BadRequest,
            ServiceError::Storage(StorageError::Rejected(_)) => ErrorKind::BadRequest,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Unauthorized(_) => ErrorKind::Unauthorized,
            ServiceError::Auth(AuthError::MissingToken | AuthError::InvalidToken) => {
                ErrorKind::Unauthorized
            }
            _ => ErrorKind::Internal,
        }
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err.constraint() {
            Some(Constraint::Unique { columns, .. }) => {
                let fields: Vec<&str> = columns.iter().map(|c| api_field(c)).collect();
                ServiceError::Conflict(format!("Duplicate value ({})", fields.join(", ")))
            }
            Some(Constraint::Check(message)) => ServiceError::Validation {
                message: "Validation error".to_string(),
                errors: vec![FieldError {
                    field: String::new(),
                    message,
                }],
            },
            Some(Constraint::TypeMismatch) => ServiceError::invalid("Invalid identifier"),
            None => ServiceError::Database(err),
        }
    }
}

/// Maps a column name to the field name clients use.
fn api_field(column: &str) -> &str {
    match column {
        "student_id" => "studentId",
        "name" => "name",
        "email" => "email",
        "year" => "year",
        "faculty_id" => "facultyId",
        "department_id" => "departmentId",
        "class_id" => "classId",
        "batch_id" => "batchId",
        "job_id" => "jobId",
        "phone_number" => "phoneNumber",
        other => other,
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload itself is unacceptable (wrong type, too large).
    #[error("{0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid format. Use csv, xlsx, or pdf.")]
    InvalidFormat(String),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook write failed: {0}")]
    Workbook(String),

    #[error("PDF write failed: {0}")]
    Pdf(String),

    #[error("JSON write failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading an uploaded workbook.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid spreadsheet file: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid spreadsheet XML: {0}")]
    Xml(String),

    #[error("Spreadsheet has no worksheets")]
    NoWorksheet,

    #[error("Spreadsheet part {0} is too large when decompressed")]
    PartTooLarge(String),

    #[error("Failed to read spreadsheet: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for ImportError {
    fn from(err: quick_xml::Error) -> Self {
        ImportError::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
