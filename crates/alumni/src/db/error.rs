//! Database error types.

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// A store-level rule that rejected a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// A unique index rejected the row. Holds the offending column names.
    Unique { table: String, columns: Vec<String> },
    /// A CHECK or NOT NULL rule rejected the row.
    Check(String),
    /// A value had the wrong storage type for its column.
    TypeMismatch,
}

impl DatabaseError {
    /// Classifies SQLite constraint failures so callers can map them to
    /// conflict or validation responses without inspecting rusqlite types.
    pub fn constraint(&self) -> Option<Constraint> {
        let DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(err, message)) = self else {
            return None;
        };
        let message = message.as_deref().unwrap_or_default();
        match err.code {
            ErrorCode::ConstraintViolation => {
                if let Some(rest) = message.strip_prefix("UNIQUE constraint failed: ") {
                    Some(parse_unique_columns(rest))
                } else {
                    Some(Constraint::Check(message.to_string()))
                }
            }
            ErrorCode::TypeMismatch => Some(Constraint::TypeMismatch),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self.constraint(), Some(Constraint::Unique { .. }))
    }
}

/// Parses `"students.email"` or `"departments.faculty_id, departments.name"`.
fn parse_unique_columns(list: &str) -> Constraint {
    let mut table = String::new();
    let columns = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|qualified| match qualified.split_once('.') {
            Some((t, column)) => {
                table = t.to_string();
                column.to_string()
            }
            None => qualified.to_string(),
        })
        .collect();
    Constraint::Unique { table, columns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn failing_insert(sql: &str) -> DatabaseError {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, a TEXT UNIQUE, b TEXT, n INTEGER CHECK (n > 0),
             UNIQUE (a, b));
             INSERT INTO t (a, b, n) VALUES ('x', 'y', 1);",
        )
        .unwrap();
        DatabaseError::from(conn.execute(sql, []).unwrap_err())
    }

    #[test]
    fn test_unique_violation_names_column() {
        let err = failing_insert("INSERT INTO t (a, b, n) VALUES ('x', 'z', 1)");
        assert_eq!(
            err.constraint(),
            Some(Constraint::Unique {
                table: "t".to_string(),
                columns: vec!["a".to_string()],
            })
        );
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_check_violation() {
        let err = failing_insert("INSERT INTO t (a, b, n) VALUES ('q', 'z', 0)");
        assert!(matches!(err.constraint(), Some(Constraint::Check(_))));
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_composite_unique_columns() {
        assert_eq!(
            parse_unique_columns("departments.faculty_id, departments.name"),
            Constraint::Unique {
                table: "departments".to_string(),
                columns: vec!["faculty_id".to_string(), "name".to_string()],
            }
        );
    }

    #[test]
    fn test_other_errors_are_unclassified() {
        assert_eq!(DatabaseError::LockPoisoned.constraint(), None);
    }
}
