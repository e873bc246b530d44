//! Database migration system.
//!
//! Tracks applied migrations in a `_migrations` table and applies pending
//! ones in order, each inside its own transaction.

use rusqlite::Connection;

use super::error::DatabaseError;

/// A single migration definition.
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// All migrations in order. Each is applied at most once.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_reference_tables",
        sql: include_str!("sql/001_create_reference_tables.sql"),
    },
    Migration {
        version: 2,
        description: "create_students_table",
        sql: include_str!("sql/002_create_students.sql"),
    },
    Migration {
        version: 3,
        description: "create_admins_table",
        sql: include_str!("sql/003_create_admins.sql"),
    },
];

/// Runs all pending migrations on the given connection.
pub fn run_all(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running migration v{}: {}",
            migration.version,
            migration.description
        );

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| DatabaseError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;
        tx.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
        tx.commit()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", table))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();
        run_all(&conn).unwrap();

        let count: u32 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as u32);
    }

    #[test]
    fn test_students_table_shape() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        let columns = table_columns(&conn, "students");
        for expected in ["student_id", "class_id", "batch_id", "job_id", "is_deleted", "deleted_at"] {
            assert!(columns.iter().any(|c| c == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_batch_year_is_range_checked() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        let err = conn.execute(
            "INSERT INTO batches (id, name, year, created_at, updated_at)
             VALUES ('b1', 'Ancient', 1800, 'x', 'x')",
            [],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_student_email_allows_many_nulls() {
        let conn = Connection::open_in_memory().unwrap();
        run_all(&conn).unwrap();

        for (id, student_id) in [("s1", 1), ("s2", 2)] {
            conn.execute(
                "INSERT INTO students (id, student_id, name, class_id, batch_id, created_at, updated_at)
                 VALUES (?1, ?2, 'A', 'c', 'b', 'x', 'x')",
                rusqlite::params![id, student_id],
            )
            .unwrap();
        }
    }
}
