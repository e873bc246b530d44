//! Admin account repository.
//!
//! The password hash never leaves this module except through
//! [`find_credentials_by_email`] and [`find_password_hash`].

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{Database, DatabaseError};

/// Public admin profile. Safe to serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo_image: String,
    pub created_at: String,
    pub updated_at: String,
}

impl AdminRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            photo_image: row.get("photo_image")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub fn insert(db: &Database, admin: &AdminRow, password_hash: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO admins (id, name, email, photo_image, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                admin.id,
                admin.name,
                admin.email,
                admin.photo_image,
                password_hash,
                admin.created_at,
                admin.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Updates the profile fields. The password is untouched.
pub fn update_profile(db: &Database, admin: &AdminRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE admins SET name = ?2, email = ?3, photo_image = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                admin.id,
                admin.name,
                admin.email,
                admin.photo_image,
                admin.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn update_password(
    db: &Database,
    id: &str,
    password_hash: &str,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE admins SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, password_hash, updated_at],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<AdminRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row("SELECT * FROM admins WHERE id = ?1", params![id], AdminRow::from_row)
            .optional()?)
    })
}

/// Looks up an admin and its password hash by (lowercased) email.
pub fn find_credentials_by_email(
    db: &Database,
    email: &str,
) -> Result<Option<(AdminRow, String)>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM admins WHERE email = ?1",
                params![email],
                |row| Ok((AdminRow::from_row(row)?, row.get("password_hash")?)),
            )
            .optional()?)
    })
}

pub fn find_password_hash(db: &Database, id: &str) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT password_hash FROM admins WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?)
    })
}

pub fn email_taken(db: &Database, email: &str, exclude_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM admins WHERE email = ?1 AND id != ?2",
            params![email, exclude_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}

pub fn list(db: &Database) -> Result<Vec<AdminRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM admins ORDER BY created_at ASC")?;
        let rows = stmt
            .query_map([], AdminRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM admins", [], |r| r.get(0))?))
}
