//! Application services: validation and business rules on top of the
//! repositories. Every operation takes the shared [`Database`](crate::db::Database)
//! and returns a [`ServiceError`](crate::error::ServiceError) the HTTP
//! layer can map onto a status code.

pub mod admins;
pub mod backup;
pub mod batches;
pub mod classes;
pub mod departments;
pub mod faculties;
pub mod jobs;
pub mod students;
pub mod validate;
