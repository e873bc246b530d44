//! Uploaded image handling.
//!
//! Student photos are written to the uploads directory and referenced by
//! URL. Admin photos are small enough to live in the row as `data:` URLs.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;

use crate::error::StorageError;

/// Largest accepted photo.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Subdirectory of the uploads root that holds student photos.
pub const STUDENT_PHOTO_DIR: &str = "students";

/// A file received in a multipart form.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// The declared content type, or one guessed from the file name.
    pub fn mime(&self) -> String {
        self.content_type
            .as_deref()
            .map(|c| c.split(';').next().unwrap_or(c).trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty() && c != "application/octet-stream")
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            })
    }
}

/// Rejects anything that is not an image or is too large. Returns the
/// image's mime type.
pub fn check_image(upload: &Upload) -> Result<String, StorageError> {
    let mime = upload.mime();
    if !mime.starts_with("image/") {
        return Err(StorageError::Rejected("Only image files are allowed".to_string()));
    }
    if upload.bytes.len() > MAX_PHOTO_BYTES {
        return Err(StorageError::Rejected(
            "Image must be 5 MB or smaller".to_string(),
        ));
    }
    Ok(mime)
}

/// Encodes an image upload as a `data:` URL.
pub fn data_url(upload: &Upload) -> Result<String, StorageError> {
    let mime = check_image(upload)?;
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(&upload.bytes)))
}

/// Extension (with dot) for a stored file: the upload's own when it has
/// one, otherwise the first registered for its mime type.
fn extension_for(upload: &Upload, mime: &str) -> String {
    let from_name = Path::new(&upload.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match from_name {
        Some(ext) => format!(".{}", ext.to_ascii_lowercase()),
        None => mime_guess::get_mime_extensions_str(mime)
            .and_then(|exts| exts.first())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default(),
    }
}

/// A photo written to disk: its public URL and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPhoto {
    pub url: String,
    pub path: PathBuf,
}

/// Writes student photos under `{root}/students/` and builds their public
/// URLs.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
    public_base_url: String,
}

impl PhotoStore {
    /// `public_base_url` is the origin photos are served from, e.g.
    /// `http://localhost:7100`. Files are served under `/uploads`.
    pub fn new<P: AsRef<Path>>(root: P, public_base_url: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_directories(&self) -> Result<(), StorageError> {
        let dir = self.root.join(STUDENT_PHOTO_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDirectory {
            path: dir,
            source: e,
        })
    }

    /// Stores a student photo. The returned URL is what the record keeps.
    pub fn save_student_photo(&self, upload: &Upload) -> Result<StoredPhoto, StorageError> {
        let mime = check_image(upload)?;
        self.ensure_directories()?;

        let dir = self.root.join(STUDENT_PHOTO_DIR);
        let extension = extension_for(upload, &mime);
        let millis = Utc::now().timestamp_millis();

        // create_new never overwrites an existing photo.
        for _ in 0..8 {
            let suffix = uuid::Uuid::new_v4().as_u128() % 1_000_000_000;
            let name = format!("student-{}-{}{}", millis, suffix, extension);
            let path = dir.join(&name);
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    if let Err(e) = file.write_all(&upload.bytes) {
                        drop(file);
                        std::fs::remove_file(&path).ok();
                        return Err(StorageError::WriteFile { path, source: e });
                    }
                    log::info!("Stored student photo {}", path.display());
                    return Ok(StoredPhoto {
                        url: format!(
                            "{}/uploads/{}/{}",
                            self.public_base_url, STUDENT_PHOTO_DIR, name
                        ),
                        path,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::WriteFile { path, source: e }),
            }
        }

        Err(StorageError::WriteFile {
            path: dir,
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "could not pick a unique photo name",
            ),
        })
    }

    /// Removes a photo whose record was never saved. Failures are logged
    /// and otherwise ignored.
    pub fn discard(&self, photo: &StoredPhoto) {
        match std::fs::remove_file(&photo.path) {
            Ok(()) => log::info!("Discarded unsaved student photo {}", photo.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to discard student photo {}: {}",
                photo.path.display(),
                e
            ),
        }
    }

    /// Stores `upload` if there is one and hands its URL to `save`. When
    /// `save` fails the stored file is discarded so no orphan is left.
    pub fn with_student_photo<T, E, F>(&self, upload: Option<&Upload>, save: F) -> Result<T, E>
    where
        F: FnOnce(Option<String>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let stored = upload.map(|u| self.save_student_photo(u)).transpose()?;
        let result = save(stored.as_ref().map(|p| p.url.clone()));
        if let (Err(_), Some(photo)) = (&result, &stored) {
            self.discard(photo);
        }
        result
    }
}
