use crate::error::BookingError;
use crate::validation::FileMeta;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;

const SUBDIR: &str = "identifications";

/// File store for the identification documents attached to bookings.
/// Objects are written under `identifications/<millis>_<original-name>` and
/// served back through the public base URL.
#[derive(Debug, Clone)]
pub struct IdentificationStore {
    root: PathBuf,
    public_base_url: String,
}

impl IdentificationStore {
    pub fn new(root: PathBuf, public_base_url: &str) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Writes the file and returns its public download URL.
    pub async fn store(
        &self,
        meta: &FileMeta,
        bytes: &[u8],
        uploaded_at: DateTime<Utc>,
    ) -> Result<String, BookingError> {
        let object_name = format!(
            "{}_{}",
            uploaded_at.timestamp_millis(),
            sanitize_filename(&meta.filename)
        );
        let dir = self.root.join(SUBDIR);
        fs::create_dir_all(&dir)
            .await
            .map_err(|err| BookingError::Upload(err.to_string()))?;
        fs::write(dir.join(&object_name), bytes)
            .await
            .map_err(|err| BookingError::Upload(err.to_string()))?;

        Ok(format!("{}/{}/{}", self.public_base_url, SUBDIR, object_name))
    }

    /// Reads a stored object by its name, for the download endpoint.
    pub async fn read(&self, object_name: &str) -> Result<(Vec<u8>, &'static str), BookingError> {
        // Object names never contain separators; anything else is not ours.
        if object_name.contains('/') || object_name.contains('\\') || object_name.contains("..") {
            return Err(BookingError::NotFound);
        }
        let path = self.root.join(SUBDIR).join(object_name);
        let bytes = fs::read(path)
            .await
            .map_err(|_| BookingError::NotFound)?;
        Ok((bytes, content_type_for(object_name)))
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn content_type_for(name: &str) -> &'static str {
    let lowered = name.to_lowercase();
    if lowered.ends_with(".jpg") || lowered.ends_with(".jpeg") {
        "image/jpeg"
    } else if lowered.ends_with(".png") {
        "image/png"
    } else if lowered.ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}
