use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;

/// Name used when an attachment arrives without a usable filename.
const FALLBACK_NAME: &str = "attachment";

/// Alternate names tried after the original before giving up.
const MAX_ALTERNATES: u32 = 1000;

/// Writes attachment bytes into a single output directory.
pub struct FileStorage {
    output_directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Stores `content` under `name`. If a file of that name already exists, a
    /// millisecond timestamp is inserted before the extension
    /// (`report.pdf` -> `report (1699999999999).pdf`); if that is taken too, a
    /// counter follows the timestamp (`report (1699999999999-2).pdf`). Existing
    /// files are never overwritten.
    pub async fn store(&self, name: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        self.ensure_directory().await?;

        let filename = sanitize_filename(name);
        let path = self.output_directory.join(&filename);

        // Exclusive create is the existence check.
        match write_new(&path, content).await {
            Err(StorageError::FileExists(_)) => {}
            other => return other.map(|()| path),
        }

        let millis = Utc::now().timestamp_millis();
        for attempt in 1..=MAX_ALTERNATES {
            let alternate = self
                .output_directory
                .join(timestamped_name(&filename, millis, attempt));
            match write_new(&alternate, content).await {
                Err(StorageError::FileExists(_)) => continue,
                other => return other.map(|()| alternate),
            }
        }

        Err(StorageError::FileExists(path))
    }

    async fn ensure_directory(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.output_directory)
            .await
            .map_err(|e| StorageError::CreateDirectory {
                path: self.output_directory.clone(),
                source: e,
            })
    }
}

/// Creates `path` exclusively and writes `content` into it.
async fn write_new(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(StorageError::FileExists(path.to_path_buf()));
        }
        Err(e) => {
            return Err(StorageError::WriteFile {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let write_err = |e| StorageError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    };
    file.write_all(content).await.map_err(write_err)?;
    file.flush().await.map_err(write_err)?;
    Ok(())
}

/// Inserts ` (<millis>)` between base name and extension, or
/// ` (<millis>-<attempt>)` from the second attempt on. Names without a dot get
/// the token appended.
pub fn timestamped_name(filename: &str, millis: i64, attempt: u32) -> String {
    let token = match attempt {
        0 | 1 => millis.to_string(),
        n => format!("{}-{}", millis, n),
    };
    match filename.rfind('.') {
        Some(dot_pos) => format!(
            "{} ({}){}",
            &filename[..dot_pos],
            token,
            &filename[dot_pos..]
        ),
        None => format!("{} ({})", filename, token),
    }
}

/// Reduces a provider-supplied filename to a single safe path component.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => FALLBACK_NAME.to_string(),
        _ => cleaned,
    }
}
