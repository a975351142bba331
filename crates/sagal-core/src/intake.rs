//! Image intake.
//!
//! Type and size checks on a user-selected file, and the ephemeral local
//! preview that lives exactly as long as the accepted submission.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::IntakeError;

/// Default ceiling for a smear image.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 3 * 1024 * 1024;

/// A file as selected by the user, before validation.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl RawImage {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, taking its MIME type from the extension.
    ///
    /// Unknown extensions get `application/octet-stream`, which intake
    /// then rejects as not an image.
    pub fn from_path(path: &Path) -> Result<Self, IntakeError> {
        let bytes = std::fs::read(path).map_err(|source| IntakeError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(mime_type_for_extension)
            .unwrap_or("application/octet-stream");

        Ok(Self::new(file_name, mime_type, bytes))
    }
}

/// Map a file extension to an image MIME type.
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// Map an image MIME type to the extension used for stored objects.
pub fn extension_for_mime_type(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        _ => None,
    }
}

/// Local preview of a selected image. The backing temp file is deleted
/// when the handle is dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    file: NamedTempFile,
}

impl PreviewHandle {
    fn create(bytes: &[u8], extension: &str) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("sagal-preview-")
            .suffix(&format!(".{extension}"))
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Display-only reference. Never persist it.
    pub fn url(&self) -> String {
        format!("file://{}", self.path().display())
    }
}

/// One accepted classification attempt. Owns the image bytes and its
/// preview until it is dropped or superseded.
#[derive(Debug)]
pub struct ImageSubmission {
    id: Uuid,
    file_name: String,
    mime_type: String,
    extension: String,
    bytes: Vec<u8>,
    preview: PreviewHandle,
}

impl ImageSubmission {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Extension used when the image is stored.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn preview_url(&self) -> String {
        self.preview.url()
    }
}

/// Accepts `image/*` files up to a size ceiling.
#[derive(Debug, Clone, Copy)]
pub struct ImageIntakeValidator {
    max_bytes: u64,
}

impl Default for ImageIntakeValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl ImageIntakeValidator {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Validate a selected file and allocate its preview.
    ///
    /// No network or storage side effects beyond the local preview file.
    pub fn validate(&self, file: RawImage) -> Result<ImageSubmission, IntakeError> {
        let mime_type = file.mime_type.trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(IntakeError::NotAnImage {
                file_name: file.file_name,
                mime_type: file.mime_type,
            });
        }

        let size_bytes = file.bytes.len() as u64;
        if size_bytes > self.max_bytes {
            return Err(IntakeError::TooLarge {
                file_name: file.file_name,
                size_bytes,
                max_bytes: self.max_bytes,
            });
        }
        if size_bytes == 0 {
            return Err(IntakeError::Empty(file.file_name));
        }

        let extension = Path::new(&file.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| mime_type_for_extension(e).is_some())
            .map(|e| e.to_ascii_lowercase())
            .or_else(|| extension_for_mime_type(&mime_type).map(str::to_string))
            .unwrap_or_else(|| "img".to_string());

        let preview =
            PreviewHandle::create(&file.bytes, &extension).map_err(IntakeError::Preview)?;

        Ok(ImageSubmission {
            id: Uuid::new_v4(),
            file_name: file.file_name,
            mime_type,
            extension,
            bytes: file.bytes,
            preview,
        })
    }
}
