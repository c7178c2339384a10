//! Source document intake: size and media-type validation.
//!
//! A [`SourceDocument`] can only be constructed through the validating
//! constructors, so anything that reaches the pipeline is already within
//! the size limit and on the media-type allow-list. Rejections never touch
//! session state.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use thiserror::Error;

/// Largest accepted document, in decoded bytes (10 MiB).
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Errors from document intake.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is too large ({size_mib:.2} MiB); the limit is 10 MiB")]
    TooLarge { size: usize, size_mib: f64 },

    #[error("unsupported media type {0:?}; upload an image or a PDF")]
    UnsupportedMediaType(String),

    #[error("document payload is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("failed to read document {path:?}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// A validated source document, held base64-encoded as the backend expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDocument {
    #[serde(skip)]
    data: String,
    media_type: String,
    display_name: String,
    size: usize,
}

impl SourceDocument {
    /// Validate raw bytes and encode them.
    pub fn from_bytes(
        bytes: &[u8],
        media_type: &str,
        display_name: impl Into<String>,
    ) -> Result<Self, DocumentError> {
        check_size(bytes.len())?;
        let media_type = check_media_type(media_type)?;
        Ok(Self {
            data: STANDARD.encode(bytes),
            media_type,
            display_name: display_name.into(),
            size: bytes.len(),
        })
    }

    /// Validate an already-encoded payload (e.g. from an HTTP upload).
    ///
    /// A `data:<type>;base64,` prefix is accepted and stripped.
    pub fn from_base64(
        data: &str,
        media_type: &str,
        display_name: impl Into<String>,
    ) -> Result<Self, DocumentError> {
        let data = match data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => data,
        };
        let data = data.trim();
        // Reject on the encoded length first so an oversized upload is never decoded.
        let estimated = data.len() / 4 * 3;
        if estimated > MAX_DOCUMENT_BYTES + 2 {
            return Err(too_large(estimated));
        }
        let decoded = STANDARD.decode(data)?;
        check_size(decoded.len())?;
        let media_type = check_media_type(media_type)?;
        Ok(Self {
            data: data.to_string(),
            media_type,
            display_name: display_name.into(),
            size: decoded.len(),
        })
    }

    /// Read a document from disk, inferring the media type from its extension.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type_for_path(path).ok_or_else(|| {
            DocumentError::UnsupportedMediaType(
                path.extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default(),
            )
        })?;

        let metadata = std::fs::metadata(path).map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        if metadata.len() > MAX_DOCUMENT_BYTES as u64 {
            return Err(too_large(
                usize::try_from(metadata.len()).unwrap_or(usize::MAX),
            ));
        }

        let bytes = std::fs::read(path).map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_bytes(&bytes, media_type, display_name)
    }

    /// Base64-encoded document bytes.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Decoded size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == "application/pdf"
    }
}

fn check_size(size: usize) -> Result<(), DocumentError> {
    if size > MAX_DOCUMENT_BYTES {
        return Err(too_large(size));
    }
    Ok(())
}

fn too_large(size: usize) -> DocumentError {
    DocumentError::TooLarge {
        size,
        size_mib: size as f64 / (1024.0 * 1024.0),
    }
}

/// Normalize and check a declared media type against the allow-list.
fn check_media_type(media_type: &str) -> Result<String, DocumentError> {
    let normalized = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let allowed = normalized == "application/pdf"
        || normalized
            .strip_prefix("image/")
            .is_some_and(|sub| !sub.is_empty());
    if allowed {
        Ok(normalized)
    } else {
        Err(DocumentError::UnsupportedMediaType(media_type.to_string()))
    }
}

/// Media type for a file extension, if it is one we accept.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(media_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn accepts_images_and_pdf() {
        assert!(SourceDocument::from_bytes(b"x", "image/png", "a.png").is_ok());
        assert!(SourceDocument::from_bytes(b"x", "image/jpeg", "a.jpg").is_ok());
        let pdf = SourceDocument::from_bytes(b"x", "Application/PDF", "a.pdf").unwrap();
        assert_eq!(pdf.media_type(), "application/pdf");
        assert!(pdf.is_pdf());
    }

    #[test]
    fn rejects_other_media_types() {
        for mt in ["text/plain", "application/msword", "image/", "", "video/mp4"] {
            let err = SourceDocument::from_bytes(b"x", mt, "f").unwrap_err();
            assert!(
                matches!(err, DocumentError::UnsupportedMediaType(_)),
                "{mt} should be rejected"
            );
        }
    }

    #[test]
    fn enforces_ten_mib_limit() {
        let exactly = vec![0u8; MAX_DOCUMENT_BYTES];
        assert!(SourceDocument::from_bytes(&exactly, "image/png", "ok.png").is_ok());

        let over = vec![0u8; MAX_DOCUMENT_BYTES + 1];
        let err = SourceDocument::from_bytes(&over, "image/png", "big.png").unwrap_err();
        assert!(matches!(err, DocumentError::TooLarge { .. }));
    }

    #[test]
    fn twelve_mib_upload_is_rejected_with_size_in_message() {
        let big = vec![0u8; 12 * 1024 * 1024];
        let encoded = STANDARD.encode(&big);
        let err = SourceDocument::from_base64(&encoded, "image/png", "big.png").unwrap_err();
        assert!(matches!(err, DocumentError::TooLarge { .. }));
        assert!(err.to_string().contains("12.00 MiB"));
    }

    #[test]
    fn base64_roundtrip_and_data_url_prefix() {
        let doc = SourceDocument::from_bytes(b"hello", "image/png", "h.png").unwrap();
        assert_eq!(doc.data(), "aGVsbG8=");
        assert_eq!(doc.size(), 5);

        let from_url =
            SourceDocument::from_base64("data:image/png;base64,aGVsbG8=", "image/png", "h.png")
                .unwrap();
        assert_eq!(from_url, doc);
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = SourceDocument::from_base64("not base64!!", "image/png", "x").unwrap_err();
        assert!(matches!(err, DocumentError::InvalidEncoding(_)));
    }

    #[test]
    fn from_path_infers_media_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schedule.PNG");
        std::fs::write(&path, b"\x89PNG").unwrap();
        let doc = SourceDocument::from_path(&path).unwrap();
        assert_eq!(doc.media_type(), "image/png");
        assert_eq!(doc.display_name(), "schedule.PNG");
    }

    #[test]
    fn from_path_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.docx");
        std::fs::write(&path, b"x").unwrap();
        let err = SourceDocument::from_path(&path).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedMediaType(_)));
    }

    #[test]
    fn from_path_rejects_huge_file_before_reading() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.pdf");
        let file = std::fs::File::create(&path).unwrap();
        // Sparse: past 4 GiB without allocating.
        file.set_len(5 * 1024 * 1024 * 1024).unwrap();
        drop(file);

        let err = SourceDocument::from_path(&path).unwrap_err();
        assert!(matches!(err, DocumentError::TooLarge { size, .. } if size > MAX_DOCUMENT_BYTES));
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = SourceDocument::from_path(Path::new("/nonexistent/week.pdf")).unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
    }

    #[test]
    fn serialized_document_omits_payload() {
        let doc = SourceDocument::from_bytes(b"hello", "image/png", "h.png").unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["display_name"], "h.png");
    }
}
