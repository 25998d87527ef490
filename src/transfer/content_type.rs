//! Allow-listed upload content types.
//!
//! Each entry pairs a name with a MIME type. An upload is accepted only when the
//! entry matching its declared MIME type is named like the file's extension,
//! so `photo.PNG` declared as `image/png` passes and `photo.png` declared as
//! `image/jpeg` does not.

/// One allow-listed type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentType {
    /// Upper-case extension this type is stored under.
    pub name: &'static str,
    pub mime: &'static str,
}

impl ContentType {
    /// Whether `file_name`'s extension names this entry (ASCII case-insensitive).
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        extension(file_name).is_some_and(|ext| ext.eq_ignore_ascii_case(self.name))
    }
}

const ENTRIES: &[ContentType] = &[
    ContentType { name: "OCTETSTREAM", mime: "application/octet-stream" },
    // Image
    ContentType { name: "PNG", mime: "image/png" },
    ContentType { name: "JPEG", mime: "image/jpeg" },
    ContentType { name: "GIF", mime: "image/gif" },
    ContentType { name: "SVG", mime: "image/svg+xml" },
    ContentType { name: "WEBP", mime: "image/webp" },
    // Audio
    ContentType { name: "MP3", mime: "audio/mpeg" },
    ContentType { name: "WAV", mime: "audio/wav" },
    ContentType { name: "OGG", mime: "audio/ogg" },
    // Video
    ContentType { name: "MP4", mime: "video/mp4" },
    ContentType { name: "WEBM", mime: "video/webm" },
    // Document
    ContentType { name: "JS", mime: "application/x-javascript" },
    ContentType { name: "JSON", mime: "application/json" },
    ContentType { name: "TXT", mime: "text/plain" },
    ContentType { name: "PDF", mime: "application/pdf" },
    ContentType { name: "XML", mime: "application/xml" },
    // Archive
    ContentType { name: "ZIP", mime: "application/zip" },
    ContentType { name: "GZIP", mime: "application/gzip" },
];

/// Immutable extension ↔ MIME table.
#[derive(Debug, Clone, Copy)]
pub struct ContentTypeRegistry {
    entries: &'static [ContentType],
}

impl Default for ContentTypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ContentTypeRegistry {
    /// The built-in image/audio/video/document/archive table.
    pub const fn standard() -> Self {
        Self { entries: ENTRIES }
    }

    /// Entry for a declared MIME type. Parameters such as `; charset=...` are ignored.
    pub fn by_mime(&self, declared: &str) -> Option<&'static ContentType> {
        let essence = declared.split(';').next().unwrap_or("").trim();
        self.entries
            .iter()
            .find(|entry| entry.mime.eq_ignore_ascii_case(essence))
    }
}

/// Text after the last `.` of a file name, if any.
pub fn extension(file_name: &str) -> Option<&str> {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_matches_any_case() {
        let registry = ContentTypeRegistry::standard();
        let png = registry.by_mime("image/png").unwrap();
        assert!(png.matches_file_name("photo.PNG"));
        assert!(png.matches_file_name("photo.png"));
        assert!(!png.matches_file_name("photo.jpg"));
    }

    #[test]
    fn declared_jpeg_does_not_match_png_file() {
        let registry = ContentTypeRegistry::standard();
        let jpeg = registry.by_mime("image/jpeg").unwrap();
        assert_eq!(jpeg.name, "JPEG");
        assert!(!jpeg.matches_file_name("photo.png"));
    }

    #[test]
    fn mime_parameters_are_ignored() {
        let registry = ContentTypeRegistry::default();
        assert_eq!(
            registry.by_mime("Text/Plain; charset=utf-8").map(|e| e.name),
            Some("TXT")
        );
        assert!(registry.by_mime("application/x-msdownload").is_none());
    }

    #[test]
    fn gzip_is_stored_under_its_extension() {
        let registry = ContentTypeRegistry::standard();
        let gzip = registry.by_mime("application/gzip").unwrap();
        assert!(gzip.matches_file_name("backup.GZIP"));
        assert!(!gzip.matches_file_name("backup.gz"));
        assert_eq!(ENTRIES.len(), 18);
    }

    #[test]
    fn extension_takes_last_dot() {
        assert_eq!(extension("archive.tar.gzip"), Some("gzip"));
        assert_eq!(extension("noext"), None);
        assert_eq!(extension(".hidden"), None);
        assert_eq!(extension("trailing."), None);
    }
}
