//! Extension helpers: lower-cased extension, best-effort content type and
//! the transcription media format.

use std::path::Path;

/// Lower-cased extension of `filename`, empty when there is none.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Content type stored alongside the blob; unknown extensions are binary.
pub fn content_type_for(filename: &str) -> &'static str {
    match extension_of(filename).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "amr" => "audio/amr",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Transcription media format for a lower-cased extension.
pub fn media_format_for_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "mp3" => Some("mp3"),
        "mp4" | "m4a" | "mov" => Some("mp4"),
        "wav" => Some("wav"),
        "flac" => Some("flac"),
        "ogg" => Some("ogg"),
        "amr" => Some("amr"),
        "webm" => Some("webm"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_lower_cased() {
        assert_eq!(extension_of("Report.PDF"), "pdf");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "");
    }

    #[test]
    fn test_content_type_fallback() {
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("clip.mp4"), "video/mp4");
        assert_eq!(content_type_for("notes.xyz"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_media_format_mapping() {
        assert_eq!(media_format_for_extension("mp3"), Some("mp3"));
        assert_eq!(media_format_for_extension("m4a"), Some("mp4"));
        assert_eq!(media_format_for_extension("mkv"), None);
    }
}
