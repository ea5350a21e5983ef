//! Filename and extension resolution for downloaded files.
//!
//! Extension precedence, first hit wins:
//!
//! 1. `Content-Disposition` filename extension, if in [`KNOWN_EXTENSIONS`]
//! 2. `Content-Disposition` extension of any kind, if the hint is unknown
//! 3. `Content-Type` via a fixed MIME table
//! 4. the caller's extension hint, if known
//! 5. the final URL's path extension, if in [`KNOWN_EXTENSIONS`]
//! 6. [`FALLBACK_EXTENSION`]

use std::path::{Component, Path, PathBuf};

use url::Url;

/// Extensions trusted from a server-supplied filename.
pub const KNOWN_EXTENSIONS: &[&str] = &[
    "pdf", "epub", "djvu", "mobi", "azw", "azw3", "fb2", "chm", "lit", "rtf", "doc", "docx",
    "odt", "txt", "zip", "rar", "7z", "cbz", "cbr",
];

/// Extension used when nothing better is known.
pub const FALLBACK_EXTENSION: &str = "bin";

/// Base-name length cap in characters.
const MAX_BASE_LEN: usize = 100;

/// Longest extension accepted from a header or URL.
const MAX_EXTENSION_LEN: usize = 8;

/// Inputs for [`resolve_filename`].
#[derive(Debug, Clone, Copy)]
pub struct FilenameHints<'a> {
    /// Raw `Content-Disposition` header.
    pub content_disposition: Option<&'a str>,
    /// Raw `Content-Type` header.
    pub content_type: Option<&'a str>,
    /// Final (post-redirect) download URL.
    pub final_url: &'a Url,
    /// Title used as the base name.
    pub title_hint: &'a str,
    /// Extension from the search row (`"n/a"` when unknown).
    pub extension_hint: &'a str,
}

/// Builds `"<sanitized base>.<extension>"`.
#[must_use]
pub fn resolve_filename(hints: &FilenameHints<'_>) -> String {
    let header_name = hints
        .content_disposition
        .and_then(parse_content_disposition);
    let header_ext = header_name.as_deref().and_then(extension_of);
    let hint_ext = normalize_extension(hints.extension_hint);

    let extension = header_ext
        .clone()
        .filter(|ext| is_known_extension(ext))
        .or_else(|| header_ext.clone().filter(|_| hint_ext.is_none()))
        .or_else(|| {
            hints
                .content_type
                .and_then(extension_from_content_type)
                .map(str::to_string)
        })
        .or_else(|| hint_ext.clone())
        .or_else(|| extension_from_url(hints.final_url))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    let mut base = sanitize_filename_component(hints.title_hint);
    if base.is_empty() {
        base = header_name
            .as_deref()
            .map(stem_of)
            .map(sanitize_filename_component)
            .filter(|stem| !stem.is_empty())
            .or_else(|| {
                hints
                    .final_url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .map(stem_of)
                    .map(sanitize_filename_component)
                    .filter(|stem| !stem.is_empty())
            })
            .unwrap_or_else(|| "download".to_string());
    }
    format!("{base}.{extension}")
}

/// True for extensions in [`KNOWN_EXTENSIONS`] (case-insensitive).
#[must_use]
pub fn is_known_extension(extension: &str) -> bool {
    let lowered = extension.trim_start_matches('.').to_ascii_lowercase();
    KNOWN_EXTENSIONS.contains(&lowered.as_str())
}

/// Lower-cased hint extension, or `None` for `"n/a"`, `"unknown"` and blanks.
fn normalize_extension(hint: &str) -> Option<String> {
    let cleaned = hint.trim().trim_start_matches('.').to_ascii_lowercase();
    if cleaned.is_empty() || matches!(cleaned.as_str(), "n/a" | "na" | "unknown") {
        return None;
    }
    (cleaned.len() <= MAX_EXTENSION_LEN && cleaned.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(cleaned)
}

fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    normalize_extension(ext)
}

fn stem_of(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

/// Known document extension of the URL's last path segment (never `php`).
pub(crate) fn extension_from_url(url: &Url) -> Option<String> {
    let last_segment = url.path_segments()?.next_back()?;
    extension_of(last_segment).filter(|ext| is_known_extension(ext))
}

/// Replaces hostile characters with `_`, collapses runs, trims and caps length.
pub(crate) fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\'' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | ',') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    let capped: String = out.chars().take(MAX_BASE_LEN).collect();
    capped.trim_matches(|c| c == '_' || c == '.').to_string()
}

/// Maps a `Content-Type` to an extension. Generic types map to `None`.
pub(crate) fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    match mime.as_str() {
        "application/pdf" | "application/x-pdf" => Some("pdf"),
        "application/epub+zip" => Some("epub"),
        "image/vnd.djvu" | "image/x-djvu" | "application/x-djvu" => Some("djvu"),
        "application/x-mobipocket-ebook" => Some("mobi"),
        "application/vnd.amazon.ebook" => Some("azw"),
        "application/x-fictionbook+xml" | "application/x-fictionbook" => Some("fb2"),
        "application/vnd.ms-htmlhelp" | "application/x-chm" => Some("chm"),
        "application/rtf" | "text/rtf" => Some("rtf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "text/plain" => Some("txt"),
        "application/zip" | "application/x-zip-compressed" => Some("zip"),
        "application/x-rar-compressed" | "application/vnd.rar" => Some("rar"),
        "application/x-7z-compressed" => Some("7z"),
        "application/vnd.comicbook+zip" | "application/x-cbz" => Some("cbz"),
        "application/vnd.comicbook-rar" | "application/x-cbr" => Some("cbr"),
        _ => None,
    }
}

/// Parses `Content-Disposition` to extract a filename.
///
/// Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example.pdf` (RFC 5987)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + 10..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded_name) {
                return Some(decoded.into_owned());
            }
        }
    }

    if let Some(pos) = header.find("filename=") {
        let value = header[pos + 9..].trim();
        if let Some(stripped) = value.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                return Some(stripped[..end].to_string());
            }
        } else {
            let end = value.find(';').unwrap_or(value.len());
            let filename = value[..end].trim();
            if !filename.is_empty() {
                return Some(filename.to_string());
            }
        }
    }

    None
}

/// A path under `dir` for `filename` that does not exist yet (`name_1.ext`, ...).
#[must_use]
pub fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let filename = {
        let safe = Path::new(filename).components().all(|component| {
            matches!(component, Component::Normal(_)) && !filename.contains(['/', '\\'])
        });
        if safe && !filename.trim().is_empty() {
            filename.to_string()
        } else {
            format!("download.{FALLBACK_EXTENSION}")
        }
    };
    let base_path = dir.join(&filename);
    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(pos) => (&filename[..pos], &filename[pos..]),
        None => (filename.as_str(), ""),
    };
    for i in 1..1000 {
        let candidate = dir.join(format!("{stem}_{i}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("{stem}_{timestamp}{ext}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn hints<'a>(final_url: &'a Url, extension_hint: &'a str) -> FilenameHints<'a> {
        FilenameHints {
            content_disposition: None,
            content_type: None,
            final_url,
            title_hint: "Dune",
            extension_hint,
        }
    }

    #[test]
    fn test_allowlisted_header_extension_beats_unknown_hint() {
        let final_url = url("https://dl.example/get.php?md5=A");
        for ext in KNOWN_EXTENSIONS {
            let header = format!("attachment; filename=\"whatever.{ext}\"");
            let h = FilenameHints {
                content_disposition: Some(&header),
                content_type: Some("application/octet-stream"),
                ..hints(&final_url, "n/a")
            };
            assert_eq!(resolve_filename(&h), format!("Dune.{ext}"));
        }
    }

    #[test]
    fn test_allowlisted_header_extension_beats_known_hint() {
        let final_url = url("https://dl.example/get.php?md5=A");
        let h = FilenameHints {
            content_disposition: Some("attachment; filename=\"book.djvu\""),
            ..hints(&final_url, "pdf")
        };
        assert_eq!(resolve_filename(&h), "Dune.djvu");
    }

    #[test]
    fn test_unlisted_header_extension_used_only_when_hint_unknown() {
        let final_url = url("https://dl.example/get.php?md5=A");
        let header = "attachment; filename=\"book.lrf\"";
        let unknown_hint = FilenameHints {
            content_disposition: Some(header),
            ..hints(&final_url, "n/a")
        };
        assert_eq!(resolve_filename(&unknown_hint), "Dune.lrf");

        let known_hint = FilenameHints {
            content_disposition: Some(header),
            ..hints(&final_url, "epub")
        };
        assert_eq!(resolve_filename(&known_hint), "Dune.epub");
    }

    #[test]
    fn test_content_type_then_hint_then_url_then_fallback() {
        let pdf_url = url("https://dl.example/files/book.PDF");
        let mime = FilenameHints {
            content_type: Some("application/epub+zip"),
            ..hints(&pdf_url, "mobi")
        };
        assert_eq!(resolve_filename(&mime), "Dune.epub");
        assert_eq!(resolve_filename(&hints(&pdf_url, "mobi")), "Dune.mobi");
        assert_eq!(resolve_filename(&hints(&pdf_url, "n/a")), "Dune.pdf");

        let bare = url("https://dl.example/get.php?md5=A");
        let generic = FilenameHints {
            content_type: Some("application/octet-stream"),
            ..hints(&bare, "")
        };
        assert_eq!(resolve_filename(&generic), "Dune.bin");

        let no_ext = url("https://dl.example/download/ABC");
        assert_eq!(resolve_filename(&hints(&no_ext, "n/a")), "Dune.bin");
    }

    #[test]
    fn test_blank_title_falls_back_to_header_stem() {
        let final_url = url("https://dl.example/get.php?md5=A");
        let h = FilenameHints {
            content_disposition: Some("attachment; filename*=UTF-8''Le%20Guin%20-%20Earthsea.epub"),
            title_hint: "  ",
            ..hints(&final_url, "n/a")
        };
        assert_eq!(resolve_filename(&h), "Le_Guin_-_Earthsea.epub");
    }

    #[test]
    fn test_sanitize_filename_component_strips_hostile_characters() {
        assert_eq!(
            sanitize_filename_component("../../etc/passwd"),
            "etc_passwd"
        );
        assert_eq!(
            sanitize_filename_component("A  Title: With <Bad> | Chars?"),
            "A_Title_With_Bad_Chars"
        );
        assert_eq!(sanitize_filename_component(&"x".repeat(300)).len(), 100);
    }

    #[test]
    fn test_parse_content_disposition_variants() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="example.pdf"; size=1"#),
            Some("example.pdf".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=example.pdf"),
            Some("example.pdf".to_string())
        );
        assert_eq!(parse_content_disposition("attachment"), None);
    }

    #[test]
    fn test_extension_from_content_type_strips_parameters() {
        assert_eq!(
            extension_from_content_type("Application/PDF; charset=binary"),
            Some("pdf")
        );
        assert_eq!(extension_from_content_type("application/octet-stream"), None);
    }

    #[test]
    fn test_resolve_unique_path_adds_suffix() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("Dune.epub"), b"1").unwrap();
        assert_eq!(
            resolve_unique_path(temp_dir.path(), "Dune.epub"),
            temp_dir.path().join("Dune_1.epub")
        );
    }

    #[test]
    fn test_resolve_unique_path_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(
            resolve_unique_path(temp_dir.path(), "../escape.pdf"),
            temp_dir.path().join("download.bin")
        );
    }
}
