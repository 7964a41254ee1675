//! MIME type detection for record metadata.

use std::path::Path;

/// Common MIME type constants.
pub mod types {
    pub const MARKDOWN: &str = "text/markdown; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const YAML: &str = "text/yaml; charset=utf-8";
    pub const TOML: &str = "text/toml; charset=utf-8";
    pub const PDF: &str = "application/pdf";
    pub const ZIP: &str = "application/zip";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const MP3: &str = "audio/mpeg";
    pub const MP4: &str = "video/mp4";
}

/// Guess MIME type from a declared path's extension.
pub fn from_path_str(declared_path: &str) -> &'static str {
    let ext = Path::new(declared_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    from_extension(ext.as_deref())
}

/// Guess MIME type from a file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("md" | "markdown") => types::MARKDOWN,
        Some("txt") => types::PLAIN,
        Some("html" | "htm") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs" | "cjs") => types::JAVASCRIPT,
        Some("json") => types::JSON,
        Some("xml") => types::XML,
        Some("yaml" | "yml") => types::YAML,
        Some("toml") => types::TOML,
        Some("pdf") => types::PDF,
        Some("zip") => types::ZIP,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("svg") => types::SVG,
        Some("mp3") => types::MP3,
        Some("mp4" | "m4v") => types::MP4,
        _ => types::OCTET_STREAM,
    }
}
