//! Textual-content detection

use super::get_header_value;
use crate::models::Header;

const TEXTUAL_PREFIXES: &[&str] = &[
    "text/",
    "application/x-www-form-urlencoded",
    "application/json",
    "multipart/",
    "message/",
    "image/svg",
    "application/xhtml+xml",
    "application/xml",
];

const BINARY_PREFIXES: &[&str] = &[
    "application/zip",
    "application/octet-stream",
    "application/pdf",
    "video/",
    "audio/",
    "image/png",
    "image/webp",
    "image/jpeg",
    "image/gif",
    "image/avif",
];

/// `Some(true)` for known textual types, `Some(false)` for known binary types,
/// `None` when the content type does not decide.
fn classify_content_type(content_type: &str) -> Option<bool> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    // JSON:API and friends, e.g. application/vnd.api+json
    if essence.ends_with("+json") || TEXTUAL_PREFIXES.iter().any(|p| essence.starts_with(p)) {
        return Some(true);
    }
    if BINARY_PREFIXES.iter().any(|p| essence.starts_with(p)) {
        return Some(false);
    }
    None
}

/// Whether a body should be presented as text.
///
/// The `Content-Type` header decides when it is known; otherwise the bytes
/// are checked for valid UTF-8.
pub fn is_textual(headers: Option<&[Header]>, body: &[u8]) -> bool {
    let declared = headers
        .and_then(|headers| get_header_value(headers, "Content-Type"))
        .and_then(classify_content_type);
    match declared {
        Some(textual) => textual,
        None => is_valid_utf8(body),
    }
}

/// Strict UTF-8 validation. A leading byte-order mark is valid UTF-8 and is
/// accepted; overlong forms, surrogates, stray continuation bytes and
/// truncated sequences are rejected.
pub fn is_valid_utf8(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_type(value: &str) -> Vec<Header> {
        vec![Header::new("Content-Type", value)]
    }

    #[test]
    fn textual_content_types() {
        for ct in [
            "text/html; charset=utf-8",
            "application/json",
            "application/vnd.api+json",
            "application/hal+json",
            "application/x-www-form-urlencoded",
            "multipart/form-data; boundary=x",
            "image/svg+xml",
            "application/xml",
            "Application/XHTML+XML",
        ] {
            assert!(is_textual(Some(&content_type(ct)), &[0xff]), "{ct}");
        }
    }

    #[test]
    fn binary_content_types_win_over_bytes() {
        for ct in ["image/png", "application/octet-stream", "video/mp4", "audio/mpeg", "image/avif"] {
            assert!(!is_textual(Some(&content_type(ct)), b"plain ascii"), "{ct}");
        }
    }

    #[test]
    fn undecided_content_type_inspects_bytes() {
        let headers = content_type("application/x-custom");
        assert!(is_textual(Some(&headers), "ünïcödé ✓".as_bytes()));
        assert!(!is_textual(Some(&headers), &[0x89, 0x50, 0x4E, 0x47]));
    }

    #[test]
    fn no_content_type_inspects_bytes() {
        assert!(is_textual(None, "日本語のテキスト".as_bytes()));
        assert!(!is_textual(None, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]));
    }

    #[test]
    fn utf8_validation_rejects_malformed_sequences() {
        assert!(is_valid_utf8(&[0xEF, 0xBB, 0xBF, b'h', b'i']));
        assert!(is_valid_utf8("€".as_bytes()));
        // truncated three-byte sequence
        assert!(!is_valid_utf8(&[0xE2, 0x82]));
        // bad continuation byte
        assert!(!is_valid_utf8(&[0xE2, 0x28, 0xA1]));
        // lone continuation byte
        assert!(!is_valid_utf8(&[0x80]));
        // overlong encoding of '/'
        assert!(!is_valid_utf8(&[0xC0, 0xAF]));
    }
}
