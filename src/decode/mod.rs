//! Body decoding
//!
//! Bodies arrive base64 encoded, possibly gzip or brotli compressed. Decoding
//! never fails loudly: problems are logged and the body is dropped.

mod textual;

pub use textual::{is_textual, is_valid_utf8};

use base64::alphabet;
use base64::engine::general_purpose::{self, GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;
use thiserror::Error;

use crate::models::{DecodedBody, Header, ResponseInfo};

/// Clients are not consistent about padding, so accept both forms.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("inflate failed: {0}")]
    Inflate(#[source] std::io::Error),
    #[error("brotli decompression failed: {0}")]
    Brotli(#[source] std::io::Error),
}

/// Supported `Content-Encoding` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Gzip,
    Brotli,
    Identity,
}

impl ContentEncoding {
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("gzip") => ContentEncoding::Gzip,
            Some("br") => ContentEncoding::Brotli,
            _ => ContentEncoding::Identity,
        }
    }
}

/// Case-insensitive header lookup; the first match wins.
pub fn get_header_value<'a>(headers: &'a [Header], key: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header.key.eq_ignore_ascii_case(key))
        .map(|header| header.value.as_str())
}

/// Decode a base64 string, tolerating whitespace, missing padding and the
/// URL-safe alphabet.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    let cleaned: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    Ok(LENIENT_BASE64.decode(cleaned)?)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decoded size of a base64 payload, without decoding it
pub fn base64_byte_length(data: &str) -> u64 {
    let bytes = data.as_bytes();
    let mut len = bytes.len();
    if len > 0 && bytes[len - 1] == b'=' {
        len -= 1;
    }
    if len > 1 && bytes[len - 1] == b'=' {
        len -= 1;
    }
    (len as u64 * 3) >> 2
}

/// Size of a response: the declared `Content-Length` when usable, otherwise
/// the decoded size of the raw payload.
pub fn response_length(response: &ResponseInfo) -> u64 {
    get_header_value(&response.headers, "content-length")
        .and_then(parse_leading_integer)
        .or_else(|| {
            response
                .data
                .as_deref()
                .filter(|data| !data.is_empty())
                .map(base64_byte_length)
        })
        .unwrap_or(0)
}

fn parse_leading_integer(value: &str) -> Option<u64> {
    let trimmed = value.trim_start();
    let digits: &str = &trimmed[..trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len())];
    digits.parse().ok()
}

/// Decode a raw body into text or bytes.
///
/// Returns `None` for empty input and for payloads that cannot be decoded.
pub fn decode_body(headers: Option<&[Header]>, data: Option<&str>) -> Option<DecodedBody> {
    let data = data.filter(|data| !data.is_empty())?;
    let headers = headers.unwrap_or_default();
    match try_decode_body(headers, data) {
        Ok(body) => Some(body),
        Err(err) => {
            tracing::warn!(
                "Failed to decode request/response body (size: {}): {}",
                data.len(),
                err
            );
            None
        }
    }
}

fn try_decode_body(headers: &[Header], data: &str) -> Result<DecodedBody, DecodeError> {
    let bytes = decode_base64(data)?;

    match ContentEncoding::from_header(get_header_value(headers, "Content-Encoding")) {
        ContentEncoding::Gzip => {
            // Some platforms report gzip for bodies they already inflated.
            if let Some(inflated) = inflate(&bytes)? {
                return Ok(bytes_to_body(headers, inflated));
            }
            tracing::debug!("gzip body has no deflate header, treating as plain");
        }
        ContentEncoding::Brotli => {
            let decompressed = decompress_brotli(&bytes)?;
            return Ok(DecodedBody::Text(
                String::from_utf8_lossy(&decompressed).into_owned(),
            ));
        }
        ContentEncoding::Identity => {}
    }

    Ok(bytes_to_body(headers, bytes))
}

fn bytes_to_body(headers: &[Header], bytes: Vec<u8>) -> DecodedBody {
    if is_textual(Some(headers), &bytes) {
        let text = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
        DecodedBody::Text(String::from_utf8_lossy(text).into_owned())
    } else {
        DecodedBody::Binary(bytes)
    }
}

/// Inflate a gzip or zlib stream. `Ok(None)` means the payload does not start
/// with either header.
fn inflate(data: &[u8]) -> Result<Option<Vec<u8>>, DecodeError> {
    let mut inflated = Vec::new();
    if data.starts_with(&[0x1f, 0x8b]) {
        GzDecoder::new(data)
            .read_to_end(&mut inflated)
            .map_err(DecodeError::Inflate)?;
    } else if has_zlib_header(data) {
        ZlibDecoder::new(data)
            .read_to_end(&mut inflated)
            .map_err(DecodeError::Inflate)?;
    } else {
        return Ok(None);
    }
    Ok(Some(inflated))
}

fn has_zlib_header(data: &[u8]) -> bool {
    match data {
        [cmf, flg, ..] => {
            cmf & 0x0f == 8 && cmf >> 4 <= 7 && ((*cmf as u16) << 8 | *flg as u16) % 31 == 0
        }
        _ => false,
    }
}

fn decompress_brotli(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decompressed = Vec::new();
    brotli::BrotliDecompress(&mut std::io::Cursor::new(data), &mut decompressed)
        .map_err(DecodeError::Brotli)?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];

    fn headers(pairs: &[(&str, &str)]) -> Vec<Header> {
        pairs.iter().map(|(k, v)| Header::new(*k, *v)).collect()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn brotli(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
            writer.write_all(data).unwrap();
        }
        out
    }

    #[test]
    fn header_lookup_is_case_insensitive_first_match() {
        let hs = headers(&[("content-type", "text/plain"), ("Content-Type", "image/png")]);
        assert_eq!(get_header_value(&hs, "CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(get_header_value(&hs, "missing"), None);
    }

    #[test]
    fn empty_or_missing_data_yields_none() {
        assert_eq!(decode_body(None, None), None);
        assert_eq!(decode_body(None, Some("")), None);
    }

    #[test]
    fn plain_text_is_decoded() {
        let hs = headers(&[("Content-Type", "text/plain")]);
        assert_eq!(
            decode_body(Some(&hs), Some("aGVsbG8=")),
            Some(DecodedBody::Text("hello".into()))
        );
    }

    #[test]
    fn base64_tolerates_whitespace_and_missing_padding() {
        assert_eq!(decode_base64("aGVs\nbG8").unwrap(), b"hello");
    }

    #[test]
    fn gzip_round_trip() {
        let plaintext = "Zoë ate crème brûlée, 日本語 too";
        let encoded = encode_base64(&gzip(plaintext.as_bytes()));
        let hs = headers(&[("Content-Encoding", "gzip"), ("Content-Type", "text/plain")]);
        assert_eq!(
            decode_body(Some(&hs), Some(&encoded)),
            Some(DecodedBody::Text(plaintext.into()))
        );
    }

    #[test]
    fn gzip_without_content_type_sniffs_inflated_bytes() {
        let encoded = encode_base64(&gzip(b"hello plain text"));
        let hs = headers(&[("Content-Encoding", "gzip")]);
        assert_eq!(
            decode_body(Some(&hs), Some(&encoded)),
            Some(DecodedBody::Text("hello plain text".into()))
        );

        let encoded = encode_base64(&gzip(PNG_SIGNATURE));
        assert_eq!(
            decode_body(Some(&hs), Some(&encoded)),
            Some(DecodedBody::Binary(PNG_SIGNATURE.to_vec()))
        );
    }

    #[test]
    fn gzip_text_has_bom_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"hi");
        let encoded = encode_base64(&gzip(&bytes));
        let hs = headers(&[("Content-Encoding", "gzip"), ("Content-Type", "text/plain")]);
        assert_eq!(
            decode_body(Some(&hs), Some(&encoded)),
            Some(DecodedBody::Text("hi".into()))
        );
    }

    #[test]
    fn zlib_stream_is_inflated() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"{\"ok\":true}").unwrap();
        let encoded = encode_base64(&encoder.finish().unwrap());
        let hs = headers(&[("Content-Encoding", "gzip"), ("Content-Type", "application/json")]);
        assert_eq!(
            decode_body(Some(&hs), Some(&encoded)),
            Some(DecodedBody::Text("{\"ok\":true}".into()))
        );
    }

    #[test]
    fn mislabelled_gzip_falls_through_to_plain_decoding() {
        let encoded = encode_base64(b"already inflated");
        let hs = headers(&[("Content-Encoding", "gzip"), ("Content-Type", "text/plain")]);
        assert_eq!(
            decode_body(Some(&hs), Some(&encoded)),
            Some(DecodedBody::Text("already inflated".into()))
        );
    }

    #[test]
    fn corrupted_gzip_is_dropped() {
        let mut corrupted = gzip(b"some payload that will be damaged");
        let len = corrupted.len();
        corrupted.truncate(len / 2);
        let encoded = encode_base64(&corrupted);
        let hs = headers(&[("Content-Encoding", "gzip"), ("Content-Type", "text/plain")]);
        assert_eq!(decode_body(Some(&hs), Some(&encoded)), None);
    }

    #[test]
    fn brotli_is_always_text() {
        let encoded = encode_base64(&brotli(b"brotli body"));
        let hs = headers(&[("Content-Encoding", "br")]);
        assert_eq!(
            decode_body(Some(&hs), Some(&encoded)),
            Some(DecodedBody::Text("brotli body".into()))
        );
    }

    #[test]
    fn invalid_base64_is_dropped() {
        assert_eq!(decode_body(None, Some("!!not base64!!")), None);
    }

    #[test]
    fn png_without_content_type_is_binary() {
        let encoded = encode_base64(PNG_SIGNATURE);
        assert_eq!(
            decode_body(None, Some(&encoded)),
            Some(DecodedBody::Binary(PNG_SIGNATURE.to_vec()))
        );
    }

    #[test]
    fn bom_is_stripped_from_text() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("héllo".as_bytes());
        let encoded = encode_base64(&bytes);
        assert_eq!(
            decode_body(None, Some(&encoded)),
            Some(DecodedBody::Text("héllo".into()))
        );
    }

    #[test]
    fn base64_byte_length_accounts_for_padding() {
        assert_eq!(base64_byte_length("aGVsbG8="), 5);
        assert_eq!(base64_byte_length("aGVsbA=="), 4);
        assert_eq!(base64_byte_length("aGVs"), 3);
        assert_eq!(base64_byte_length(""), 0);
    }

    #[test]
    fn response_length_prefers_content_length() {
        let mut response = ResponseInfo {
            id: "1".into(),
            timestamp: 0,
            status: 200,
            reason: String::new(),
            headers: headers(&[("Content-Length", "1234")]),
            data: Some("aGVsbG8=".into()),
            is_mock: false,
            insights: None,
            total_chunks: None,
            index: None,
        };
        assert_eq!(response_length(&response), 1234);

        response.headers = headers(&[("Content-Length", "unknown")]);
        assert_eq!(response_length(&response), 5);

        response.data = None;
        assert_eq!(response_length(&response), 0);
    }
}
