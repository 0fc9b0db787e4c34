use crate::models::{Header, Request};

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

pub fn format_bytes(count: u64) -> String {
    if count > MB {
        format!("{:.1} MB", count as f64 / MB as f64)
    } else if count > KB {
        format!("{:.1} kB", count as f64 / KB as f64)
    } else {
        format!("{} B", count)
    }
}

pub fn format_duration(duration_ms: i64) -> String {
    format!("{}ms", duration_ms)
}

fn header_lines(headers: &[Header]) -> String {
    headers
        .iter()
        .map(|h| format!("{}: {}", h.key, h.value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plain-text dump of a request and its response, used for "copy row".
///
/// Bodies are only included when they decoded as text.
pub fn format_request_as_text(request: &Request) -> String {
    if request.url.is_empty() {
        return "<empty request>".to_string();
    }

    let mut text = format!(
        "# HTTP request for {} (ID: {})\n## Request\nHTTP {} {}\n{}",
        request.domain,
        request.id,
        request.method,
        request.url,
        header_lines(&request.request_headers)
    );
    if let Some(body) = request.request_data.as_ref().and_then(|b| b.as_text()) {
        if !body.is_empty() {
            text.push_str("\n\n");
            text.push_str(body);
        }
    }
    if let Some(status) = request.status {
        text.push_str(&format!(
            "\n\n## Response\nHTTP {} {}\n{}",
            status,
            request.reason.as_deref().unwrap_or_default(),
            header_lines(request.response_headers.as_deref().unwrap_or_default())
        ));
    }
    if let Some(body) = request.response_data.as_ref().and_then(|b| b.as_text()) {
        if !body.is_empty() {
            text.push_str("\n\n");
            text.push_str(body);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestInfo, ResponseInfo};

    #[test]
    fn byte_sizes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1024), "1024 B");
        assert_eq!(format_bytes(1536), "1.5 kB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(42), "42ms");
    }

    #[test]
    fn request_with_response_as_text() {
        let request = Request::from_request_info(
            &RequestInfo {
                id: "7".into(),
                timestamp: 0,
                method: "POST".into(),
                url: Some("https://example.com/api".into()),
                headers: vec![Header::new("Accept", "*/*")],
                data: Some("YT0x".into()),
            },
            &[],
        );
        assert_eq!(
            format_request_as_text(&request),
            "# HTTP request for example.com/api (ID: 7)\n## Request\nHTTP POST https://example.com/api\nAccept: */*\n\na=1"
        );

        let merged = request.with_response(
            &ResponseInfo {
                id: "7".into(),
                timestamp: 3,
                status: 200,
                reason: "OK".into(),
                headers: vec![Header::new("Content-Type", "text/plain")],
                data: Some("b2s=".into()),
                is_mock: false,
                insights: None,
                total_chunks: None,
                index: None,
            },
            &[],
        );
        let text = format_request_as_text(&merged);
        assert!(text.ends_with("\n\n## Response\nHTTP 200 OK\nContent-Type: text/plain\n\nok"));
    }

    #[test]
    fn request_without_url() {
        let request = Request::from_request_info(
            &RequestInfo {
                id: "1".into(),
                timestamp: 0,
                method: "GET".into(),
                url: None,
                headers: vec![],
                data: None,
            },
            &[],
        );
        assert_eq!(format_request_as_text(&request), "<empty request>");
    }
}
