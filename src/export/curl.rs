use crate::models::Request;

/// Render a request as a copy-pasteable curl command.
///
/// Every interpolated value is shell-quoted; values containing a quote,
/// `!` or control characters use the ANSI-C `$'...'` form.
pub fn convert_request_to_curl_command(request: &Request) -> String {
    let mut command = format!(
        "curl -v -X {} {}",
        request.method,
        escaped_string(&request.url)
    );
    for header in &request.request_headers {
        command.push_str(" -H ");
        command.push_str(&escaped_string(&format!("{}: {}", header.key, header.value)));
    }
    let body = request
        .request_data
        .as_ref()
        .and_then(|body| body.as_text())
        .filter(|text| !text.is_empty());
    if let Some(body) = body {
        command.push_str(" -d ");
        command.push_str(&escaped_string(body));
    }
    command
}

fn needs_ansi_c_quoting(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}'..='\u{9f}' | '!' | '\'')
}

fn escaped_string(value: &str) -> String {
    if !value.chars().any(needs_ansi_c_quoting) {
        return format!("'{}'", value);
    }
    let mut escaped = String::with_capacity(value.len() + 3);
    escaped.push_str("$'");
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\u{0}'..='\u{1f}' | '\u{7f}'..='\u{9f}' | '!' => {
                escaped.push_str(&format!("\\u{:02x}", c as u32));
            }
            _ => escaped.push(c),
        }
    }
    escaped.push('\'');
    escaped
}
