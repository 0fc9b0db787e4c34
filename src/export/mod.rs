//! Text renderings of captured requests

mod curl;
mod text;

pub use curl::convert_request_to_curl_command;
pub use text::{format_bytes, format_duration, format_request_as_text};
