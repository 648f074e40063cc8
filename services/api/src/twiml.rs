//! TwiML rendering for the inbound call webhook.

use axum::http::HeaderMap;
use std::net::IpAddr;

pub const MEDIA_STREAM_PATH: &str = "/media-stream";

/// Determines the host the telephony provider should connect back to.
///
/// `x-forwarded-host` wins over `host` so the service works behind a proxy.
/// Missing headers yield an empty host, which produces a document the provider
/// will reject.
pub fn public_host(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-host")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let host = forwarded.or_else(|| {
        headers
            .get(axum::http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    });
    host.unwrap_or_default().to_string()
}

/// Whether the provider could not possibly reach `host` from the internet.
pub fn is_local_host(host: &str) -> bool {
    let name = strip_port(host);
    if name.eq_ignore_ascii_case("localhost") || name.to_ascii_lowercase().ends_with(".localhost")
    {
        return true;
    }
    match name.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || ip.is_unspecified(),
        Err(_) => false,
    }
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [v6]:port
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// The secure WebSocket URL of the media stream endpoint on `host`.
pub fn media_stream_url(host: &str) -> String {
    let base = format!("https://{}", host);
    let ws_base = match base.strip_prefix("http") {
        Some(rest) => format!("ws{}", rest),
        None => base,
    };
    format!("{}{}", ws_base, MEDIA_STREAM_PATH)
}

/// A signaling document: greet the caller, then open a media stream back to us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwimlDocument(String);

impl TwimlDocument {
    pub fn connect_stream(greeting: &str, stream_url: &str) -> Self {
        Self(format!(
            "<Response>\n  <Say>{}</Say>\n  <Connect><Stream url=\"{}\"/></Connect>\n</Response>",
            xml_escape(greeting),
            xml_escape(stream_url)
        ))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
