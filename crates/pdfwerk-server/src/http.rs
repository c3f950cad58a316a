// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal HTTP/1.1 framing over raw TCP.
//
// Requests are read until the header block ends, then exactly
// `Content-Length` body bytes are read. Every response carries
// `Connection: close`; one request is served per connection.

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use pdfwerk_core::error::{PdfwerkError, Result};

/// Largest header block accepted before the request is rejected.
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Read buffer size.
const CHUNK_BYTES: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Parsed request line and headers, plus where the body starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHead {
    pub method: String,
    /// Request target with any query string removed.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub content_length: Option<usize>,
    pub body_offset: usize,
}

/// A complete request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Parse the request line and headers.
///
/// Returns `Ok(None)` while the header block is still incomplete.
pub fn parse_http_envelope(data: &[u8]) -> Result<Option<RequestHead>> {
    let Some(header_end) = find_subsequence(data, b"\r\n\r\n") else {
        return Ok(None);
    };
    let head = std::str::from_utf8(&data[..header_end])
        .map_err(|_| PdfwerkError::BadRequest("request headers are not UTF-8".into()))?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(PdfwerkError::BadRequest(format!(
            "malformed request line: {request_line:?}"
        )));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(PdfwerkError::BadRequest(format!(
            "unsupported protocol {version}"
        )));
    }

    let mut headers = Vec::new();
    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            return Err(PdfwerkError::BadRequest(format!("malformed header: {line:?}")));
        };
        headers.push((key.trim().to_string(), value.trim().to_string()));
    }

    let content_length = match find_header(&headers, "content-length") {
        Some(value) => Some(value.parse::<usize>().map_err(|_| {
            PdfwerkError::BadRequest(format!("invalid Content-Length: {value}"))
        })?),
        None => None,
    };

    let path = target.split('?').next().unwrap_or(target).to_string();

    Ok(Some(RequestHead {
        method: method.to_ascii_uppercase(),
        path,
        headers,
        content_length,
        body_offset: header_end + 4,
    }))
}

/// Read one request from `stream`, refusing bodies over `max_body_bytes`.
///
/// The size check happens on the declared `Content-Length`, before any of
/// the body is buffered.
pub async fn read_request<S>(stream: &mut S, max_body_bytes: usize) -> Result<HttpRequest>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(CHUNK_BYTES);
    let mut chunk = vec![0u8; CHUNK_BYTES];

    let head = loop {
        if let Some(head) = parse_http_envelope(&buf)? {
            break head;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Err(PdfwerkError::BadRequest("request headers too large".into()));
        }
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Err(PdfwerkError::BadRequest(
                "connection closed before headers were complete".into(),
            ));
        }
        buf.extend_from_slice(&chunk[..read]);
    };

    let content_length = head.content_length.unwrap_or(0);
    if content_length > max_body_bytes {
        return Err(PdfwerkError::PayloadTooLarge {
            limit: max_body_bytes,
        });
    }

    let total = head.body_offset + content_length;
    while buf.len() < total {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Err(PdfwerkError::BadRequest(format!(
                "body truncated: expected {content_length} bytes, got {}",
                buf.len() - head.body_offset
            )));
        }
        buf.extend_from_slice(&chunk[..read]);
    }
    buf.truncate(total);
    let body = buf.split_off(head.body_offset);

    Ok(HttpRequest {
        method: head.method,
        path: head.path,
        headers: head.headers,
        body,
    })
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl HttpResponse {
    pub fn new(status: u16, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".into(), content_type.into())],
            body,
        }
    }

    /// JSON body from any serialisable value.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, "application/json", body),
            Err(err) => Self::error(500, &format!("failed to encode response: {err}")),
        }
    }

    /// `{"error": message}` with the given status.
    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::to_vec(&ErrorBody { error: message })
            .unwrap_or_else(|_| br#"{"error":"internal error"}"#.to_vec());
        Self::new(status, "application/json", body)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Canonical reason phrase for the statuses this server emits.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Write a complete response and flush.
pub async fn send_response<S>(stream: &mut S, response: &HttpResponse) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status,
        reason_phrase(response.status)
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\n\
         Date: {}\r\n\
         Connection: close\r\n\
         \r\n",
        response.body.len(),
        chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT")
    ));

    stream
        .write_all(head.as_bytes())
        .await
        .map_err(|e| PdfwerkError::Server(format!("write HTTP headers: {e}")))?;
    stream
        .write_all(&response.body)
        .await
        .map_err(|e| PdfwerkError::Server(format!("write HTTP body: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| PdfwerkError::Server(format!("flush: {e}")))?;
    Ok(())
}

/// Find the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
