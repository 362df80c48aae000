//! HTTP/1.x request decoder and response encoder.
//!
//! Wire format handled (one request per connection):
//! ```text
//! ┌──────────────────────────┬───────────────┬───────┬─────────────────┐
//! │ METHOD SP PATH SP HTTP/1.x│ headers CRLF… │ CRLF  │ body (N bytes)  │
//! └──────────────────────────┴───────────────┴───────┴─────────────────┘
//!                             N = Content-Length (0 when absent)
//! ```
//!
//! The decoder accumulates bytes from the transport and yields the request
//! once the head and the full body have arrived. A single read may carry
//! part of the request line, part of the body, or everything at once.

use core::fmt;

use heapless::Vec as HVec;
use log::debug;

use crate::error::DriveError;

/// Upper bound on head + body.
pub const MAX_REQUEST_SIZE: usize = 8 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

// ───────────────────────────────────────────────────────────────
// Error type
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Request line or headers could not be parsed.
    Malformed,
    /// Head plus declared body exceed [`MAX_REQUEST_SIZE`].
    TooLarge,
    /// Chunked or otherwise encoded bodies are not accepted.
    UnsupportedEncoding,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed HTTP request"),
            Self::TooLarge => write!(f, "request exceeds {} bytes", MAX_REQUEST_SIZE),
            Self::UnsupportedEncoding => write!(f, "unsupported transfer encoding"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Request
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Other(String),
}

impl Method {
    fn parse(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            other => Self::Other(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub body: Vec<u8>,
}

// ───────────────────────────────────────────────────────────────
// Decoder
// ───────────────────────────────────────────────────────────────

enum DecoderState {
    /// Waiting for the blank line that ends the headers.
    ReadingHead,
    /// Head parsed; the body spans `head_len..total`.
    ReadingBody {
        method: Method,
        path: String,
        head_len: usize,
        total: usize,
    },
    /// A request was produced; further bytes are ignored.
    Done,
}

/// Streaming HTTP request decoder.
pub struct RequestDecoder {
    state: DecoderState,
    buf: HVec<u8, MAX_REQUEST_SIZE>,
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingHead,
            buf: HVec::new(),
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns `Ok(Some(request))` exactly once per connection, when the
    /// head and full body are available.
    pub fn feed(&mut self, data: &[u8]) -> Result<Option<HttpRequest>, CodecError> {
        if matches!(self.state, DecoderState::Done) {
            return Ok(None);
        }
        self.buf
            .extend_from_slice(data)
            .map_err(|_| CodecError::TooLarge)?;

        if matches!(self.state, DecoderState::ReadingHead) {
            let Some(end) = find(&self.buf, HEAD_TERMINATOR) else {
                return Ok(None);
            };
            let head_len = end + HEAD_TERMINATOR.len();
            let (method, path, expected) = parse_head(&self.buf[..end])?;
            let total = head_len
                .checked_add(expected)
                .filter(|n| *n <= MAX_REQUEST_SIZE)
                .ok_or(CodecError::TooLarge)?;
            self.state = DecoderState::ReadingBody {
                method,
                path,
                head_len,
                total,
            };
        }

        if let DecoderState::ReadingBody { head_len, total, .. } = self.state {
            if self.buf.len() < total {
                return Ok(None);
            }
            let body = self.buf[head_len..total].to_vec();
            if let DecoderState::ReadingBody { method, path, .. } =
                core::mem::replace(&mut self.state, DecoderState::Done)
            {
                debug!("codec: {:?} {} ({} byte body)", method, path, body.len());
                return Ok(Some(HttpRequest { method, path, body }));
            }
        }
        Ok(None)
    }

    /// Reset decoder state (e.g. when the slot is reused).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingHead;
        self.buf.clear();
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse the request line and the headers we care about.
fn parse_head(head: &[u8]) -> Result<(Method, String, usize), CodecError> {
    let head = core::str::from_utf8(head).map_err(|_| CodecError::Malformed)?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().ok_or(CodecError::Malformed)?;
    let mut parts = request_line.split(' ');
    let (Some(method), Some(path), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CodecError::Malformed);
    };
    if method.is_empty() || !path.starts_with('/') || !version.starts_with("HTTP/1.") {
        return Err(CodecError::Malformed);
    }

    let mut content_length = 0usize;
    for line in lines {
        let (name, value) = line.split_once(':').ok_or(CodecError::Malformed)?;
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().map_err(|_| CodecError::Malformed)?;
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && !value.eq_ignore_ascii_case("identity")
        {
            return Err(CodecError::UnsupportedEncoding);
        }
    }

    Ok((Method::parse(method), path.to_owned(), content_length))
}

// ───────────────────────────────────────────────────────────────
// Reply
// ───────────────────────────────────────────────────────────────

/// Accepted request shapes, sent with every client error.
pub const USAGE: &str = "<html><body>\
<h1>rcdrive</h1>\
<p>POST a JSON document of one of these shapes:</p>\
<pre>{\"drive\": \"&lt;op&gt;\"}  optional: \"speed\": 0-10, \"duration\": seconds</pre>\
<pre>{\"drive_ops\": [[\"&lt;op&gt;\", seconds], [\"&lt;op&gt;\", speed, seconds], ...]}</pre>\
<p>op is one of idle, stop, halt, forward, backward, left, right, cw, ccw \
(any case).</p>\
</body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Send the headers only (reply to `HEAD`).
    pub head_only: bool,
}

impl HttpReply {
    /// `text/html` usage page with the given status.
    pub fn usage(status: u16) -> Self {
        Self {
            status,
            content_type: "text/html",
            body: USAGE.to_owned(),
            head_only: false,
        }
    }

    /// `{"status": 200}`
    pub fn ok() -> Self {
        Self::json(200, serde_json::json!({ "status": 200 }))
    }

    /// Reply for a command the worker could not complete.
    pub fn from_drive_error(error: DriveError) -> Self {
        let status = match error {
            e if e.is_rejection() => 400,
            DriveError::SessionClosed | DriveError::Interrupted => 503,
            _ => 500,
        };
        Self::json(
            status,
            serde_json::json!({ "status": status, "error": error.to_string() }),
        )
    }

    /// Queue full or shutting down.
    pub fn unavailable(reason: &str) -> Self {
        Self::json(503, serde_json::json!({ "status": 503, "error": reason }))
    }

    fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string(),
            head_only: false,
        }
    }

    /// Same status and headers, no body.
    pub fn without_body(self) -> Self {
        Self {
            head_only: true,
            ..self
        }
    }

    /// Serialise as a complete `Connection: close` response.
    pub fn encode(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        );
        let mut out = Vec::with_capacity(head.len() + self.body.len());
        out.extend_from_slice(head.as_bytes());
        if !self.head_only {
            out.extend_from_slice(self.body.as_bytes());
        }
        out
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
