//! Engine request encoding and socket access.
//!
//! # Responsibilities
//! - Encode HTTP/1.1 requests for the container engine API
//! - Open the engine's unix socket
//!
//! # Design Decisions
//! - Requests always send `Connection: close`, so an identity body without
//!   a length ends with the connection
//! - `hijack()` only records that the response body is multiplexed output;
//!   the framer is configured from it, the wire request is unchanged

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Default location of the engine API socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

/// A single request to the engine API.
#[derive(Debug, Clone)]
pub struct DockerRequest {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    hijacked: bool,
}

impl DockerRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: None,
            hijacked: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body; sets `Content-Type` and `Content-Length` on encode.
    pub fn json_body<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Mark the response body as multiplexed stdout/stderr frames.
    pub fn hijack(mut self) -> Self {
        self.hijacked = true;
        self
    }

    pub fn is_hijacked(&self) -> bool {
        self.hijacked
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut head = format!("{} {} HTTP/1.1\r\nHost: docker\r\n", self.method, self.path);
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        if let Some(body) = &self.body {
            if !self.has_header("content-type") {
                head.push_str("Content-Type: application/json\r\n");
            }
            head.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        if !self.has_header("connection") {
            head.push_str("Connection: close\r\n");
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        if let Some(body) = &self.body {
            bytes.extend_from_slice(body);
        }
        bytes
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// Write `request` to the engine connection and flush it.
pub async fn send_request<W>(stream: &mut W, request: &DockerRequest) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(&request.encode()).await?;
    stream.flush().await?;
    tracing::debug!(method = %request.method, path = %request.path, hijacked = request.hijacked, "Request sent");
    Ok(())
}

/// Open the engine API socket.
#[cfg(unix)]
pub async fn connect_unix(path: impl AsRef<std::path::Path>) -> std::io::Result<tokio::net::UnixStream> {
    let path = path.as_ref();
    let stream = tokio::net::UnixStream::connect(path).await?;
    tracing::debug!(socket = %path.display(), "Connected to engine");
    Ok(stream)
}
