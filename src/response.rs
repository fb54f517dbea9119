//! Outgoing response state and the conversion to the hyper boundary.
//!
//! A [`ResponseWriter`] accumulates status, headers, and body for one
//! request. The single bit the chain driver cares about is [`written`]
//! (`ResponseWriter::written`): once any writer method commits output, the
//! driver stops invoking handlers. Staging a status or adding headers does
//! not commit; writing a body (or an explicitly bodiless head) does.

use bytes::Bytes;
use http_body_util::Full;

use crate::status::Status;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseWriter::bytes`].
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    FormData,     // application/x-www-form-urlencoded
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    MsgPack,      // application/msgpack
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::FormData    => "application/x-www-form-urlencoded",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::MsgPack     => "application/msgpack",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// The response side of one request.
///
/// ```rust
/// use cauce::{ResponseWriter, Status};
///
/// let mut resp = ResponseWriter::new();
/// resp.set_status(Status::Created);
/// resp.add_header("location", "/users/42");
/// resp.json(br#"{"id":42}"#.to_vec());
/// assert!(resp.written());
/// ```
pub struct ResponseWriter {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    written: bool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: Status::Ok.as_u16(),
            headers: Vec::new(),
            body: Vec::new(),
            written: false,
        }
    }

    /// Whether the response has been committed. Pure query; the chain driver
    /// uses it to short-circuit.
    pub fn written(&self) -> bool {
        self.written
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Stages a status code without committing the response.
    pub fn set_status(&mut self, code: Status) {
        self.status = code.as_u16();
    }

    /// Appends a header entry. Duplicate names are kept (`set-cookie` needs
    /// this).
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    /// Replaces every header entry with this name, then adds the new value.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.add_header(name, value);
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    // ── Committing writers ────────────────────────────────────────────────────

    /// Commits the staged status with no body.
    pub fn write_head(&mut self, code: Status) {
        self.status = code.as_u16();
        self.written = true;
    }

    /// Appends raw bytes to the body and commits.
    pub fn write(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
        self.written = true;
    }

    /// Commits a `text/plain; charset=utf-8` body.
    pub fn text(&mut self, body: impl Into<String>) {
        self.finish(ContentType::Text, body.into().into_bytes());
    }

    /// Commits an `application/json` body. Pass bytes from your serialiser
    /// directly — cauce does not touch them.
    pub fn json(&mut self, body: Vec<u8>) {
        self.finish(ContentType::Json, body);
    }

    /// Commits a `text/html; charset=utf-8` body.
    pub fn html(&mut self, body: impl Into<String>) {
        self.finish(ContentType::Html, body.into().into_bytes());
    }

    /// Commits a typed body. Use this for XML, binary, SSE, etc.
    pub fn bytes(&mut self, content_type: ContentType, body: Vec<u8>) {
        self.finish(content_type, body);
    }

    /// Commits a redirect to `location`; `302 Found` when no status is given.
    pub fn redirect(&mut self, location: &str, code: Option<Status>) {
        self.set_header("location", location);
        self.write_head(code.unwrap_or(Status::Found));
    }

    /// Commits raw content with the fixed non-caching header set.
    pub fn serve_content(&mut self, content: &[u8]) {
        self.set_header("content-description", "Raw content");
        self.set_header("content-type", "text/plain");
        self.set_header("expires", "0");
        self.set_header("cache-control", "must-revalidate");
        self.set_header("pragma", "public");
        self.write(content);
    }

    /// Commits a file download: attachment disposition under `name`, binary
    /// transfer encoding, and the same non-caching header set.
    pub fn serve_download(&mut self, name: &str, content: &[u8]) {
        self.set_header("content-description", "File Transfer");
        self.set_header("content-type", "application/octet-stream");
        self.set_header("content-disposition", &format!("attachment; filename={name}"));
        self.set_header("content-transfer-encoding", "binary");
        self.set_header("expires", "0");
        self.set_header("cache-control", "must-revalidate");
        self.set_header("pragma", "public");
        self.write(content);
    }

    fn finish(&mut self, content_type: ContentType, body: Vec<u8>) {
        self.set_header("content-type", content_type.as_str());
        self.body.extend_from_slice(&body);
        self.written = true;
    }

    /// Converts the accumulated state into a hyper-compatible response.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match builder.body(Full::new(Bytes::from(self.body))) {
            Ok(resp) => resp,
            Err(e) => {
                // A handler smuggled an invalid header name/value through.
                tracing::error!("invalid response metadata: {e}");
                let mut resp = http::Response::new(Full::new(Bytes::new()));
                *resp.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                resp
            }
        }
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_does_not_commit() {
        let mut resp = ResponseWriter::new();
        resp.set_status(Status::Created);
        resp.add_header("x-trace", "abc");
        assert!(!resp.written());

        resp.json(b"{}".to_vec());
        assert!(resp.written());
        assert_eq!(resp.status(), 201);
    }

    #[test]
    fn write_head_commits_without_body() {
        let mut resp = ResponseWriter::new();
        resp.write_head(Status::NoContent);
        assert!(resp.written());
        assert_eq!(resp.status(), 204);
        assert!(resp.body().is_empty());
    }

    #[test]
    fn redirect_defaults_to_found() {
        let mut resp = ResponseWriter::new();
        resp.redirect("/login", None);
        assert_eq!(resp.status(), 302);
        assert!(resp.written());
        assert!(resp.headers().iter().any(|(k, v)| k == "location" && v == "/login"));
    }

    #[test]
    fn set_header_replaces_add_header_keeps() {
        let mut resp = ResponseWriter::new();
        resp.add_header("set-cookie", "a=1");
        resp.add_header("set-cookie", "b=2");
        assert_eq!(resp.headers().len(), 2);

        resp.set_header("Set-Cookie", "c=3");
        let cookies: Vec<_> = resp.headers().iter().filter(|(k, _)| k == "set-cookie").collect();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].1, "c=3");
    }

    #[test]
    fn serve_content_sets_fixed_headers() {
        let mut resp = ResponseWriter::new();
        resp.serve_content(b"hello");
        let find = |name: &str| {
            resp.headers().iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
        };
        assert_eq!(find("content-description"), Some("Raw content"));
        assert_eq!(find("content-type"), Some("text/plain"));
        assert_eq!(find("expires"), Some("0"));
        assert_eq!(find("cache-control"), Some("must-revalidate"));
        assert_eq!(find("pragma"), Some("public"));
        assert_eq!(resp.body(), b"hello");
    }

    #[test]
    fn serve_download_sets_attachment_headers() {
        let mut resp = ResponseWriter::new();
        resp.serve_download("report.pdf", b"%PDF");
        let find = |name: &str| {
            resp.headers().iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
        };
        assert_eq!(find("content-description"), Some("File Transfer"));
        assert_eq!(find("content-type"), Some("application/octet-stream"));
        assert_eq!(find("content-disposition"), Some("attachment; filename=report.pdf"));
        assert_eq!(find("content-transfer-encoding"), Some("binary"));
    }
}
