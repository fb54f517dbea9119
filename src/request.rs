//! Incoming HTTP request wrapper.
//!
//! The dispatcher parses the wire; this type only exposes accessors over the
//! result. Numeric accessors are deliberately best-effort: a value that does
//! not parse yields `0`, never an error. Document-level policy, not an
//! accident — callers that need to distinguish "absent" from "zero" read the
//! string form.

use std::collections::HashMap;

use bytes::Bytes;

/// An uploaded file, already parsed out of a multipart body by the
/// dispatcher. The built-in hyper adapter does not populate these; an
/// external dispatcher that owns multipart parsing attaches them with
/// [`Request::add_file`].
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// An incoming HTTP request.
pub struct Request {
    method: String,
    path: String,
    query: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    remote_addr: String,
    files: HashMap<String, UploadedFile>,
}

impl Request {
    /// Builds a request from already-parsed parts. `target` is the request
    /// target with an optional query string (`/users/42?page=2`);
    /// `remote_addr` is the transport-level peer in `host:port` form.
    pub fn new(
        method: impl Into<String>,
        target: &str,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        remote_addr: impl Into<String>,
    ) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_owned(), q.to_owned()),
            None => (target.to_owned(), String::new()),
        };
        Self {
            method: method.into(),
            path,
            query,
            headers,
            body,
            remote_addr: remote_addr.into(),
            files: HashMap::new(),
        }
    }

    /// Attaches a parsed multipart file under its form field name.
    pub fn add_file(&mut self, field: impl Into<String>, file: UploadedFile) {
        self.files.insert(field.into(), file);
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    // ── Query string ──────────────────────────────────────────────────────────

    /// Returns the first query parameter with the given name, or `""`.
    pub fn query(&self, name: &str) -> String {
        url::form_urlencoded::parse(self.query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    /// Returns every query parameter with the given name.
    pub fn query_strings(&self, name: &str) -> Vec<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    /// HTML-escaped query result.
    pub fn query_escape(&self, name: &str) -> String {
        html_escape(&self.query(name))
    }

    /// Query result coerced to `i32`; `0` when absent or non-numeric.
    pub fn query_i32(&self, name: &str) -> i32 {
        parse_or_zero(&self.query(name))
    }

    /// Query result coerced to `i64`; `0` when absent or non-numeric.
    pub fn query_i64(&self, name: &str) -> i64 {
        parse_or_zero(&self.query(name))
    }

    // ── Form body ─────────────────────────────────────────────────────────────

    /// Returns the first urlencoded form field with the given name, or `""`.
    /// Only consults the body when the request carries an
    /// `application/x-www-form-urlencoded` content type.
    pub fn form_value(&self, name: &str) -> String {
        let is_form = self
            .header("content-type")
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if !is_form {
            return String::new();
        }
        url::form_urlencoded::parse(&self.body)
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    /// Returns the uploaded file for a form field, if the dispatcher parsed
    /// one out of the request body.
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.get(field)
    }

    // ── Client address ────────────────────────────────────────────────────────

    /// Resolves the client address with fixed precedence: the `X-Real-IP`
    /// header, else `X-Forwarded-For`, else the transport-level peer address
    /// with any trailing `:port` stripped. Only the first matching source is
    /// consulted — no aggregation across proxy hops.
    pub fn remote_addr(&self) -> String {
        if let Some(addr) = self.header("x-real-ip") {
            if !addr.is_empty() {
                return addr.to_owned();
            }
        }
        if let Some(addr) = self.header("x-forwarded-for") {
            if !addr.is_empty() {
                return addr.to_owned();
            }
        }
        match self.remote_addr.rfind(':') {
            Some(i) => self.remote_addr[..i].to_owned(),
            None => self.remote_addr.clone(),
        }
    }
}

/// Best-effort numeric coercion: parse failure yields the zero value.
pub(crate) fn parse_or_zero<T: std::str::FromStr + Default>(s: &str) -> T {
    s.trim().parse().unwrap_or_default()
}

/// Minimal HTML escaping for the `*_escape` accessors: `&`, `<`, `>`, `"`, `'`.
pub(crate) fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(headers: Vec<(String, String)>, peer: &str) -> Request {
        Request::new("GET", "/", headers, Vec::new(), peer)
    }

    fn h(name: &str, value: &str) -> (String, String) {
        (name.to_owned(), value.to_owned())
    }

    #[test]
    fn remote_addr_prefers_x_real_ip() {
        let r = req(
            vec![h("X-Real-IP", "1.2.3.4"), h("X-Forwarded-For", "5.6.7.8")],
            "9.9.9.9:54321",
        );
        assert_eq!(r.remote_addr(), "1.2.3.4");
    }

    #[test]
    fn remote_addr_falls_back_to_forwarded_for() {
        let r = req(vec![h("X-Forwarded-For", "5.6.7.8")], "9.9.9.9:54321");
        assert_eq!(r.remote_addr(), "5.6.7.8");
    }

    #[test]
    fn remote_addr_strips_port_from_peer() {
        let r = req(vec![], "9.9.9.9:54321");
        assert_eq!(r.remote_addr(), "9.9.9.9");

        // IPv6 peers only lose the port, not the address colons.
        let r = req(vec![], "[::1]:8080");
        assert_eq!(r.remote_addr(), "[::1]");
    }

    #[test]
    fn query_accessors() {
        let r = Request::new("GET", "/search?q=rust&tag=a&tag=b&n=7", vec![], Vec::new(), "p:1");
        assert_eq!(r.query("q"), "rust");
        assert_eq!(r.query("missing"), "");
        assert_eq!(r.query_strings("tag"), vec!["a", "b"]);
        assert_eq!(r.query_i32("n"), 7);
        assert_eq!(r.query_i64("n"), 7);
    }

    #[test]
    fn numeric_coercion_fails_closed() {
        let r = Request::new("GET", "/?n=abc", vec![], Vec::new(), "p:1");
        assert_eq!(r.query_i32("n"), 0);
        assert_eq!(r.query_i64("n"), 0);
        assert_eq!(r.query_i64("absent"), 0);
    }

    #[test]
    fn form_value_requires_urlencoded_content_type() {
        let body = b"name=alice&age=30".to_vec();
        let r = Request::new(
            "POST",
            "/users",
            vec![h("Content-Type", "application/x-www-form-urlencoded")],
            body.clone(),
            "p:1",
        );
        assert_eq!(r.form_value("name"), "alice");
        assert_eq!(r.form_value("age"), "30");

        let r = Request::new("POST", "/users", vec![h("Content-Type", "application/json")], body, "p:1");
        assert_eq!(r.form_value("name"), "");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let r = req(vec![h("X-Request-Id", "abc")], "p:1");
        assert_eq!(r.header("x-request-id"), Some("abc"));
        assert_eq!(r.header("X-REQUEST-ID"), Some("abc"));
    }

    #[test]
    fn escaping_covers_html_metacharacters() {
        let r = Request::new("GET", "/?q=%3Cb%3E%26%22x%22", vec![], Vec::new(), "p:1");
        assert_eq!(r.query_escape("q"), "&lt;b&gt;&amp;&#34;x&#34;");
    }

    #[test]
    fn uploaded_file_accessor() {
        let mut r = req(vec![], "p:1");
        assert!(r.file("avatar").is_none());
        r.add_file("avatar", UploadedFile {
            filename: "me.png".into(),
            content_type: "image/png".into(),
            data: Bytes::from_static(b"\x89PNG"),
        });
        let f = r.file("avatar").unwrap();
        assert_eq!(f.filename, "me.png");
        assert_eq!(&f.data[..], b"\x89PNG");
    }
}
