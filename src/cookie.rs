//! Authenticated cookie envelope and cookie attribute handling.
//!
//! # Envelope format
//!
//! A signed cookie value is three pipe-delimited fields:
//!
//! ```text
//! base64url(value) | nanosecond-timestamp | hex(HMAC-SHA1(secret, payload ++ timestamp))
//! ```
//!
//! [`seal`] produces the envelope; [`open`] verifies and unwraps it. Any
//! deviation — missing cookie, wrong field count, undecodable digest,
//! signature mismatch — reports "not authenticated" (`None`), never a panic.
//! Digest comparison goes through the MAC's constant-time verification.
//!
//! The timestamp is embedded but never compared against a freshness window.
//! That is a scope boundary, not an omission: callers wanting expiry parse
//! the middle field and enforce their own window.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

// ── Signing ───────────────────────────────────────────────────────────────────

/// Wraps `value` in a signed envelope using the current time.
pub fn seal(secret: &str, value: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    seal_at(secret, value, nanos)
}

/// Wraps `value` in a signed envelope with an explicit timestamp.
pub(crate) fn seal_at(secret: &str, value: &str, timestamp_nanos: u128) -> String {
    let payload = URL_SAFE.encode(value.as_bytes());
    let timestamp = timestamp_nanos.to_string();
    let digest = hex::encode(digest(secret, &payload, &timestamp));
    format!("{payload}|{timestamp}|{digest}")
}

/// Verifies a signed envelope and returns the original value.
///
/// `None` means not authenticated: absent or malformed envelope, digest that
/// does not hex-decode, signature mismatch, or a payload that is not valid
/// UTF-8 after decoding.
pub fn open(secret: &str, sealed: &str) -> Option<String> {
    let parts: Vec<&str> = sealed.split('|').collect();
    if parts.len() != 3 {
        return None;
    }
    let (payload, timestamp, signature) = (parts[0], parts[1], parts[2]);

    let sig_bytes = hex::decode(signature).ok()?;
    let mut mac = mac(secret);
    mac.update(payload.as_bytes());
    mac.update(timestamp.as_bytes());
    // Constant-time comparison; a length mismatch is just a mismatch.
    mac.verify_slice(&sig_bytes).ok()?;

    let decoded = URL_SAFE.decode(payload.as_bytes()).ok()?;
    String::from_utf8(decoded).ok()
}

fn digest(secret: &str, payload: &str, timestamp: &str) -> Vec<u8> {
    let mut mac = mac(secret);
    mac.update(payload.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn mac(secret: &str) -> HmacSha1 {
    HmacSha1::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length")
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// The application-wide signing secret, registered as an injector binding at
/// assembly time (see [`App::cookie_secret`](crate::App::cookie_secret)).
/// Fixed once the app is built; the context's `*_secure_cookie` methods
/// resolve it per request.
#[derive(Clone)]
pub struct CookieSecret(pub Arc<str>);

impl From<&str> for CookieSecret {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for CookieSecret {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

// ── Attributes ────────────────────────────────────────────────────────────────

/// Optional `Set-Cookie` attributes with documented defaults.
///
/// ```rust
/// use cauce::CookieOptions;
///
/// let opts = CookieOptions { max_age: Some(3600), http_only: true, ..Default::default() };
/// assert_eq!(opts.path, "/");
/// ```
#[derive(Clone, Debug)]
pub struct CookieOptions {
    /// `Max-Age` in seconds; omitted when `None`.
    pub max_age: Option<i64>,
    /// Cookie path. Defaults to `/`.
    pub path: String,
    /// Cookie domain. Defaults to empty (omitted).
    pub domain: String,
    /// `Secure` attribute. Defaults to false.
    pub secure: bool,
    /// `HttpOnly` attribute. Defaults to false.
    pub http_only: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: None,
            path: "/".to_owned(),
            domain: String::new(),
            secure: false,
            http_only: false,
        }
    }
}

/// Composes the `Set-Cookie` header value for `name=value` plus attributes.
/// The caller guarantees `name` and `value` are cookie-safe; sealed values
/// always are (base64, digits, hex, pipes).
pub(crate) fn set_cookie_value(name: &str, value: &str, opts: &CookieOptions) -> String {
    let mut out = format!("{name}={value}");
    if let Some(age) = opts.max_age {
        out.push_str("; Max-Age=");
        out.push_str(&age.to_string());
    }
    if !opts.path.is_empty() {
        out.push_str("; Path=");
        out.push_str(&opts.path);
    }
    if !opts.domain.is_empty() {
        out.push_str("; Domain=");
        out.push_str(&opts.domain);
    }
    if opts.secure {
        out.push_str("; Secure");
    }
    if opts.http_only {
        out.push_str("; HttpOnly");
    }
    out
}

/// Finds `name` in a request `Cookie` header value.
pub(crate) fn find_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a-signing-secret";

    #[test]
    fn round_trip() {
        let sealed = seal(SECRET, "user:42");
        assert_eq!(open(SECRET, &sealed), Some("user:42".to_owned()));
    }

    #[test]
    fn round_trip_empty_value() {
        let sealed = seal(SECRET, "");
        assert_eq!(open(SECRET, &sealed), Some(String::new()));
    }

    #[test]
    fn envelope_has_three_fields_and_fixed_timestamp() {
        let sealed = seal_at(SECRET, "v", 1_234_567_890);
        let parts: Vec<&str> = sealed.split('|').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], "1234567890");
        assert_eq!(open(SECRET, &sealed), Some("v".to_owned()));
    }

    fn corrupt_field(sealed: &str, field: usize) -> String {
        let mut parts: Vec<String> = sealed.split('|').map(str::to_owned).collect();
        // Swap the leading character for a different one from the same
        // alphabet, keeping the field pipe-free.
        let first = parts[field].remove(0);
        parts[field].insert(0, if first == '0' { '1' } else { '0' });
        parts.join("|")
    }

    #[test]
    fn tampered_payload_fails() {
        let sealed = seal(SECRET, "payload-under-test");
        assert_eq!(open(SECRET, &corrupt_field(&sealed, 0)), None);
    }

    #[test]
    fn tampered_timestamp_fails() {
        let sealed = seal(SECRET, "payload-under-test");
        assert_eq!(open(SECRET, &corrupt_field(&sealed, 1)), None);
    }

    #[test]
    fn tampered_signature_fails() {
        let sealed = seal(SECRET, "payload-under-test");
        assert_eq!(open(SECRET, &corrupt_field(&sealed, 2)), None);
    }

    #[test]
    fn mismatched_secret_fails() {
        let sealed = seal("secret-a", "v");
        assert_eq!(open("secret-b", &sealed), None);
    }

    #[test]
    fn malformed_field_counts_fail_without_panicking() {
        assert_eq!(open(SECRET, ""), None);
        assert_eq!(open(SECRET, "only-one-field"), None);
        assert_eq!(open(SECRET, "two|fields"), None);
        assert_eq!(open(SECRET, "fo|ur|fi|elds"), None);

        let sealed = seal(SECRET, "v");
        assert_eq!(open(SECRET, &format!("{sealed}|extra")), None);
    }

    #[test]
    fn truncated_signature_is_a_mismatch_not_a_crash() {
        let sealed = seal(SECRET, "v");
        let mut parts: Vec<&str> = sealed.split('|').collect();
        let short = &parts[2][..2];
        parts[2] = short;
        assert_eq!(open(SECRET, &parts.join("|")), None);
    }

    #[test]
    fn non_hex_signature_fails() {
        let sealed = seal(SECRET, "v");
        let mut parts: Vec<&str> = sealed.split('|').collect();
        parts[2] = "zz-not-hex";
        assert_eq!(open(SECRET, &parts.join("|")), None);
    }

    #[test]
    fn set_cookie_value_defaults() {
        let v = set_cookie_value("sid", "abc", &CookieOptions::default());
        assert_eq!(v, "sid=abc; Path=/");
    }

    #[test]
    fn set_cookie_value_full() {
        let opts = CookieOptions {
            max_age: Some(60),
            path: "/app".into(),
            domain: "example.com".into(),
            secure: true,
            http_only: true,
        };
        assert_eq!(
            set_cookie_value("sid", "abc", &opts),
            "sid=abc; Max-Age=60; Path=/app; Domain=example.com; Secure; HttpOnly"
        );
    }

    #[test]
    fn find_cookie_parses_header() {
        let header = "a=1; session=xyz; b=2";
        assert_eq!(find_cookie(header, "session"), Some("xyz".to_owned()));
        assert_eq!(find_cookie(header, "missing"), None);
    }
}
