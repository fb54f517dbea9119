//! Per-request execution context and chain driver.
//!
//! One [`Context`] exists per request, exclusively owned by the task
//! processing that request — the `&mut self` driver methods make sharing a
//! compile error, so none of the request-scoped state needs a lock.
//!
//! # The chain
//!
//! The context holds the ordered middleware handlers plus the terminal
//! action, and a cursor over the conceptual sequence `handlers ++ [action]`.
//! [`run`](Context::run) invokes them in order. Three things stop the loop:
//!
//! - a handler (or the return-value conversion it triggered) commits the
//!   response — no later handler runs;
//! - a handler fails — the error propagates out of `run` unmodified and no
//!   later handler runs;
//! - the chain is exhausted.
//!
//! A handler may call [`next`](Context::next) to run the remainder of the
//! chain *inside its own invocation* — code before `next` runs on the way
//! in, code after runs on the way out, which is how timing and
//! post-processing middleware are written. `next` returns only after the
//! downstream chain has finished or short-circuited.

use std::any::Any;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::cookie::{self, CookieOptions, CookieSecret};
use crate::error::Error;
use crate::handler::{BoxedHandler, Outcome, ReturnHandler};
use crate::injector::Injector;
use crate::request::{Request, html_escape, parse_or_zero};
use crate::response::ResponseWriter;
use crate::static_path::StaticRegistry;
use crate::status::Status;

// ── Route parameters ──────────────────────────────────────────────────────────

/// Route parameters matched out of the path, immutable after routing.
///
/// Also registered in the request's injector, so typed handlers take
/// `Params` as an argument directly.
#[derive(Clone, Debug, Default)]
pub struct Params(HashMap<String, String>);

impl Params {
    /// Returns the value for `name`, or `""` when the route has no such
    /// parameter.
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Request-scoped scratch map. Any handler may read or write it; it dies
/// with the request.
pub type Data = HashMap<String, Box<dyn Any + Send + Sync>>;

// ── Render seam ───────────────────────────────────────────────────────────────

/// Template rendering, consumed but not implemented here. Register an
/// implementation via [`App::renderer`](crate::App::renderer) to enable
/// [`Context::html`].
pub trait Render: Send + Sync {
    fn render(&self, name: &str, data: &Data) -> Result<String, Error>;
}

/// Injector binding wrapping the registered renderer.
#[derive(Clone)]
pub struct Renderer(pub Arc<dyn Render>);

// ── Context ───────────────────────────────────────────────────────────────────

/// The runtime context of one request.
pub struct Context {
    handlers: Vec<BoxedHandler>,
    action: BoxedHandler,
    index: usize,
    injector: Injector,
    params: Params,
    /// Request-scoped scratch storage, shared down the chain.
    pub data: Data,
    pub req: Request,
    pub resp: ResponseWriter,
}

impl Context {
    /// Assembles the context for one request. The dispatcher supplies the
    /// parsed request, the middleware chain, the routed action, its params,
    /// and the injector seeded with application bindings.
    pub fn new(
        req: Request,
        handlers: Vec<BoxedHandler>,
        action: BoxedHandler,
        params: Params,
        mut injector: Injector,
    ) -> Self {
        if !injector.contains::<ReturnHandler>() {
            injector.provide(ReturnHandler::default());
        }
        injector.provide(params.clone());
        Self {
            handlers,
            action,
            index: 0,
            injector,
            params,
            data: Data::new(),
            req,
            resp: ResponseWriter::new(),
        }
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    pub fn injector_mut(&mut self) -> &mut Injector {
        &mut self.injector
    }

    // ── Chain driver ──────────────────────────────────────────────────────────

    /// Selects the handler under the cursor.
    ///
    /// The cursor is only ever advanced by the driver, so a value past the
    /// action is a protocol violation by definition — a bug in chain
    /// construction, aborted loudly rather than recovered.
    fn current(&self) -> BoxedHandler {
        if self.index < self.handlers.len() {
            Arc::clone(&self.handlers[self.index])
        } else if self.index == self.handlers.len() {
            Arc::clone(&self.action)
        } else {
            panic!(
                "handler cursor out of protocol: {} with {} handlers",
                self.index,
                self.handlers.len(),
            );
        }
    }

    /// Drives the chain. Called once per request by the dispatcher.
    pub async fn run(&mut self) -> Result<(), Error> {
        while self.index <= self.handlers.len() {
            let handler = self.current();
            let outcome = handler.call(self).await?;
            self.index += 1;

            if let Outcome::Value(payload) = outcome {
                let convert = self.injector.require::<ReturnHandler>()?;
                convert.handle(self, payload);
            }

            if self.written() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Yields to the rest of the chain. When this returns, every downstream
    /// handler has run (or one of them committed the response); the calling
    /// handler then resumes.
    pub async fn next(&mut self) -> Result<(), Error> {
        self.index += 1;
        // Re-enters the loop; recursion bottoms out because handler futures
        // are boxed behind the trait object.
        self.run().await
    }

    /// Whether the response has been committed. Pure query.
    pub fn written(&self) -> bool {
        self.resp.written()
    }

    // ── Route parameters ──────────────────────────────────────────────────────

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Route parameter by name, or `""`.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name)
    }

    /// HTML-escaped route parameter.
    pub fn param_escape(&self, name: &str) -> String {
        html_escape(self.param(name))
    }

    /// Route parameter coerced to `i32`; `0` when absent or non-numeric.
    pub fn param_i32(&self, name: &str) -> i32 {
        parse_or_zero(self.param(name))
    }

    /// Route parameter coerced to `i64`; `0` when absent or non-numeric.
    pub fn param_i64(&self, name: &str) -> i64 {
        parse_or_zero(self.param(name))
    }

    // ── Request-scoped data ───────────────────────────────────────────────────

    /// Stores a value in the request-scoped map.
    pub fn set(&mut self, key: impl Into<String>, value: impl Any + Send + Sync) {
        self.data.insert(key.into(), Box::new(value));
    }

    /// Reads a typed value from the request-scoped map.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.data.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    // ── Cookies ───────────────────────────────────────────────────────────────

    /// Adds a `Set-Cookie` header for `name=value` with the given attributes.
    pub fn set_cookie(&mut self, name: &str, value: &str, opts: &CookieOptions) {
        self.resp
            .add_header("set-cookie", &cookie::set_cookie_value(name, value, opts));
    }

    /// Reads a cookie from the request, if present.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.req
            .header("cookie")
            .and_then(|h| cookie::find_cookie(h, name))
    }

    /// Cookie value coerced to `i32`; `0` when absent or non-numeric.
    pub fn cookie_i32(&self, name: &str) -> i32 {
        parse_or_zero(&self.cookie(name).unwrap_or_default())
    }

    /// Cookie value coerced to `i64`; `0` when absent or non-numeric.
    pub fn cookie_i64(&self, name: &str) -> i64 {
        parse_or_zero(&self.cookie(name).unwrap_or_default())
    }

    /// Sets a signed cookie sealed with `secret`.
    pub fn set_signed_cookie(
        &mut self,
        secret: &str,
        name: &str,
        value: &str,
        opts: &CookieOptions,
    ) {
        let sealed = cookie::seal(secret, value);
        self.set_cookie(name, &sealed, opts);
    }

    /// Reads and verifies a signed cookie. `None` means not authenticated —
    /// absent, malformed, or failing verification; the caller decides what
    /// that implies.
    pub fn signed_cookie(&self, secret: &str, name: &str) -> Option<String> {
        cookie::open(secret, &self.cookie(name)?)
    }

    /// Like [`set_signed_cookie`](Context::set_signed_cookie) with the
    /// app-configured [`CookieSecret`].
    pub fn set_secure_cookie(&mut self, name: &str, value: &str, opts: &CookieOptions) {
        let secret = self.app_secret();
        self.set_signed_cookie(&secret, name, value, opts);
    }

    /// Like [`signed_cookie`](Context::signed_cookie) with the
    /// app-configured [`CookieSecret`].
    pub fn secure_cookie(&self, name: &str) -> Option<String> {
        self.signed_cookie(&self.app_secret(), name)
    }

    fn app_secret(&self) -> String {
        self.injector
            .get::<CookieSecret>()
            .map(|s| s.0.to_string())
            .unwrap_or_default()
    }

    // ── Response helpers ──────────────────────────────────────────────────────

    /// Commits a redirect; `302 Found` when no status is given.
    pub fn redirect(&mut self, location: &str, code: Option<Status>) {
        self.resp.redirect(location, code);
    }

    /// Renders a registered template and commits it as `text/html`.
    ///
    /// # Panics
    ///
    /// Panics when no renderer is registered — a usage error meant to
    /// surface during development, not a runtime condition to handle.
    pub fn html(&mut self, status: Status, name: &str) -> Result<(), Error> {
        let Some(renderer) = self.injector.get::<Renderer>() else {
            panic!("renderer middleware hasn't been registered");
        };
        let body = renderer.0.render(name, &self.data)?;
        self.resp.set_status(status);
        self.resp.html(body);
        Ok(())
    }

    /// Reads a file and commits it as an attachment download. The download
    /// name defaults to the file's base name.
    pub async fn serve_file(
        &mut self,
        path: impl AsRef<Path>,
        name: Option<&str>,
    ) -> Result<(), Error> {
        let path = path.as_ref();
        let name = match name {
            Some(n) => n.to_owned(),
            None => path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let content = tokio::fs::read(path).await?;
        self.resp.serve_download(&name, &content);
        Ok(())
    }

    // ── Static paths ──────────────────────────────────────────────────────────

    /// Remaps a registered static directory. Delegates to the shared
    /// [`StaticRegistry`]; without one bound, or with an unregistered old
    /// path, this is a no-op.
    pub fn change_static_path(&self, old: impl AsRef<Path>, new: impl AsRef<Path>) {
        if let Some(reg) = self.injector.get::<Arc<StaticRegistry>>() {
            reg.change_static_path(old, new);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::handler::Handler;

    fn request() -> Request {
        Request::new("GET", "/", vec![], Vec::new(), "peer:1")
    }

    /// Records its id in a shared log, optionally committing the response.
    struct Step {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
        write: bool,
    }

    #[async_trait]
    impl Handler for Step {
        async fn call(&self, cx: &mut Context) -> Result<Outcome, Error> {
            self.log.lock().unwrap().push(self.id);
            if self.write {
                cx.resp.text("done");
            }
            Ok(Outcome::Pass)
        }
    }

    fn step(id: usize, log: &Arc<Mutex<Vec<usize>>>, write: bool) -> BoxedHandler {
        Arc::new(Step { id, log: Arc::clone(log), write })
    }

    #[tokio::test]
    async fn full_chain_leaves_cursor_past_action() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![step(0, &log, false), step(1, &log, false), step(2, &log, false)];
        let mut cx = Context::new(request(), chain, step(3, &log, false), Params::default(), Injector::new());

        cx.run().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
        // Three middleware plus the action: the cursor rests at N + 1.
        assert_eq!(cx.index, 4);
    }

    #[tokio::test]
    async fn committed_response_freezes_cursor() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = vec![step(0, &log, false), step(1, &log, true), step(2, &log, false)];
        let mut cx = Context::new(request(), chain, step(3, &log, false), Params::default(), Injector::new());

        cx.run().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![0, 1]);
        assert_eq!(cx.index, 2);
        assert!(cx.written());
    }

    #[test]
    #[should_panic(expected = "handler cursor out of protocol")]
    fn out_of_protocol_cursor_panics() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut cx = Context::new(
            request(),
            vec![step(0, &log, false)],
            step(1, &log, false),
            Params::default(),
            Injector::new(),
        );
        cx.index = 5;
        let _ = cx.current();
    }

    #[test]
    fn data_map_round_trips_typed_values() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut cx = Context::new(
            request(),
            Vec::new(),
            step(0, &log, false),
            Params::default(),
            Injector::new(),
        );

        cx.set("attempts", 3u32);
        assert_eq!(cx.get::<u32>("attempts"), Some(&3));
        assert_eq!(cx.get::<String>("attempts"), None);
        assert_eq!(cx.get::<u32>("missing"), None);
    }

    #[test]
    fn param_accessors_fail_closed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let params: Params = [("id".to_owned(), "42".to_owned()), ("bad".to_owned(), "x".to_owned())]
            .into_iter()
            .collect();
        let cx = Context::new(
            request(),
            Vec::new(),
            step(0, &log, false),
            params,
            Injector::new(),
        );

        assert_eq!(cx.param("id"), "42");
        assert_eq!(cx.param_i64("id"), 42);
        assert_eq!(cx.param_i32("bad"), 0);
        assert_eq!(cx.param("missing"), "");
    }

    #[test]
    #[should_panic(expected = "renderer middleware hasn't been registered")]
    fn html_without_renderer_is_a_usage_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut cx = Context::new(
            request(),
            Vec::new(),
            step(0, &log, false),
            Params::default(),
            Injector::new(),
        );
        let _ = cx.html(Status::Ok, "index");
    }

    #[tokio::test]
    async fn signed_cookie_round_trips_through_headers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut cx = Context::new(
            request(),
            Vec::new(),
            step(0, &log, false),
            Params::default(),
            Injector::new(),
        );

        cx.set_signed_cookie("secret", "session", "user:42", &CookieOptions::default());

        // Replay the Set-Cookie value as an incoming Cookie header.
        let sealed = cx
            .resp
            .headers()
            .iter()
            .find(|(k, _)| k == "set-cookie")
            .map(|(_, v)| v.split(';').next().unwrap_or_default().to_owned())
            .unwrap();
        let req = Request::new(
            "GET",
            "/",
            vec![("Cookie".to_owned(), sealed)],
            Vec::new(),
            "peer:1",
        );
        let cx2 = Context::new(req, Vec::new(), step(1, &log, false), Params::default(), Injector::new());

        assert_eq!(cx2.signed_cookie("secret", "session"), Some("user:42".to_owned()));
        assert_eq!(cx2.signed_cookie("wrong", "session"), None);
        assert_eq!(cx2.signed_cookie("secret", "missing"), None);
    }
}
