//! Application assembly.
//!
//! An [`App`] is everything fixed at startup: the global middleware chain,
//! the routing table, the base injector bindings, and the static path
//! registry. What the original design kept in package-level mutable globals
//! lives here as explicit configuration; the only state that remains mutable
//! after startup is the static registry, which carries its own locks.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use crate::context::{Context, Params, Render, Renderer};
use crate::cookie::CookieSecret;
use crate::handler::{BoxedHandler, Handler, ReturnHandler};
use crate::injector::Injector;
use crate::method::Method;
use crate::request::Request;
use crate::router::Router;
use crate::static_path::StaticRegistry;

/// The assembled application: middleware chain, routes, and bindings.
///
/// ```rust,no_run
/// use cauce::{handler, middleware::Trace, App, Method, Params};
///
/// async fn show(params: Params) -> String {
///     format!("user {}", params.get("id"))
/// }
///
/// let app = App::new()
///     .with(Trace)
///     .cookie_secret("rotate-me")
///     .on(Method::Get, "/users/{id}", handler(show));
/// ```
pub struct App {
    chain: Vec<BoxedHandler>,
    router: Router,
    injector: Injector,
    statics: Arc<StaticRegistry>,
}

impl App {
    /// An empty app anchored at the current directory. Seeds the default
    /// [`ReturnHandler`]; provide your own to replace it.
    pub fn new() -> Self {
        Self::with_root(".")
    }

    /// An empty app with an explicit root for relative static paths.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let statics = Arc::new(StaticRegistry::new(root.as_ref()));
        let mut injector = Injector::new();
        injector.provide(ReturnHandler::default());
        injector.provide(Arc::clone(&statics));
        Self {
            chain: Vec::new(),
            router: Router::new(),
            injector,
            statics,
        }
    }

    /// Appends a middleware handler to the global chain. Chain order is
    /// registration order.
    pub fn with(mut self, middleware: impl Handler) -> Self {
        self.chain.push(Arc::new(middleware));
        self
    }

    /// Registers a route action.
    pub fn on(mut self, method: Method, path: &str, action: impl Handler) -> Self {
        self.router.on(method, path, action);
        self
    }

    /// Adds a base injector binding, available to every request. Last
    /// registration of a type wins.
    pub fn provide<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.injector.provide(value);
        self
    }

    /// Sets the signing secret used by the `*_secure_cookie` context
    /// methods. Fixed once requests start flowing.
    pub fn cookie_secret(self, secret: impl Into<CookieSecret>) -> Self {
        self.provide(secret.into())
    }

    /// Registers the template renderer enabling
    /// [`Context::html`](crate::Context::html).
    pub fn renderer(self, renderer: impl Render + 'static) -> Self {
        self.provide(Renderer(Arc::new(renderer)))
    }

    /// Registers a served static directory with the shared registry.
    pub fn static_dir(self, path: impl AsRef<Path>) -> Self {
        self.statics.register(path);
        self
    }

    /// The shared static path registry.
    pub fn statics(&self) -> &Arc<StaticRegistry> {
        &self.statics
    }

    /// Routes a request line.
    pub(crate) fn lookup(&self, method: Method, path: &str) -> Option<(BoxedHandler, Params)> {
        self.router.lookup(method, path)
    }

    /// Builds the execution context for one request: a clone of the global
    /// chain and base bindings plus the routed action and its params.
    pub fn context_for(&self, req: Request, action: BoxedHandler, params: Params) -> Context {
        Context::new(req, self.chain.clone(), action, params, self.injector.clone())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
