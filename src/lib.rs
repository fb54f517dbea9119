//! # cauce
//!
//! A per-request middleware chain engine. One [`Context`] per request drives
//! an ordered chain of handlers, resolves typed handler arguments from a
//! type-keyed injector, converts produced values into response writes, and
//! signs cookies you can actually trust.
//!
//! ## The contract
//!
//! The chain stops the moment output is committed. A handler either passes,
//! produces a value (converted by the registered [`ReturnHandler`]), writes
//! the response itself, or fails — and a failure aborts the request with no
//! later handler running. Middleware that wants code on both sides of the
//! rest of the chain calls [`Context::next`] in the middle and gets the
//! downstream result before resuming.
//!
//! What cauce intentionally leaves to collaborators:
//!
//! - **HTTP parsing and TLS** — hyper and your proxy own the wire
//! - **Route matching** — [`matchit`] owns the algorithm; cauce owns the table
//! - **Template engines** — bring one and register it via [`App::renderer`]
//! - **Session storage** — signed cookies carry state client-side; nothing
//!   is persisted server-side
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cauce::{handler, middleware::Trace, App, Method, Params, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = App::new()
//!         .with(Trace)
//!         .cookie_secret("rotate-me")
//!         .on(Method::Get, "/users/{id}", handler(get_user));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(params: Params) -> String {
//!     format!(r#"{{"id":"{}"}}"#, params.get("id"))
//! }
//! ```
//!
//! Handlers that need the request, the response writer, or control over the
//! chain implement [`Handler`] directly:
//!
//! ```rust
//! use async_trait::async_trait;
//! use cauce::{Context, Error, Handler, Outcome, Status};
//!
//! struct RequireSession;
//!
//! #[async_trait]
//! impl Handler for RequireSession {
//!     async fn call(&self, cx: &mut Context) -> Result<Outcome, Error> {
//!         if cx.secure_cookie("session").is_none() {
//!             cx.resp.write_head(Status::Unauthorized);
//!         }
//!         Ok(Outcome::Pass)
//!     }
//! }
//! ```

mod app;
mod context;
mod error;
mod handler;
mod injector;
mod method;
mod request;
mod response;
mod router;
mod server;
mod static_path;
mod status;

pub mod cookie;
pub mod health;
pub mod middleware;

pub use app::App;
pub use context::{Context, Data, Params, Render, Renderer};
pub use cookie::{CookieOptions, CookieSecret};
pub use error::Error;
pub use handler::{
    BoxedHandler, FnHandler, FromContext, Handler, IntoOutcome, Outcome, Payload, ReturnHandler,
    handler,
};
pub use injector::Injector;
pub use method::Method;
pub use request::{Request, UploadedFile};
pub use response::{ContentType, ResponseWriter};
pub use router::Router;
pub use server::Server;
pub use static_path::{StaticDir, StaticRegistry};
pub use status::Status;
