//! Built-in middleware.
//!
//! Middleware are ordinary [`Handler`]s registered on the global chain with
//! [`App::with`](crate::App::with). A middleware that needs to run code both
//! before and after the rest of the chain calls
//! [`Context::next`](crate::Context::next) in the middle — [`Trace`] below
//! is the canonical example.

use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{Handler, Outcome};

/// Per-request logging: method, path, response status, latency.
///
/// ```rust,no_run
/// use cauce::{middleware::Trace, App};
///
/// let app = App::new().with(Trace);
/// ```
pub struct Trace;

#[async_trait]
impl Handler for Trace {
    async fn call(&self, cx: &mut Context) -> Result<Outcome, Error> {
        let method = cx.req.method().to_owned();
        let path = cx.req.path().to_owned();
        let start = Instant::now();

        // Runs the rest of the chain; returns after it finishes or
        // short-circuits, so the record below sees the final status.
        cx.next().await?;

        info!(
            %method,
            %path,
            status = cx.resp.status(),
            latency_ms = start.elapsed().as_millis() as u64,
            "request",
        );
        Ok(Outcome::Pass)
    }
}
