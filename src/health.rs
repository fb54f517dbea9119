//! Built-in Kubernetes health-check handlers.
//!
//! Kubernetes asks two questions. cauce answers them.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them as route actions:
//!
//! ```rust,no_run
//! use cauce::{handler, health, App, Method};
//!
//! let app = App::new()
//!     .on(Method::Get, "/healthz", handler(health::liveness))
//!     .on(Method::Get, "/readyz", handler(health::readiness));
//! ```
//!
//! Replace `readiness` with your own handler to gate on dependency
//! availability (database connections, downstream services, etc.).

/// Kubernetes liveness probe handler.
///
/// Always returns `200 OK` with body `"ok"`. If the process can respond to
/// HTTP at all, it is alive — this handler intentionally has no dependencies.
pub async fn liveness() -> &'static str {
    "ok"
}

/// Kubernetes readiness probe handler (default implementation).
///
/// Returns `200 OK` with body `"ready"`. Replace with your own handler if
/// the application needs a warm-up period or must verify dependency health
/// before accepting traffic.
pub async fn readiness() -> &'static str {
    "ready"
}
