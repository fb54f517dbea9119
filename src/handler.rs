//! Handler trait, typed-function adapters, and return-value dispatch.
//!
//! # How handlers are stored
//!
//! The chain holds handlers of *different* concrete types in one
//! `Vec`. Rust collections hold one type, so handlers live behind trait
//! objects (`Arc<dyn Handler>`) — one atomic refcount bump and one vtable
//! call per invocation, negligible next to network I/O.
//!
//! Two ways to produce a handler:
//!
//! - **Implement [`Handler`] directly** (`#[async_trait]`) when the handler
//!   needs the context — to write the response imperatively, read cookies,
//!   or drive the rest of the chain via
//!   [`Context::next`](crate::Context::next).
//! - **Wrap a plain async function with [`handler`]** when it only needs
//!   typed values. Each argument resolves from the injector by type; the
//!   return value is converted through [`IntoOutcome`]:
//!
//! ```text
//! async fn greet(p: Params) -> String { … }     ← user writes this
//!        ↓ app.on(Method::Get, "/hi/{name}", handler(greet))
//! FnHandler { f: greet, _marker }               ← PhantomData-typed wrapper
//!        ↓ stored as Arc<dyn Handler>
//! handler.call(cx) at request time              ← args from cx.injector()
//!        ↓
//! greet(params).await.into_outcome()            ← Outcome::Value(Payload::Text)
//! ```
//!
//! A produced [`Payload`] is handed to the registered [`ReturnHandler`] —
//! the single mechanism by which a return value becomes a response write.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Error;
use crate::response::ContentType;
use crate::status::Status;

// ── Core trait ────────────────────────────────────────────────────────────────

/// An invocable unit of request-processing logic.
///
/// Returning `Err` aborts the request: no later handler runs and the error
/// crosses the server boundary unmodified.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, cx: &mut Context) -> Result<Outcome, Error>;
}

/// A heap-allocated, type-erased handler shared by the chain.
pub type BoxedHandler = Arc<dyn Handler>;

// ── Outcome model ─────────────────────────────────────────────────────────────

/// What one handler invocation produced.
pub enum Outcome {
    /// Nothing; the chain proceeds.
    Pass,
    /// A value for the [`ReturnHandler`] to convert into a response.
    Value(Payload),
}

/// The closed set of values a handler can produce.
///
/// The paired variants mirror "status plus body" returns; everything richer
/// is expressed by writing to the response directly.
pub enum Payload {
    Status(Status),
    Text(String),
    Bytes(Vec<u8>),
    StatusText(Status, String),
    StatusBytes(Status, Vec<u8>),
}

/// Conversion from a handler's return value into an [`Outcome`].
///
/// Implemented for `()` (pass), text and byte bodies, [`Status`],
/// status+body pairs, and `Option`/`Result` of any of those.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Outcome, Error>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Pass)
    }
}

impl IntoOutcome for Status {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Value(Payload::Status(self)))
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Value(Payload::Text(self)))
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Value(Payload::Text(self.to_owned())))
    }
}

impl IntoOutcome for Vec<u8> {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Value(Payload::Bytes(self)))
    }
}

impl IntoOutcome for (Status, String) {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Value(Payload::StatusText(self.0, self.1)))
    }
}

impl IntoOutcome for (Status, Vec<u8>) {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome::Value(Payload::StatusBytes(self.0, self.1)))
    }
}

/// `None` passes; `Some` converts.
impl<T: IntoOutcome> IntoOutcome for Option<T> {
    fn into_outcome(self) -> Result<Outcome, Error> {
        match self {
            Some(v) => v.into_outcome(),
            None => Ok(Outcome::Pass),
        }
    }
}

/// `Err` aborts the request.
impl<T: IntoOutcome> IntoOutcome for Result<T, Error> {
    fn into_outcome(self) -> Result<Outcome, Error> {
        self?.into_outcome()
    }
}

// ── Return-value dispatch ─────────────────────────────────────────────────────

/// Converter from a produced [`Payload`] into a response write.
///
/// Registered in the injector; last registration wins, so an application
/// replaces the default by providing its own before requests run.
#[derive(Clone)]
pub struct ReturnHandler(Arc<dyn Fn(&mut Context, Payload) + Send + Sync>);

impl ReturnHandler {
    pub fn new(f: impl Fn(&mut Context, Payload) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn handle(&self, cx: &mut Context, payload: Payload) {
        (self.0)(cx, payload)
    }
}

/// The default conversion: text as `text/plain`, bytes as
/// `application/octet-stream`, a bare status as a bodiless head.
impl Default for ReturnHandler {
    fn default() -> Self {
        Self::new(|cx: &mut Context, payload| match payload {
            Payload::Status(s) => cx.resp.write_head(s),
            Payload::Text(t) => cx.resp.text(t),
            Payload::Bytes(b) => cx.resp.bytes(ContentType::OctetStream, b),
            Payload::StatusText(s, t) => {
                cx.resp.set_status(s);
                cx.resp.text(t);
            }
            Payload::StatusBytes(s, b) => {
                cx.resp.set_status(s);
                cx.resp.bytes(ContentType::OctetStream, b);
            }
        })
    }
}

// ── Typed argument resolution ─────────────────────────────────────────────────

/// A value resolvable from the context at invocation time.
///
/// The blanket impl pulls any `Clone`able type out of the injector; a
/// missing binding is an invocation failure, not a default.
pub trait FromContext: Sized {
    fn from_context(cx: &Context) -> Result<Self, Error>;
}

impl<T: Any + Clone + Send + Sync + 'static> FromContext for T {
    fn from_context(cx: &Context) -> Result<Self, Error> {
        cx.injector().require::<T>()
    }
}

// ── Typed function adapter ────────────────────────────────────────────────────

/// Adapter storing a plain async function as a [`Handler`].
///
/// The `PhantomData` pins down the argument tuple and future type so the
/// arity impls below are coherent; it costs nothing at runtime.
pub struct FnHandler<F, Args, Fut> {
    f: F,
    _marker: PhantomData<fn(Args) -> Fut>,
}

/// Wraps an async function whose arguments implement [`FromContext`] and
/// whose return value implements [`IntoOutcome`].
///
/// ```rust,no_run
/// use cauce::{handler, App, Method, Params, Status};
///
/// async fn show(params: Params) -> String {
///     format!("user {}", params.get("id"))
/// }
///
/// async fn purge() -> Status {
///     Status::NoContent
/// }
///
/// App::new()
///     .on(Method::Get, "/users/{id}", handler(show))
///     .on(Method::Delete, "/cache", handler(purge));
/// ```
pub fn handler<F, Args, Fut>(f: F) -> FnHandler<F, Args, Fut> {
    FnHandler { f, _marker: PhantomData }
}

macro_rules! impl_fn_handler {
    ($($ty:ident),*) => {
        #[async_trait]
        impl<F, Fut, $($ty,)*> Handler for FnHandler<F, ($($ty,)*), Fut>
        where
            F: Fn($($ty),*) -> Fut + Send + Sync + 'static,
            Fut: Future + Send + 'static,
            Fut::Output: IntoOutcome + Send,
            $($ty: FromContext + Send + Sync + 'static,)*
        {
            #[allow(non_snake_case, unused_variables)]
            async fn call(&self, cx: &mut Context) -> Result<Outcome, Error> {
                $(let $ty = $ty::from_context(cx)?;)*
                (self.f)($($ty),*).await.into_outcome()
            }
        }
    };
}

impl_fn_handler!();
impl_fn_handler!(A);
impl_fn_handler!(A, B);
impl_fn_handler!(A, B, C);

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(outcome: Result<Outcome, Error>) -> Option<Payload> {
        match outcome {
            Ok(Outcome::Value(p)) => Some(p),
            _ => None,
        }
    }

    #[test]
    fn unit_passes() {
        assert!(matches!(().into_outcome(), Ok(Outcome::Pass)));
    }

    #[test]
    fn text_and_bytes_convert() {
        assert!(matches!(payload("hi".into_outcome()), Some(Payload::Text(t)) if t == "hi"));
        assert!(matches!(
            payload(b"raw".to_vec().into_outcome()),
            Some(Payload::Bytes(b)) if b == b"raw"
        ));
    }

    #[test]
    fn status_pairs_convert() {
        let out = payload((Status::Created, "made".to_owned()).into_outcome());
        assert!(matches!(out, Some(Payload::StatusText(Status::Created, t)) if t == "made"));
    }

    #[test]
    fn option_none_passes_some_converts() {
        let none: Option<String> = None;
        assert!(matches!(none.into_outcome(), Ok(Outcome::Pass)));
        assert!(matches!(
            payload(Some(Status::NotFound).into_outcome()),
            Some(Payload::Status(Status::NotFound))
        ));
    }

    #[test]
    fn result_err_aborts() {
        let res: Result<String, Error> = Err(Error::handler("boom"));
        assert!(res.into_outcome().is_err());
    }
}
