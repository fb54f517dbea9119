//! Type-keyed capability registry.
//!
//! The injector maps a Rust type to a single stored value. Handlers declare
//! what they need by type; argument resolution is a map lookup, not
//! reflection. Two rules define the contract:
//!
//! - **Last registration wins.** Providing a second value of the same type
//!   replaces the first. This is how an application swaps the default
//!   [`ReturnHandler`](crate::ReturnHandler) for its own.
//! - **Missing binding is an error for required parameters.** Typed handler
//!   adapters turn a failed lookup into
//!   [`Error::MissingDependency`](crate::Error::MissingDependency), which
//!   aborts the request.
//!
//! Values are stored behind `Arc`, so cloning the registry for each request
//! is a handful of reference-count increments, and extraction hands out a
//! clone of the stored value (`T: Clone` — wrap expensive state in `Arc`
//! yourself and clone stays cheap).

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;

/// A type-keyed value registry.
///
/// One lives in the [`App`](crate::App) holding process-wide bindings; each
/// request's [`Context`](crate::Context) starts from a clone of it and may
/// add request-scoped bindings on top.
#[derive(Clone, Default)]
pub struct Injector {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Injector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under its type. Replaces any previous binding of
    /// the same type.
    pub fn provide<T: Any + Send + Sync>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Returns a clone of the binding for `T`, if one exists.
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Like [`get`](Injector::get), but a missing binding is the invocation
    /// failure the chain driver propagates.
    pub fn require<T: Any + Clone>(&self) -> Result<T, Error> {
        self.get::<T>()
            .ok_or_else(|| Error::MissingDependency(type_name::<T>()))
    }

    /// Whether a binding for `T` is registered.
    pub fn contains<T: Any>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Token(&'static str);

    #[test]
    fn get_returns_provided_value() {
        let mut inj = Injector::new();
        inj.provide(Token("a"));
        assert_eq!(inj.get::<Token>(), Some(Token("a")));
        assert!(inj.contains::<Token>());
    }

    #[test]
    fn last_registration_wins() {
        let mut inj = Injector::new();
        inj.provide(Token("first"));
        inj.provide(Token("second"));
        assert_eq!(inj.get::<Token>(), Some(Token("second")));
    }

    #[test]
    fn missing_binding_is_none_or_error() {
        let inj = Injector::new();
        assert_eq!(inj.get::<Token>(), None);

        let err = inj.require::<Token>().unwrap_err();
        match err {
            Error::MissingDependency(name) => assert!(name.contains("Token")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn clone_shares_bindings() {
        let mut base = Injector::new();
        base.provide(Token("shared"));

        let mut per_request = base.clone();
        per_request.provide(42u32);

        assert_eq!(per_request.get::<Token>(), Some(Token("shared")));
        // Request-scoped additions do not leak back into the base.
        assert!(!base.contains::<u32>());
    }
}
