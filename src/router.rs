//! Routing table over radix trees.
//!
//! One tree per HTTP method, O(path-length) lookup via [`matchit`]. The
//! table stores the *action* for each route — the terminal handler the chain
//! runs after every middleware. Matching itself is `matchit`'s problem; this
//! module only builds the table and hands back the action plus the matched
//! parameters.

use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::Params;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// The routing table. Build it once at startup through
/// [`App::on`](crate::App::on); each registration returns `self` so routes
/// chain naturally.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax — `cx.param("name")` retrieves
    /// them.
    ///
    /// # Panics
    ///
    /// Panics on an invalid or conflicting route pattern. Routes are
    /// registered at startup; a bad pattern is a programming error worth
    /// failing fast on.
    pub fn on(&mut self, method: Method, path: &str, action: impl Handler) {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::new(action))
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
    }

    /// Looks up the action and path parameters for a request line.
    pub fn lookup(&self, method: Method, path: &str) -> Option<(BoxedHandler, Params)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let action = Arc::clone(matched.value);
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((action, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::Error;
    use crate::handler::Outcome;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Handler for Noop {
        async fn call(&self, _cx: &mut Context) -> Result<Outcome, Error> {
            Ok(Outcome::Pass)
        }
    }

    #[test]
    fn lookup_returns_params() {
        let mut router = Router::new();
        router.on(Method::Get, "/users/{id}", Noop);

        let (_, params) = router.lookup(Method::Get, "/users/42").unwrap();
        assert_eq!(params.get("id"), "42");

        assert!(router.lookup(Method::Post, "/users/42").is_none());
        assert!(router.lookup(Method::Get, "/missing").is_none());
    }
}
