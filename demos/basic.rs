//! Minimal cauce example — a traced chain, typed handlers, signed sessions.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -i -X POST http://localhost:3000/login
//!   curl http://localhost:3000/me -H 'cookie: session=<value from login>'
//!   curl http://localhost:3000/healthz

use async_trait::async_trait;
use cauce::{
    App, Context, CookieOptions, Error, Handler, Method, Outcome, Params, Server, Status, handler,
    health, middleware::Trace,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = App::new()
        .with(Trace)
        .cookie_secret("demo-secret-rotate-me")
        .on(Method::Get, "/users/{id}", handler(get_user))
        .on(Method::Post, "/login", Login)
        .on(Method::Get, "/me", Me)
        .on(Method::Get, "/healthz", handler(health::liveness))
        .on(Method::Get, "/readyz", handler(health::readiness));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
//
// A typed handler: arguments resolve from the injector (Params is always
// available), the returned String becomes a text/plain body.
async fn get_user(params: Params) -> String {
    format!(r#"{{"id":"{}","name":"alice"}}"#, params.get("id"))
}

// POST /login → 204 with a signed session cookie
struct Login;

#[async_trait]
impl Handler for Login {
    async fn call(&self, cx: &mut Context) -> Result<Outcome, Error> {
        // Real app: check credentials from cx.req.form_value(...) first.
        let opts = CookieOptions { http_only: true, ..Default::default() };
        cx.set_secure_cookie("session", "user:42", &opts);
        cx.resp.write_head(Status::NoContent);
        Ok(Outcome::Pass)
    }
}

// GET /me → who the signed cookie says you are
struct Me;

#[async_trait]
impl Handler for Me {
    async fn call(&self, cx: &mut Context) -> Result<Outcome, Error> {
        match cx.secure_cookie("session") {
            Some(user) => cx.resp.text(format!("hello {user}")),
            None => cx.resp.write_head(Status::Unauthorized),
        }
        Ok(Outcome::Pass)
    }
}
