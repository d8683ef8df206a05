//! Routing and dispatch core for HTTP servers.
//!
//! Patterns compile once into [`Matcher`]s, registrations are scanned in
//! insertion order with every match running, results are memoized per
//! `METHOD:PATH`, and a [`Dispatcher`] walks the matched handlers with a
//! [`Next`](dispatch::Next) continuation.
//!
//! ```
//! use switchback::dispatch::{handler_fn, Outcome};
//! use switchback::Router;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut router = Router::new();
//! router.get(
//!     "/users/:id",
//!     handler_fn(|cx, _| Box::pin(async move { Outcome::text(cx.param("id").unwrap_or_default().to_owned()) })),
//! );
//! let dispatcher = router.build();
//!
//! let req = http::Request::get("/users/1337").body(bytes::Bytes::new()).unwrap();
//! let res = dispatcher.handle(req).await;
//! assert_eq!(res.body(), "1337");
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod pattern;
pub mod router;

#[cfg(feature = "hyper-service")]
pub mod service;

mod router_macro;

pub use crate::config::{Config, Mode};
pub use crate::dispatch::{Dispatcher, Router};
pub use crate::error::{BoxError, ConfigError, DispatchError, RouterError};
pub use crate::pattern::{compile, Matcher, Params, Pattern};
pub use crate::router::{MatchCache, MethodFilter, RouteTable};

#[cfg(feature = "hyper-service")]
pub use crate::service::DispatchService;

pub use http::Method;

pub type Request = http::Request<bytes::Bytes>;
pub type Response = http::Response<bytes::Bytes>;
