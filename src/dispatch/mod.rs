//! Continuation-passing dispatch over matched handlers.
//!
//! ```text
//! Matching ──> Running(i) ──> Responded
//!                  │  exhausted: not-found fallback ──> Responded
//!                  └─ fault ──> Erroring(j) ──> Responded
//!                                   └─ exhausted: server-error fallback ──> Responded
//! ```

mod context;
mod dispatcher;
mod fallback;
mod handler;
mod next;
mod outcome;
mod router;

pub use self::context::{cancellation, CancelGuard, CancelHandle, Cancellation, Context};
pub use self::dispatcher::Dispatcher;
pub use self::fallback::DEBUG_HEADER;
pub use self::handler::{handler_fn, Handler, HandlerFn, HandlerTree, IntoHandlers, SharedHandler};
pub use self::next::Next;
pub use self::outcome::{Interrupt, Outcome};
pub use self::router::Router;

use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
