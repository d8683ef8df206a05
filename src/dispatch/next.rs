use super::{fallback, BoxFuture, Context, Dispatcher, Outcome, SharedHandler};
use crate::error::{BoxError, DispatchError};
use crate::router::Matched;
use crate::Response;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use tracing::{trace, warn};

/// The rest of the active chain.
///
/// Consumed by [`Next::run`]; a handler that does not call it may still return
/// [`Outcome::Continue`] to let the dispatcher advance on its behalf.
pub struct Next<'a> {
    dispatcher: &'a Dispatcher,
    chain: Chain<'a>,
    consumed: &'a AtomicBool,
}

#[derive(Clone, Copy)]
enum Chain<'a> {
    Matched(&'a [Matched<SharedHandler>], usize),
    Error(usize),
}

impl<'a> Next<'a> {
    /// Runs the remaining handlers and resolves to their response.
    ///
    /// A fault raised downstream is settled by the error chain before it gets
    /// here, so the caller can post-process the error response like any other.
    pub fn run<'b>(self, cx: &'b mut Context) -> BoxFuture<'b, Outcome>
    where
        'a: 'b,
    {
        self.consumed.store(true, Ordering::Relaxed);
        let dispatcher = self.dispatcher;
        match self.chain {
            Chain::Matched(entries, index) => Box::pin(async move {
                match run_matched(dispatcher, entries, index, cx).await {
                    Outcome::Fault(err) => Outcome::Response(recover(dispatcher, cx, err).await),
                    outcome => outcome,
                }
            }),
            Chain::Error(index) => Box::pin(async move {
                Outcome::Response(run_errors(dispatcher, index, cx).await)
            }),
        }
    }
}

/// Enters the error chain with `err` captured.
pub(super) async fn recover(d: &Dispatcher, cx: &mut Context, err: BoxError) -> Response {
    warn!(method = %cx.method(), path = %cx.path(), error = %err, "handler fault");
    cx.set_error(err);
    run_errors(d, 0, cx).await
}

pub(super) fn run_matched<'b>(
    d: &'b Dispatcher,
    entries: &'b [Matched<SharedHandler>],
    index: usize,
    cx: &'b mut Context,
) -> BoxFuture<'b, Outcome> {
    Box::pin(async move {
        let entry = match entries.get(index) {
            Some(entry) => entry,
            None => return Outcome::Response(fallback::not_found(d.config().mode, cx)),
        };

        trace!(step = index, "running handler");
        cx.set_params(entry.params.clone());

        let consumed = AtomicBool::new(false);
        let next = Next {
            dispatcher: d,
            chain: Chain::Matched(entries, index + 1),
            consumed: &consumed,
        };

        match AssertUnwindSafe(entry.data.call(cx, next))
            .catch_unwind()
            .await
        {
            Ok(Outcome::Continue) if consumed.load(Ordering::Relaxed) => {
                Outcome::Fault(Box::new(DispatchError::ResponseDropped))
            }
            Ok(Outcome::Continue) => run_matched(d, entries, index + 1, cx).await,
            Ok(outcome) => outcome,
            Err(panic) => Outcome::Fault(panicked(panic)),
        }
    })
}

pub(super) fn run_errors<'b>(d: &'b Dispatcher, index: usize, cx: &'b mut Context) -> BoxFuture<'b, Response> {
    Box::pin(async move {
        let handler = match d.error_chain().get(index) {
            Some(h) => h,
            None => return fallback::server_error(d.config().mode, cx),
        };

        trace!(step = index, "running error handler");

        let consumed = AtomicBool::new(false);
        let next = Next {
            dispatcher: d,
            chain: Chain::Error(index + 1),
            consumed: &consumed,
        };

        let err = match AssertUnwindSafe(handler.call(cx, next)).catch_unwind().await {
            Ok(Outcome::Response(res)) => return res,
            Ok(Outcome::Continue) if !consumed.load(Ordering::Relaxed) => None,
            Ok(Outcome::Continue) => Some(Box::new(DispatchError::ResponseDropped) as BoxError),
            Ok(Outcome::Fault(err)) => Some(err),
            Err(panic) => Some(panicked(panic)),
        };

        if let Some(err) = err {
            warn!(step = index, error = %err, "error handler failed");
            cx.set_error(err);
        }

        // The rest of the chain already ran inside `next`.
        if consumed.load(Ordering::Relaxed) {
            return fallback::server_error(d.config().mode, cx);
        }
        run_errors(d, index + 1, cx).await
    })
}

fn panicked(payload: Box<dyn Any + Send>) -> BoxError {
    let msg = match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(s) => (*s).to_owned(),
            Err(_) => String::from("Box<dyn Any>"),
        },
    };
    Box::new(DispatchError::Panicked(msg))
}
