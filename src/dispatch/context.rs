use crate::error::BoxError;
use crate::pattern::Params;
use crate::Request;

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};
use tokio::sync::watch;

/// Per-request state, exclusively owned by one dispatch.
#[derive(Debug)]
pub struct Context {
    request: Request,
    params: Params,
    locals: Extensions,
    error: Option<BoxError>,
    started: Instant,
    cancel: Cancellation,
}

impl Context {
    pub fn new(request: Request, cancel: Cancellation) -> Self {
        Self {
            request,
            params: Params::new(),
            locals: Extensions::new(),
            error: None,
            started: Instant::now(),
            cancel,
        }
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Parameters of the registration currently running.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Typed scratch space shared by every handler of this request.
    pub fn locals(&self) -> &Extensions {
        &self.locals
    }

    pub fn locals_mut(&mut self) -> &mut Extensions {
        &mut self.locals
    }

    /// The fault being handled, inside the error chain.
    pub fn error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.error.as_deref()
    }

    pub fn take_error(&mut self) -> Option<BoxError> {
        self.error.take()
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub(crate) fn set_error(&mut self, err: BoxError) {
        self.error = Some(err);
    }
}

/// Observes whether the transport gave up on the request.
///
/// A [`CancelGuard`] fires when the dispatch future holding it is dropped,
/// which also drops the handlers awaiting inside that dispatch. Only clones
/// that outlive it, such as one moved into a spawned task, see that signal.
/// Code still running in the dispatch observes cancellation only when the
/// [`CancelHandle`] is fired directly.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
}

/// Fires the paired [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancellation { rx: Some(rx) })
}

impl Cancellation {
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map_or(false, |rx| *rx.borrow())
    }

    /// Resolves once cancelled. Pends forever if the handle is dropped unfired.
    pub async fn cancelled(&self) {
        if let Some(rx) = &self.rx {
            let mut rx = rx.clone();
            let fired = rx.wait_for(|&c| c).await.is_ok();
            if fired {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Cancels when the returned guard is dropped without being disarmed.
    pub fn cancel_on_drop(self) -> CancelGuard {
        CancelGuard { handle: Some(self) }
    }
}

#[derive(Debug)]
pub struct CancelGuard {
    handle: Option<CancelHandle>,
}

impl CancelGuard {
    pub fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}
