use crate::dispatch::{cancellation, BoxFuture, Dispatcher};

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::Service;

type Request = hyper::Request<Incoming>;
type Response = hyper::Response<Full<Bytes>>;

/// Serves a [`Dispatcher`] on a hyper connection.
///
/// The request body is buffered before dispatch. Dropping the response future
/// (the client went away) cancels the request's [`Cancellation`](crate::dispatch::Cancellation).
#[derive(Clone)]
pub struct DispatchService {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchService {
    pub fn new(dispatcher: impl Into<Arc<Dispatcher>>) -> Self {
        Self {
            dispatcher: dispatcher.into(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl Service<Request> for DispatchService {
    type Response = Response;
    type Error = hyper::Error;
    type Future = BoxFuture<'static, Result<Response, hyper::Error>>;

    fn call(&self, req: Request) -> Self::Future {
        let dispatcher = Arc::clone(&self.dispatcher);
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = body.collect().await?.to_bytes();

            let (handle, cancel) = cancellation();
            let guard = handle.cancel_on_drop();
            let res = dispatcher
                .handle_with(http::Request::from_parts(parts, body), cancel)
                .await;
            guard.disarm();

            Ok(res.map(Full::new))
        })
    }
}

impl Dispatcher {
    pub fn into_service(self) -> DispatchService {
        DispatchService::new(self)
    }
}
