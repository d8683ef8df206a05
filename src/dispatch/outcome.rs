use crate::error::BoxError;
use crate::Response;

use std::error::Error as StdError;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;

pub(crate) const TEXT_PLAIN: &str = "text/plain";
pub(crate) const TEXT_HTML: &str = "text/html; charset=utf-8";

/// What a handler produced.
#[derive(Debug)]
pub enum Outcome {
    /// Ends the chain; earlier handlers awaiting `next` receive it.
    Response(Response),
    /// Run the rest of the chain, as if the handler had called `next` itself.
    Continue,
    /// Abandon the chain and enter the error handlers.
    Fault(BoxError),
}

impl Outcome {
    pub fn text(body: impl Into<Bytes>) -> Self {
        Self::status(StatusCode::OK, body)
    }

    pub fn status(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::Response(build(status, TEXT_PLAIN, body.into()))
    }

    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::Response(build(StatusCode::OK, TEXT_HTML, body.into()))
    }

    pub fn fail(err: impl Into<BoxError>) -> Self {
        Self::Fault(err.into())
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Self::Response(_))
    }

    pub fn response_mut(&mut self) -> Option<&mut Response> {
        match self {
            Self::Response(res) => Some(res),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(res) => Some(res),
            _ => None,
        }
    }
}

impl From<Response> for Outcome {
    fn from(res: Response) -> Self {
        Self::Response(res)
    }
}

impl From<Option<Response>> for Outcome {
    fn from(res: Option<Response>) -> Self {
        res.map_or(Self::Continue, Self::Response)
    }
}

impl From<()> for Outcome {
    fn from((): ()) -> Self {
        Self::Continue
    }
}

impl From<Interrupt> for Outcome {
    fn from(i: Interrupt) -> Self {
        match i {
            Interrupt::Respond(res) => Self::Response(res),
            Interrupt::Fault(err) => Self::Fault(err),
        }
    }
}

impl<T: Into<Outcome>> From<Result<T, Interrupt>> for Outcome {
    fn from(ret: Result<T, Interrupt>) -> Self {
        match ret {
            Ok(t) => t.into(),
            Err(i) => i.into(),
        }
    }
}

/// Early exit carried through `?`.
///
/// Any error converts into a fault; [`Interrupt::respond`] short-circuits
/// with a finished response instead, which is not treated as a failure.
#[derive(Debug)]
pub enum Interrupt {
    Respond(Response),
    Fault(BoxError),
}

impl Interrupt {
    pub fn respond(res: Response) -> Self {
        Self::Respond(res)
    }

    pub fn fail(err: impl Into<BoxError>) -> Self {
        Self::Fault(err.into())
    }
}

impl<E> From<E> for Interrupt
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::Fault(Box::new(err))
    }
}

pub(crate) fn build(status: StatusCode, content_type: &'static str, body: Bytes) -> Response {
    let mut res = Response::new(body);
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    res
}
