use super::{BoxFuture, Context, Next, Outcome};

use std::sync::Arc;

/// A link in a handler chain.
///
/// A handler gets the request context and a [`Next`] continuation for the rest
/// of the chain. It may await `next.run(cx)` and post-process the result, or
/// answer without it.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Outcome>;
}

pub type SharedHandler = Arc<dyn Handler>;

pub struct HandlerFn<F> {
    f: F,
}

/// Wraps a closure as a [`Handler`].
///
/// ```
/// use switchback::dispatch::{handler_fn, Outcome};
///
/// let hello = handler_fn(|cx, _next| {
///     Box::pin(async move { Outcome::text(format!("hello {}", cx.param("name").unwrap_or("world"))) })
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Outcome> + Send + Sync + 'static,
{
    HandlerFn { f }
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Outcome> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Outcome> {
        (self.f)(cx, next)
    }
}

/// Handlers as accepted by registration: single handlers or arbitrarily nested groups.
pub enum HandlerTree {
    Leaf(SharedHandler),
    Group(Vec<HandlerTree>),
}

impl HandlerTree {
    /// Flattens depth-first into registration order.
    pub fn flatten(self) -> Vec<SharedHandler> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            match tree {
                Self::Leaf(h) => out.push(h),
                Self::Group(children) => stack.extend(children.into_iter().rev()),
            }
        }
        out
    }
}

pub trait IntoHandlers {
    fn into_tree(self) -> HandlerTree;
}

impl<H: Handler> IntoHandlers for H {
    fn into_tree(self) -> HandlerTree {
        HandlerTree::Leaf(Arc::new(self))
    }
}

impl IntoHandlers for SharedHandler {
    fn into_tree(self) -> HandlerTree {
        HandlerTree::Leaf(self)
    }
}

impl IntoHandlers for HandlerTree {
    fn into_tree(self) -> HandlerTree {
        self
    }
}

impl<T: IntoHandlers> IntoHandlers for Vec<T> {
    fn into_tree(self) -> HandlerTree {
        HandlerTree::Group(self.into_iter().map(IntoHandlers::into_tree).collect())
    }
}

impl<T: IntoHandlers, const N: usize> IntoHandlers for [T; N] {
    fn into_tree(self) -> HandlerTree {
        HandlerTree::Group(self.into_iter().map(IntoHandlers::into_tree).collect())
    }
}
