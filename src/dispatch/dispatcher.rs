use super::next::{recover, run_matched};
use super::{fallback, Cancellation, Context, Outcome, SharedHandler};
use crate::config::Config;
use crate::router::{CacheStats, MatchCache, Matched, RouteTable};
use crate::{Request, Response};

use std::sync::Arc;

use http::Method;
use tracing::debug;

/// The serving half: frozen routes, a match cache, and both fallback chains.
///
/// Built by [`Router::build`](super::Router::build); there is no way to add
/// registrations afterwards.
pub struct Dispatcher {
    cache: MatchCache<SharedHandler>,
    not_found: Vec<SharedHandler>,
    on_error: Vec<SharedHandler>,
    config: Config,
}

impl Dispatcher {
    pub(super) fn new(
        table: RouteTable<SharedHandler>,
        not_found: Vec<SharedHandler>,
        on_error: Vec<SharedHandler>,
        config: Config,
    ) -> Self {
        Self {
            cache: MatchCache::new(table, config.cache_capacity),
            not_found,
            on_error,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable<SharedHandler> {
        self.cache.table()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub(super) fn error_chain(&self) -> &[SharedHandler] {
        &self.on_error
    }

    /// The handlers a request would walk, not-found handlers included.
    pub fn find(&self, method: &Method, path: &str) -> Arc<[Matched<SharedHandler>]> {
        self.cache.find(method, path, &self.not_found)
    }

    pub async fn handle(&self, request: Request) -> Response {
        self.handle_with(request, Cancellation::never()).await
    }

    /// Always produces a response: unmatched requests end in the not-found
    /// chain and faults end in the error chain, each with a built-in last resort.
    pub async fn handle_with(&self, request: Request, cancel: Cancellation) -> Response {
        let mut cx = Context::new(request, cancel);
        let matched = self.find(cx.method(), cx.path());

        let res = match run_matched(self, &matched, 0, &mut cx).await {
            Outcome::Response(res) => res,
            Outcome::Continue => fallback::not_found(self.config.mode, &cx),
            Outcome::Fault(err) => recover(self, &mut cx, err).await,
        };

        debug!(
            method = %cx.method(),
            path = %cx.path(),
            status = res.status().as_u16(),
            elapsed = ?cx.elapsed(),
            "dispatched"
        );
        res
    }
}
