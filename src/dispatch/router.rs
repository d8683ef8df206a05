use super::{Dispatcher, HandlerTree, IntoHandlers, SharedHandler};
use crate::config::Config;
use crate::error::RouterError;
use crate::pattern::{Pattern, UnsafePattern};
use crate::router::{compare_specificity, MethodFilter, RouteTable};

use http::Method;

/// The setup half. Registration methods panic on an invalid pattern; the
/// `try_` forms return the error instead.
pub struct Router {
    table: RouteTable<SharedHandler>,
    not_found: Vec<SharedHandler>,
    on_error: Vec<SharedHandler>,
    config: Config,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            table: RouteTable::new(),
            not_found: Vec::new(),
            on_error: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Settings are read once, by [`build`](Self::build).
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn routes(&self) -> &RouteTable<SharedHandler> {
        &self.table
    }

    pub fn on(
        &mut self,
        method: impl Into<MethodFilter>,
        pattern: impl Into<Pattern>,
        handlers: impl IntoHandlers,
    ) -> &mut Self {
        let pattern = pattern.into();
        let source = pattern.as_str().to_owned();
        if let Err(e) = self.try_on(method, pattern, handlers) {
            panic!("{}: pattern = {:?}", e, source);
        }
        self
    }

    /// Registers each flattened handler as its own registration, in order.
    pub fn try_on(
        &mut self,
        method: impl Into<MethodFilter>,
        pattern: impl Into<Pattern>,
        handlers: impl IntoHandlers,
    ) -> Result<&mut Self, RouterError> {
        let handlers = handlers.into_tree().flatten();
        self.table.try_extend(method, pattern, handlers)?;
        Ok(self)
    }

    pub fn all(&mut self, pattern: impl Into<Pattern>, handlers: impl IntoHandlers) -> &mut Self {
        self.on(MethodFilter::All, pattern, handlers)
    }

    /// Runs `handlers` for every method and path, ahead of anything registered later.
    pub fn middleware(&mut self, handlers: impl IntoHandlers) -> &mut Self {
        self.on(MethodFilter::All, "*", handlers)
    }

    pub fn on_not_found(&mut self, handlers: impl IntoHandlers) -> &mut Self {
        self.not_found.extend(handlers.into_tree().flatten());
        self
    }

    pub fn on_error(&mut self, handlers: impl IntoHandlers) -> &mut Self {
        self.on_error.extend(handlers.into_tree().flatten());
        self
    }

    pub fn mount_ranked<I, M, H>(&mut self, routes: I) -> &mut Self
    where
        I: IntoIterator<Item = (M, String, H)>,
        M: Into<MethodFilter>,
        H: IntoHandlers,
    {
        if let Err(e) = self.try_mount_ranked(routes) {
            panic!("{}", e);
        }
        self
    }

    /// Registers routes discovered from structure, most specific first.
    /// Equally specific routes keep their given order.
    pub fn try_mount_ranked<I, M, H>(&mut self, routes: I) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = (M, String, H)>,
        M: Into<MethodFilter>,
        H: IntoHandlers,
    {
        let mut routes: Vec<(MethodFilter, String, HandlerTree)> = routes
            .into_iter()
            .map(|(m, p, h)| (m.into(), p, h.into_tree()))
            .collect();
        routes.sort_by(|a, b| compare_specificity(&a.1, &b.1));
        for (method, pattern, handlers) in routes {
            self.try_on(method, pattern, handlers)?;
        }
        Ok(self)
    }

    /// Reruns the backtracking detector over every registration.
    pub fn validate(&self) -> Vec<UnsafePattern> {
        self.table.audit()
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher::new(self.table, self.not_found, self.on_error, self.config)
    }
}

macro_rules! define_method {
    ($name:tt, $method:tt) => {
        pub fn $name(&mut self, pattern: impl Into<Pattern>, handlers: impl IntoHandlers) -> &mut Self {
            self.on(Method::$method, pattern, handlers)
        }
    };
}

impl Router {
    define_method!(get, GET);
    define_method!(post, POST);
    define_method!(put, PUT);
    define_method!(delete, DELETE);
    define_method!(head, HEAD);
    define_method!(options, OPTIONS);
    define_method!(connect, CONNECT);
    define_method!(patch, PATCH);
    define_method!(trace, TRACE);
}
