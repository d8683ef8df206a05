use crate::error::RouterError;
use crate::pattern::{self, Matcher, Params, Pattern, UnsafePattern};

use http::Method;
use smallvec::SmallVec;
use tracing::warn;

/// Which request methods a registration answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    All,
    Only(SmallVec<[Method; 2]>),
}

impl MethodFilter {
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            Self::All => true,
            Self::Only(methods) => methods.iter().any(|m| m == method),
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(m: Method) -> Self {
        Self::Only(SmallVec::from_elem(m, 1))
    }
}

impl From<&Method> for MethodFilter {
    fn from(m: &Method) -> Self {
        Self::from(m.clone())
    }
}

impl From<&[Method]> for MethodFilter {
    fn from(ms: &[Method]) -> Self {
        Self::Only(ms.iter().cloned().collect())
    }
}

impl<const N: usize> From<[Method; N]> for MethodFilter {
    fn from(ms: [Method; N]) -> Self {
        Self::Only(ms.into_iter().collect())
    }
}

impl From<Vec<Method>> for MethodFilter {
    fn from(ms: Vec<Method>) -> Self {
        Self::Only(ms.into_iter().collect())
    }
}

/// One `(method filter, matcher, data)` entry. Immutable once created.
#[derive(Debug, Clone)]
pub struct Registration<T> {
    method: MethodFilter,
    matcher: Matcher,
    data: T,
}

impl<T> Registration<T> {
    pub fn new(method: impl Into<MethodFilter>, matcher: Matcher, data: T) -> Self {
        Self {
            method: method.into(),
            matcher,
            data,
        }
    }

    pub fn method(&self) -> &MethodFilter {
        &self.method
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn pattern(&self) -> &str {
        self.matcher.source()
    }
}

/// A registration that accepted a path, with the parameters it extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched<T> {
    pub data: T,
    pub params: Params,
}

/// Registrations in insertion order, scanned linearly.
///
/// Every registration that accepts the path contributes a result, so layered
/// wildcard middleware ahead of a specific route runs before it.
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    registrations: Vec<Registration<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Registration<T>> {
        self.registrations.iter()
    }

    pub fn add(
        &mut self,
        method: impl Into<MethodFilter>,
        pattern: impl Into<Pattern>,
        data: T,
    ) -> &mut Self {
        let pattern = pattern.into();
        let source = pattern.as_str().to_owned();
        if let Err(e) = self.try_add(method, pattern, data) {
            panic!("{}: pattern = {:?}", e, source);
        }
        self
    }

    pub fn try_add(
        &mut self,
        method: impl Into<MethodFilter>,
        pattern: impl Into<Pattern>,
        data: T,
    ) -> Result<&mut Self, RouterError> {
        self.try_extend(method, pattern, Some(data))
    }

    /// Compiles `pattern` once and registers it for each item of `data`, in order.
    pub fn try_extend(
        &mut self,
        method: impl Into<MethodFilter>,
        pattern: impl Into<Pattern>,
        data: impl IntoIterator<Item = T>,
    ) -> Result<&mut Self, RouterError> {
        let method = method.into();
        let matcher = pattern::compile(pattern)?;
        if let Some(found) = matcher.audit() {
            warn!(pattern = %found.pattern, reason = ?found.reason, "{}", found);
        }
        self.registrations.extend(
            data.into_iter()
                .map(|data| Registration::new(method.clone(), matcher.clone(), data)),
        );
        Ok(self)
    }

    pub fn push(&mut self, registration: Registration<T>) -> &mut Self {
        self.registrations.push(registration);
        self
    }

    /// Reruns the backtracking detector over every registration.
    pub fn audit(&self) -> Vec<UnsafePattern> {
        self.registrations
            .iter()
            .filter_map(|r| r.matcher.audit())
            .collect()
    }
}

impl<T: Clone> RouteTable<T> {
    /// Collects every registration accepting `(method, path)` in insertion order,
    /// then appends `fallbacks` with empty parameters.
    pub fn find(&self, method: &Method, path: &str, fallbacks: &[T]) -> Vec<Matched<T>> {
        let mut matched = Vec::with_capacity(fallbacks.len() + 2);
        for r in &self.registrations {
            if !r.method.accepts(method) {
                continue;
            }
            if let Some(params) = r.matcher.find(path) {
                matched.push(Matched {
                    data: r.data.clone(),
                    params,
                });
            }
        }
        matched.extend(fallbacks.iter().map(|data| Matched {
            data: data.clone(),
            params: Params::new(),
        }));
        matched
    }
}
