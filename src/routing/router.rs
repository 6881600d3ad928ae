//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the matching route for a method and path
//! - Build the upstream URL for a match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over routes (acceptable for typical route counts)
//! - Explicit `None` rather than a silent default route

use std::sync::Arc;

use http::Method;
use serde::Serialize;
use url::Url;

use crate::config::RouteConfig;
use crate::routing::matcher::{has_dot_segments, MethodSet, PathPrefix};

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route '{route}': invalid target: {source}")]
    Target {
        route: String,
        #[source]
        source: url::ParseError,
    },
    #[error("route '{route}': invalid method '{method}'")]
    Method { route: String, method: String },
}

/// A compiled gateway route.
#[derive(Debug, Clone)]
pub struct ProxyRoute {
    name: String,
    prefix: PathPrefix,
    methods: MethodSet,
    target: Url,
    streaming: bool,
}

impl ProxyRoute {
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteError> {
        let target = Url::parse(&config.target).map_err(|source| RouteError::Target {
            route: config.name.clone(),
            source,
        })?;
        let methods = config
            .methods
            .iter()
            .map(|m| {
                m.to_ascii_uppercase().parse::<Method>().map_err(|_| RouteError::Method {
                    route: config.name.clone(),
                    method: m.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: config.name.clone(),
            prefix: PathPrefix::new(&config.path),
            methods: MethodSet::new(methods),
            target,
            streaming: config.streaming,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_str()
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn streaming(&self) -> bool {
        self.streaming
    }

    /// `target + suffix (+ ?query)`.
    pub fn upstream_url(&self, suffix: &str, query: Option<&str>) -> Result<Url, url::ParseError> {
        let base = self.target.as_str().trim_end_matches('/');
        let mut url = format!("{}{}", base, suffix);
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(q);
        }
        Url::parse(&url)
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<ProxyRoute>,
    /// Path remaining after the route prefix; empty or starting with `/`.
    pub suffix: String,
}

/// Serializable view of a route for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub name: String,
    pub path: String,
    pub methods: Vec<String>,
    pub target: String,
    pub streaming: bool,
}

/// Ordered, immutable set of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<ProxyRoute>>,
}

impl RouteTable {
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, RouteError> {
        let routes = routes
            .iter()
            .map(|r| ProxyRoute::from_config(r).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { routes })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Longest matching prefix among routes allowing `method`; the earlier
    /// route wins a tie. Paths with dot segments match nothing.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        if has_dot_segments(path) {
            return None;
        }
        let mut best: Option<(&Arc<ProxyRoute>, &str)> = None;
        for route in &self.routes {
            if !route.methods.allows(method) {
                continue;
            }
            let Some(suffix) = route.prefix.strip(path) else {
                continue;
            };
            let longer = match best {
                Some((current, _)) => route.prefix.len() > current.prefix.len(),
                None => true,
            };
            if longer {
                best = Some((route, suffix));
            }
        }

        best.map(|(route, suffix)| RouteMatch {
            route: route.clone(),
            suffix: suffix.to_string(),
        })
    }

    pub fn summaries(&self) -> Vec<RouteSummary> {
        self.routes
            .iter()
            .map(|r| RouteSummary {
                name: r.name.clone(),
                path: r.prefix().to_string(),
                methods: r.methods.iter().map(|m| m.to_string()).collect(),
                target: r.target.to_string(),
                streaming: r.streaming,
            })
            .collect()
    }
}
