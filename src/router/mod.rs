//! Path-to-controller resolution.
//!
//! The router walks path components in order, growing a `/`-joined
//! namespace name one component at a time and asking the registry for it.
//! The first matching prefix wins and walking stops there, even when a
//! deeper registration shares the leading segment; a controller registered
//! under `admin/widgets` is unreachable while `admin` is also registered.
//! This mirrors the historical behavior on purpose.

use crate::controller::Controller;
use crate::error::{ServerError, ServerResult};
use crate::registry::ControllerRegistry;
use crate::url::UrlPath;
use std::sync::Arc;
use tracing::{debug, warn};

/// A resolved pairing of controller and residual path.
pub struct ResolvedRoute {
    pub controller: Arc<dyn Controller>,
    /// The registered (case-normalized) name the controller matched under.
    pub name: String,
    /// Number of leading path components consumed by the match.
    pub consumed: usize,
    /// Components after the consumed prefix; the first, when present, is
    /// the action name.
    pub remaining: Vec<String>,
}

pub struct Router<'a> {
    registry: &'a ControllerRegistry,
}

impl<'a> Router<'a> {
    pub fn new(registry: &'a ControllerRegistry) -> Router<'a> {
        Router { registry }
    }

    /// Resolve a path (already stripped of its extension) to a controller.
    ///
    /// An empty component list fails with `NotFound` immediately: default
    /// substitution for the root URL is the URL filter's job, not the
    /// router's.
    pub fn resolve(&self, path: &UrlPath) -> ServerResult<ResolvedRoute> {
        let components = path.components();
        if components.is_empty() {
            warn!(path = %path, "no path components to route");
            return Err(ServerError::NotFound);
        }

        let mut accumulated = String::new();
        for (index, component) in components.iter().enumerate() {
            if !accumulated.is_empty() {
                accumulated.push('/');
            }
            accumulated.push_str(&component.to_lowercase());
            if let Some(controller) = self.registry.lookup(&accumulated) {
                let consumed = index + 1;
                debug!(controller = %accumulated, consumed, "controller resolved");
                return Ok(ResolvedRoute {
                    controller: Arc::clone(controller),
                    remaining: components[consumed..]
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                    name: accumulated,
                    consumed,
                });
            }
        }

        warn!(path = %path, "no controller matched any path prefix");
        Err(ServerError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ActionTable;

    struct Stub {
        actions: ActionTable,
    }

    impl Stub {
        fn new() -> Stub {
            Stub {
                actions: ActionTable::new(),
            }
        }
    }

    impl Controller for Stub {
        fn actions(&self) -> &ActionTable {
            &self.actions
        }
    }

    fn registry(names: &[&str]) -> ControllerRegistry {
        let mut registry = ControllerRegistry::new();
        for name in names {
            registry.register(name, Stub::new());
        }
        registry
    }

    #[test]
    fn an_empty_path_is_not_found() {
        let registry = registry(&["main"]);
        let result = Router::new(&registry).resolve(&UrlPath::new("/"));
        assert!(matches!(result, Err(ServerError::NotFound)));
    }

    #[test]
    fn a_single_component_resolves_case_insensitively() {
        let registry = registry(&["widgets"]);
        let route = Router::new(&registry)
            .resolve(&UrlPath::new("/Widgets/show"))
            .expect("route resolves");
        assert_eq!(route.name, "widgets");
        assert_eq!(route.consumed, 1);
        assert_eq!(route.remaining, vec!["show".to_string()]);
    }

    #[test]
    fn nested_namespaces_consume_multiple_components() {
        let registry = registry(&["admin/widgets"]);
        let route = Router::new(&registry)
            .resolve(&UrlPath::new("/Admin/Widgets/list/extra"))
            .expect("route resolves");
        assert_eq!(route.name, "admin/widgets");
        assert_eq!(route.consumed, 2);
        assert_eq!(
            route.remaining,
            vec!["list".to_string(), "extra".to_string()]
        );
    }

    #[test]
    fn no_matching_prefix_is_not_found() {
        let registry = registry(&["widgets"]);
        let result = Router::new(&registry).resolve(&UrlPath::new("/gadgets/show"));
        assert!(matches!(result, Err(ServerError::NotFound)));
    }

    // The shallow registration shadows the nested one: the walk stops at the
    // first match and never backtracks. Pinned on purpose.
    #[test]
    fn first_matching_prefix_wins_without_backtracking() {
        let registry = registry(&["admin", "admin/widgets"]);
        let route = Router::new(&registry)
            .resolve(&UrlPath::new("/admin/widgets"))
            .expect("route resolves");
        assert_eq!(route.name, "admin");
        assert_eq!(route.consumed, 1);
        assert_eq!(route.remaining, vec!["widgets".to_string()]);
    }
}
