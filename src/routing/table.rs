//! Immutable route table built from configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{CacheRouteConfig, GatewayConfig, RateQuotaConfig};
use crate::load_balancer::pool::InstancePool;
use crate::resilience::BreakerConfig;

/// One configured upstream service, fully resolved.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub version: String,
    pub path_prefix: String,
    pub pool: InstancePool,
    /// Per-call upstream timeout.
    pub timeout: Duration,
    pub breaker: BreakerConfig,
    /// Route quota; `None` falls back to the limiter's default.
    pub quota: Option<RateQuotaConfig>,
    pub cache: CacheRouteConfig,
    /// Scopes the principal must carry; empty means any authenticated caller.
    pub required_scopes: Vec<String>,
}

/// Immutable snapshot of all configured routes.
///
/// Rebuilt wholesale on config reload and swapped in atomically, so a
/// request always sees one consistent table.
#[derive(Debug)]
pub struct RouteTable {
    /// Sorted by prefix length, longest first.
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut routes: Vec<Arc<Route>> = config
            .routes
            .iter()
            .map(|r| {
                Arc::new(Route {
                    name: r.name.clone(),
                    version: r.version.clone(),
                    path_prefix: r.path_prefix.clone(),
                    pool: InstancePool::from_config(&r.instances),
                    timeout: Duration::from_millis(r.timeout_ms),
                    breaker: BreakerConfig {
                        failure_threshold: r.breaker.failure_threshold,
                        success_threshold: r.breaker.success_threshold,
                        reset_timeout: Duration::from_millis(r.breaker.reset_timeout_ms),
                        window: Duration::from_millis(r.breaker.window_ms),
                    },
                    quota: r.rate_limit.clone(),
                    cache: r.cache.clone(),
                    required_scopes: r.required_scopes.clone(),
                })
            })
            .collect();

        routes.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));

        Self { routes }
    }

    /// Resolve a request path to its route. The longest matching prefix
    /// wins, so `/api/orders/items` beats `/api/orders`.
    pub fn match_path(&self, path: &str) -> Option<Arc<Route>> {
        self.routes
            .iter()
            .find(|route| path.starts_with(&route.path_prefix))
            .cloned()
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceRouteConfig;

    fn config_with(prefixes: &[(&str, &str)]) -> GatewayConfig {
        GatewayConfig {
            routes: prefixes
                .iter()
                .map(|(name, prefix)| ServiceRouteConfig {
                    name: name.to_string(),
                    path_prefix: prefix.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let table = RouteTable::from_config(&config_with(&[
            ("orders", "/api/orders"),
            ("order-items", "/api/orders/items"),
            ("catchall", "/api"),
        ]));

        assert_eq!(table.match_path("/api/orders/items/7").unwrap().name, "order-items");
        assert_eq!(table.match_path("/api/orders/7").unwrap().name, "orders");
        assert_eq!(table.match_path("/api/users").unwrap().name, "catchall");
        assert!(table.match_path("/health").is_none());
    }

    #[test]
    fn empty_table_matches_nothing() {
        let table = RouteTable::from_config(&config_with(&[]));
        assert!(table.match_path("/api/orders").is_none());
    }
}
