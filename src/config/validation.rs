//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees syntactically.
//! Validation is a pure function returning all errors, not just the first,
//! and runs before a config is accepted into the system.

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::GatewayConfig;

/// One semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".into(),
            message: format!("not a valid socket address: '{}'", config.listener.bind_address),
        });
    }
    if config.listener.request_timeout_ms == 0 {
        errors.push(ValidationError {
            field: "listener.request_timeout_ms".into(),
            message: "must be positive".into(),
        });
    }

    let mut seen_names: HashSet<&str> = HashSet::new();
    let mut seen_prefixes: HashSet<&str> = HashSet::new();

    for (i, route) in config.routes.iter().enumerate() {
        let at = |field: &str| format!("routes[{}].{}", i, field);

        if route.name.is_empty() {
            errors.push(ValidationError {
                field: at("name"),
                message: "must not be empty".into(),
            });
        } else if !seen_names.insert(&route.name) {
            errors.push(ValidationError {
                field: at("name"),
                message: format!("duplicate service name '{}'", route.name),
            });
        }

        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError {
                field: at("path_prefix"),
                message: format!("must start with '/': '{}'", route.path_prefix),
            });
        } else if !seen_prefixes.insert(&route.path_prefix) {
            errors.push(ValidationError {
                field: at("path_prefix"),
                message: format!("duplicate path prefix '{}'", route.path_prefix),
            });
        }

        if route.timeout_ms == 0 {
            errors.push(ValidationError {
                field: at("timeout_ms"),
                message: "must be positive".into(),
            });
        }

        for (j, instance) in route.instances.iter().enumerate() {
            if url::Url::parse(&instance.address).is_err() {
                errors.push(ValidationError {
                    field: format!("routes[{}].instances[{}].address", i, j),
                    message: format!("not a valid URL: '{}'", instance.address),
                });
            }
            if instance.weight == 0 {
                errors.push(ValidationError {
                    field: format!("routes[{}].instances[{}].weight", i, j),
                    message: "must be at least 1".into(),
                });
            }
        }

        if route.breaker.failure_threshold == 0 {
            errors.push(ValidationError {
                field: at("breaker.failure_threshold"),
                message: "must be at least 1".into(),
            });
        }
        if route.breaker.success_threshold == 0 {
            errors.push(ValidationError {
                field: at("breaker.success_threshold"),
                message: "must be at least 1".into(),
            });
        }
        if route.breaker.reset_timeout_ms == 0 || route.breaker.window_ms == 0 {
            errors.push(ValidationError {
                field: at("breaker"),
                message: "reset_timeout_ms and window_ms must be positive".into(),
            });
        }

        if let Some(quota) = &route.rate_limit {
            if quota.requests_per_window == 0 || quota.window_ms == 0 {
                errors.push(ValidationError {
                    field: at("rate_limit"),
                    message: "requests_per_window and window_ms must be positive".into(),
                });
            }
        }

        if route.cache.enabled && route.cache.ttl_ms == 0 {
            errors.push(ValidationError {
                field: at("cache.ttl_ms"),
                message: "must be positive when caching is enabled".into(),
            });
        }
    }

    let defaults = &config.rate_limit.default_quota;
    if defaults.requests_per_window == 0 || defaults.window_ms == 0 {
        errors.push(ValidationError {
            field: "rate_limit.default_quota".into(),
            message: "requests_per_window and window_ms must be positive".into(),
        });
    }
    if config.rate_limit.max_identities == 0 {
        errors.push(ValidationError {
            field: "rate_limit.max_identities".into(),
            message: "must be at least 1".into(),
        });
    }

    if config.cache.max_entries == 0 || config.cache.max_bytes == 0 {
        errors.push(ValidationError {
            field: "cache".into(),
            message: "max_entries and max_bytes must be positive".into(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{InstanceConfig, ServiceRouteConfig};

    fn valid_route() -> ServiceRouteConfig {
        ServiceRouteConfig {
            name: "orders".into(),
            version: "v1".into(),
            path_prefix: "/orders".into(),
            instances: vec![InstanceConfig {
                address: "http://127.0.0.1:3000".into(),
                weight: 1,
            }],
            timeout_ms: 5_000,
            breaker: Default::default(),
            rate_limit: None,
            cache: Default::default(),
            required_scopes: Vec::new(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors_not_just_first() {
        let mut config = GatewayConfig::default();
        let mut bad = valid_route();
        bad.name = String::new();
        bad.path_prefix = "orders".into();
        bad.timeout_ms = 0;
        config.routes.push(bad);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3, "expected multiple errors, got {:?}", errors);
    }

    #[test]
    fn duplicate_prefixes_rejected() {
        let mut config = GatewayConfig::default();
        config.routes.push(valid_route());
        let mut second = valid_route();
        second.name = "orders-v2".into();
        config.routes.push(second);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("duplicate path prefix")));
    }

    #[test]
    fn zero_weight_rejected() {
        let mut config = GatewayConfig::default();
        let mut route = valid_route();
        route.instances[0].weight = 0;
        config.routes.push(route);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field.contains("weight")));
    }
}
