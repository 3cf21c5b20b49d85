//! Per-service instance pools.
//!
//! # Responsibilities
//! - Hold the instances configured for one upstream service
//! - Apply the selection strategy to pick a healthy instance

use std::sync::Arc;

use crate::config::schema::InstanceConfig;
use crate::load_balancer::{instance::ServiceInstance, weighted::WeightedRandom, LoadBalancer};

/// The set of instances backing one upstream service.
#[derive(Debug)]
pub struct InstancePool {
    instances: Vec<Arc<ServiceInstance>>,
    balancer: Box<dyn LoadBalancer>,
}

impl InstancePool {
    /// Build a pool from configuration, skipping unparseable addresses.
    pub fn from_config(configs: &[InstanceConfig]) -> Self {
        let mut instances = Vec::with_capacity(configs.len());
        for config in configs {
            match config.address.parse() {
                Ok(address) => {
                    instances.push(Arc::new(ServiceInstance::new(address, config.weight.max(1))));
                }
                Err(e) => {
                    tracing::warn!(address = %config.address, error = %e, "Skipping invalid instance address");
                }
            }
        }

        Self {
            instances,
            balancer: Box::new(WeightedRandom::new()),
        }
    }

    /// Select a healthy instance, or `None` when the service is unavailable.
    pub fn select(&self) -> Option<Arc<ServiceInstance>> {
        self.balancer.select(&self.instances)
    }

    /// All instances, healthy or not (for the status surface and health checks).
    pub fn instances(&self) -> &[Arc<ServiceInstance>] {
        &self.instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_selects_only_healthy() {
        let pool = InstancePool::from_config(&[
            InstanceConfig {
                address: "http://127.0.0.1:3001".into(),
                weight: 1,
            },
            InstanceConfig {
                address: "http://127.0.0.1:3002".into(),
                weight: 1,
            },
        ]);

        pool.instances()[0].mark_unhealthy();
        for _ in 0..100 {
            let selected = pool.select().unwrap();
            assert_eq!(selected.address.port(), Some(3002));
        }

        pool.instances()[1].mark_unhealthy();
        assert!(pool.select().is_none());
    }

    #[test]
    fn invalid_addresses_are_skipped() {
        let pool = InstancePool::from_config(&[InstanceConfig {
            address: "not a url".into(),
            weight: 1,
        }]);
        assert!(pool.instances().is_empty());
        assert!(pool.select().is_none());
    }
}
