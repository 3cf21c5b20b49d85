//! Weighted random selection strategy.

use std::sync::Arc;

use rand::Rng;

use crate::load_balancer::{instance::ServiceInstance, LoadBalancer};

/// Weighted random selector.
///
/// Draws a uniform value in `[0, total_weight)` over the healthy instances
/// and walks the list subtracting each weight until the remainder goes
/// negative. Each healthy instance is selected with probability
/// `weight / total_weight` without any cumulative pre-computation per call.
#[derive(Debug, Default)]
pub struct WeightedRandom;

impl WeightedRandom {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for WeightedRandom {
    fn select(&self, instances: &[Arc<ServiceInstance>]) -> Option<Arc<ServiceInstance>> {
        let healthy: Vec<&Arc<ServiceInstance>> =
            instances.iter().filter(|i| i.is_healthy()).collect();

        let total_weight: u64 = healthy.iter().map(|i| u64::from(i.weight)).sum();
        if total_weight == 0 {
            return None;
        }

        let mut remainder = rand::thread_rng().gen_range(0..total_weight) as i64;
        for instance in &healthy {
            remainder -= i64::from(instance.weight);
            if remainder < 0 {
                return Some(Arc::clone(instance));
            }
        }

        // Unreachable with a correct draw; guard against weight overflow edge.
        healthy.last().map(|i| Arc::clone(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(port: u16, weight: u32) -> Arc<ServiceInstance> {
        Arc::new(ServiceInstance::new(
            format!("http://127.0.0.1:{}", port).parse().unwrap(),
            weight,
        ))
    }

    #[test]
    fn selection_frequency_tracks_weights() {
        let lb = WeightedRandom::new();
        let a = instance(3001, 1);
        let b = instance(3002, 3);
        let instances = vec![a.clone(), b.clone()];

        let draws = 20_000;
        let mut a_hits = 0usize;
        for _ in 0..draws {
            let selected = lb.select(&instances).unwrap();
            if selected.address == a.address {
                a_hits += 1;
            }
        }

        // Expected share for `a` is 0.25; allow generous slack for randomness.
        let share = a_hits as f64 / draws as f64;
        assert!((0.20..=0.30).contains(&share), "share was {}", share);
    }

    #[test]
    fn unhealthy_instances_are_never_selected() {
        let lb = WeightedRandom::new();
        let a = instance(3001, 10);
        let b = instance(3002, 1);
        a.mark_unhealthy();
        let instances = vec![a.clone(), b.clone()];

        for _ in 0..1_000 {
            let selected = lb.select(&instances).unwrap();
            assert_eq!(selected.address, b.address);
        }
    }

    #[test]
    fn no_healthy_instance_yields_none() {
        let lb = WeightedRandom::new();
        let a = instance(3001, 1);
        a.mark_unhealthy();
        assert!(lb.select(&[a]).is_none());
        assert!(lb.select(&[]).is_none());
    }
}
