//! Server selection.
//!
//! The two configuration flags resolve to exactly one mode:
//!
//! | random | round_robin | mode                                              |
//! |--------|-------------|---------------------------------------------------|
//! | false  | false       | registry order, attempt `n` goes to server `n`    |
//! | false  | true        | shared cursor advancing by one per attempt        |
//! | true   | false       | uniform pick per attempt                          |
//! | true   | true        | shared cursor starting at a random offset         |
//!
//! In every mode except `Random`, consecutive attempts of one request go to
//! different servers whenever more than one is available.

use rand::Rng;
use registry::ServerAddress;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::BalancerConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceMode {
    Ordered,
    RoundRobin,
    Random,
    RandomRoundRobin,
}

impl From<BalancerConfig> for BalanceMode {
    fn from(config: BalancerConfig) -> Self {
        match (config.random, config.round_robin) {
            (false, false) => BalanceMode::Ordered,
            (false, true) => BalanceMode::RoundRobin,
            (true, false) => BalanceMode::Random,
            (true, true) => BalanceMode::RandomRoundRobin,
        }
    }
}

#[derive(Debug)]
pub struct Balancer {
    mode: BalanceMode,
    cursor: AtomicUsize,
}

impl Balancer {
    pub fn new(mode: BalanceMode) -> Self {
        let start = match mode {
            BalanceMode::RandomRoundRobin => rand::thread_rng().gen_range(0..u32::MAX as usize),
            _ => 0,
        };

        Balancer {
            mode,
            cursor: AtomicUsize::new(start),
        }
    }

    pub fn mode(&self) -> BalanceMode {
        self.mode
    }

    /// Picks the server for the given zero-based attempt of a request.
    /// Returns `None` only when `servers` is empty.
    pub fn select<'a>(
        &self,
        servers: &'a [ServerAddress],
        attempt: usize,
    ) -> Option<&'a ServerAddress> {
        if servers.is_empty() {
            return None;
        }

        let index = match self.mode {
            BalanceMode::Ordered => attempt % servers.len(),
            BalanceMode::Random => rand::thread_rng().gen_range(0..servers.len()),
            BalanceMode::RoundRobin | BalanceMode::RandomRoundRobin => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % servers.len()
            }
        };

        servers.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn servers(n: u16) -> Vec<ServerAddress> {
        (0..n)
            .map(|i| ServerAddress::new(format!("10.0.0.{i}"), 8080))
            .collect()
    }

    #[test]
    fn test_mode_resolution() {
        let mode = |random, round_robin| {
            BalanceMode::from(BalancerConfig {
                random,
                round_robin,
            })
        };
        assert_eq!(mode(false, false), BalanceMode::Ordered);
        assert_eq!(mode(false, true), BalanceMode::RoundRobin);
        assert_eq!(mode(true, false), BalanceMode::Random);
        assert_eq!(mode(true, true), BalanceMode::RandomRoundRobin);
    }

    #[test]
    fn test_ordered() {
        let servers = servers(3);
        let balancer = Balancer::new(BalanceMode::Ordered);

        // Every request starts again from the first server
        for _ in 0..2 {
            let picked: Vec<_> = (0..4)
                .map(|attempt| balancer.select(&servers, attempt).unwrap().host.clone())
                .collect();
            assert_eq!(picked, ["10.0.0.0", "10.0.0.1", "10.0.0.2", "10.0.0.0"]);
        }
    }

    #[test]
    fn test_round_robin_is_shared_across_requests() {
        let servers = servers(3);
        let balancer = Balancer::new(BalanceMode::RoundRobin);

        let picked: Vec<_> = (0..6)
            .map(|_| balancer.select(&servers, 0).unwrap().host.clone())
            .collect();
        assert_eq!(
            picked,
            [
                "10.0.0.0", "10.0.0.1", "10.0.0.2", "10.0.0.0", "10.0.0.1", "10.0.0.2"
            ]
        );
    }

    #[test]
    fn test_random_round_robin_visits_every_server() {
        let servers = servers(4);
        let balancer = Balancer::new(BalanceMode::RandomRoundRobin);

        let picked: HashSet<_> = (0..4)
            .map(|attempt| balancer.select(&servers, attempt).unwrap().clone())
            .collect();
        assert_eq!(picked.len(), 4);
    }

    #[test]
    fn test_random_stays_in_bounds() {
        let servers = servers(2);
        let balancer = Balancer::new(BalanceMode::Random);

        for attempt in 0..50 {
            assert!(servers.contains(balancer.select(&servers, attempt).unwrap()));
        }
    }

    #[test]
    fn test_empty_pool() {
        for mode in [
            BalanceMode::Ordered,
            BalanceMode::RoundRobin,
            BalanceMode::Random,
            BalanceMode::RandomRoundRobin,
        ] {
            assert!(Balancer::new(mode).select(&[], 0).is_none());
        }
    }
}
