/// Rate and percentage derivation from successive counter readings

use std::time::Instant;

use log::debug;

use crate::core::counters::{
    CounterSource, CpuTimes, DiskCounters, MemCounters, NetCounters,
};

/// Derived metrics for one refresh cycle
///
/// Every percentage is within [0, 100] and every rate is >= 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// One entry per core; empty when CPU counters were unavailable
    pub cpu_percent: Vec<f64>,
    pub mem_percent: f64,
    pub swap_percent: f64,
    pub disk_percent: f64,
    /// Bytes per second
    pub net_rx_rate: f64,
    /// Bytes per second
    pub net_tx_rate: f64,
}

impl MetricsSnapshot {
    /// Mean load across cores
    pub fn cpu_average(&self) -> f64 {
        if self.cpu_percent.is_empty() {
            return 0.0;
        }
        self.cpu_percent.iter().sum::<f64>() / self.cpu_percent.len() as f64
    }
}

/// Raw readings gathered for one tick, `None` where the source failed
#[derive(Debug, Clone, Default)]
pub struct CounterReadings {
    pub cpu: Option<Vec<CpuTimes>>,
    pub memory: Option<MemCounters>,
    pub disk: Option<DiskCounters>,
    pub network: Option<NetCounters>,
}

impl CounterReadings {
    /// Read every counter once; failures are logged and left as `None`
    pub fn collect(source: &dyn CounterSource) -> Self {
        Self {
            cpu: source
                .cpu_times()
                .map_err(|e| debug!("cpu counters unavailable: {}", e))
                .ok(),
            memory: source
                .memory()
                .map_err(|e| debug!("memory counters unavailable: {}", e))
                .ok(),
            disk: source
                .disk()
                .map_err(|e| debug!("disk counters unavailable: {}", e))
                .ok(),
            network: source
                .network()
                .map_err(|e| debug!("network counters unavailable: {}", e))
                .ok(),
        }
    }
}

/// Turns counter readings into a [`MetricsSnapshot`], retaining the previous
/// CPU and network counters between calls.
#[derive(Debug, Clone, Default)]
pub struct RateSampler {
    prev_cpu: Option<Vec<CpuTimes>>,
    prev_net: Option<(NetCounters, Instant)>,
}

impl RateSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute this cycle's metrics and keep `readings` as the new baseline.
    pub fn sample(&mut self, readings: &CounterReadings, at: Instant) -> MetricsSnapshot {
        let cpu_percent = match &readings.cpu {
            Some(current) => {
                let percents = cpu_percentages(self.prev_cpu.as_deref(), current);
                self.prev_cpu = Some(current.clone());
                percents
            }
            None => {
                self.prev_cpu = None;
                Vec::new()
            }
        };

        let (mem_percent, swap_percent) = readings
            .memory
            .map(|m| {
                (
                    ratio_percent(m.total.saturating_sub(m.available), m.total),
                    ratio_percent(m.swap_total.saturating_sub(m.swap_free), m.swap_total),
                )
            })
            .unwrap_or((0.0, 0.0));

        let disk_percent = readings
            .disk
            .map(|d| ratio_percent(d.total.saturating_sub(d.available), d.total))
            .unwrap_or(0.0);

        let (net_rx_rate, net_tx_rate) = match readings.network {
            Some(current) => {
                let rates = match self.prev_net {
                    Some((prev, prev_at)) => {
                        let elapsed = at.saturating_duration_since(prev_at).as_secs_f64();
                        (
                            rate_per_sec(prev.rx_bytes, current.rx_bytes, elapsed),
                            rate_per_sec(prev.tx_bytes, current.tx_bytes, elapsed),
                        )
                    }
                    None => (0.0, 0.0),
                };
                self.prev_net = Some((current, at));
                rates
            }
            None => {
                self.prev_net = None;
                (0.0, 0.0)
            }
        };

        MetricsSnapshot {
            cpu_percent,
            mem_percent,
            swap_percent,
            disk_percent,
            net_rx_rate,
            net_tx_rate,
        }
    }
}

/// Per-core busy percentage between two readings.
///
/// Without a previous reading, or when the core count changed, every core
/// reports 0. A core whose total did not advance reports 0.
pub fn cpu_percentages(prev: Option<&[CpuTimes]>, current: &[CpuTimes]) -> Vec<f64> {
    let Some(prev) = prev.filter(|p| p.len() == current.len()) else {
        return vec![0.0; current.len()];
    };

    prev.iter()
        .zip(current)
        .map(|(before, now)| {
            let total_delta = now.total.saturating_sub(before.total);
            if total_delta == 0 {
                return 0.0;
            }
            let idle_delta = now.idle.saturating_sub(before.idle).min(total_delta);
            (100.0 * (1.0 - idle_delta as f64 / total_delta as f64)).clamp(0.0, 100.0)
        })
        .collect()
}

/// `used / total * 100`, 0 when total is 0
pub fn ratio_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// Bytes per second between two counter values; 0 on reset or no elapsed time
pub fn rate_per_sec(previous: u64, current: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 || current < previous {
        return 0.0;
    }
    (current - previous) as f64 / elapsed_secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counters::{MockCounterSource, ProbeError};
    use std::time::Duration;

    fn net(rx: u64, tx: u64) -> CounterReadings {
        CounterReadings {
            network: Some(NetCounters { rx_bytes: rx, tx_bytes: tx }),
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_total_delta_is_zero_percent() {
        let prev = [CpuTimes { idle: 50, total: 100 }];
        let current = [CpuTimes { idle: 50, total: 100 }];
        assert_eq!(cpu_percentages(Some(&prev), &current), vec![0.0]);
    }

    #[test]
    fn test_fully_busy_core() {
        // idle delta 0, total delta 100
        let prev = [CpuTimes { idle: 500, total: 1000 }];
        let current = [CpuTimes { idle: 500, total: 1100 }];
        assert_eq!(cpu_percentages(Some(&prev), &current), vec![100.0]);
    }

    #[test]
    fn test_half_busy_core() {
        let prev = [CpuTimes { idle: 0, total: 0 }];
        let current = [CpuTimes { idle: 50, total: 100 }];
        assert_eq!(cpu_percentages(Some(&prev), &current), vec![50.0]);
    }

    #[test]
    fn test_core_count_change_reports_zero() {
        let prev = [CpuTimes { idle: 0, total: 0 }];
        let current = [
            CpuTimes { idle: 10, total: 100 },
            CpuTimes { idle: 10, total: 100 },
        ];
        assert_eq!(cpu_percentages(Some(&prev), &current), vec![0.0, 0.0]);
    }

    #[test]
    fn test_sampler_first_cpu_sample_is_zero() {
        let mut sampler = RateSampler::new();
        let readings = CounterReadings {
            cpu: Some(vec![CpuTimes { idle: 10, total: 1000 }]),
            ..Default::default()
        };
        let snapshot = sampler.sample(&readings, Instant::now());
        assert_eq!(snapshot.cpu_percent, vec![0.0]);
    }

    #[test]
    fn test_first_network_sample_is_zero() {
        let mut sampler = RateSampler::new();
        let snapshot = sampler.sample(&net(987_654_321, 123_456_789), Instant::now());
        assert_eq!(snapshot.net_rx_rate, 0.0);
        assert_eq!(snapshot.net_tx_rate, 0.0);
    }

    #[test]
    fn test_network_rate_per_second() {
        let mut sampler = RateSampler::new();
        let start = Instant::now();
        sampler.sample(&net(1000, 500), start);
        let snapshot = sampler.sample(&net(2000, 700), start + Duration::from_secs(1));
        assert_eq!(snapshot.net_rx_rate, 1000.0);
        assert_eq!(snapshot.net_tx_rate, 200.0);
    }

    #[test]
    fn test_network_counter_reset_reports_zero() {
        let mut sampler = RateSampler::new();
        let start = Instant::now();
        sampler.sample(&net(5000, 5000), start);
        let snapshot = sampler.sample(&net(100, 100), start + Duration::from_secs(1));
        assert_eq!(snapshot.net_rx_rate, 0.0);

        // rebased on the reset value
        let snapshot = sampler.sample(&net(600, 100), start + Duration::from_secs(2));
        assert_eq!(snapshot.net_rx_rate, 500.0);
    }

    #[test]
    fn test_unavailable_network_drops_baseline() {
        let mut sampler = RateSampler::new();
        let start = Instant::now();
        sampler.sample(&net(1000, 1000), start);
        let snapshot = sampler.sample(&CounterReadings::default(), start + Duration::from_secs(1));
        assert_eq!(snapshot.net_rx_rate, 0.0);

        let snapshot = sampler.sample(&net(9000, 9000), start + Duration::from_secs(2));
        assert_eq!(snapshot.net_rx_rate, 0.0);
    }

    #[test]
    fn test_ratio_percent_zero_total() {
        assert_eq!(ratio_percent(10, 0), 0.0);
        assert_eq!(ratio_percent(25, 100), 25.0);
    }

    #[test]
    fn test_memory_and_disk_percent() {
        let mut sampler = RateSampler::new();
        let readings = CounterReadings {
            memory: Some(MemCounters {
                total: 1000,
                available: 250,
                swap_total: 0,
                swap_free: 0,
            }),
            disk: Some(DiskCounters { total: 200, available: 50 }),
            ..Default::default()
        };
        let snapshot = sampler.sample(&readings, Instant::now());
        assert_eq!(snapshot.mem_percent, 75.0);
        assert_eq!(snapshot.swap_percent, 0.0);
        assert_eq!(snapshot.disk_percent, 75.0);
    }

    #[test]
    fn test_collect_tolerates_failing_source() {
        let mut source = MockCounterSource::new();
        source
            .expect_cpu_times()
            .returning(|| Err(ProbeError::Incomplete("stat")));
        source.expect_memory().returning(|| {
            Ok(MemCounters {
                total: 100,
                available: 50,
                ..Default::default()
            })
        });
        source
            .expect_disk()
            .returning(|| Err(ProbeError::MountNotFound("/".to_string())));
        source
            .expect_network()
            .returning(|| Ok(NetCounters::default()));

        let readings = CounterReadings::collect(&source);
        assert!(readings.cpu.is_none());
        assert!(readings.disk.is_none());
        assert_eq!(readings.memory.map(|m| m.total), Some(100));

        let snapshot = RateSampler::new().sample(&readings, Instant::now());
        assert!(snapshot.cpu_percent.is_empty());
        assert_eq!(snapshot.disk_percent, 0.0);
        assert_eq!(snapshot.mem_percent, 50.0);
    }
}
