/// Raw counter readers for the live dashboard
///
/// Reads CPU tick counters, memory, network byte counters and root filesystem
/// usage. Every reader is fallible; callers treat a failure as "value
/// unavailable this cycle".

use std::fs;
use std::path::{Path, PathBuf};

use sysinfo::Disks;
use thiserror::Error;

/// Failure to read a counter or process source
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is missing required fields")]
    Incomplete(&'static str),

    #[error("mount point {0} not found")]
    MountNotFound(String),

    #[error("{command} failed: {reason}")]
    Command { command: String, reason: String },
}

/// Cumulative idle and total ticks for one core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

/// Memory and swap counters in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemCounters {
    pub total: u64,
    pub available: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Filesystem capacity in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskCounters {
    pub total: u64,
    pub available: u64,
}

/// Cumulative received/transmitted bytes summed over interfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Source of raw system counters
#[cfg_attr(test, mockall::automock)]
pub trait CounterSource: Send + Sync {
    /// Per-core tick counters, in core order
    fn cpu_times(&self) -> Result<Vec<CpuTimes>, ProbeError>;
    fn memory(&self) -> Result<MemCounters, ProbeError>;
    fn disk(&self) -> Result<DiskCounters, ProbeError>;
    fn network(&self) -> Result<NetCounters, ProbeError>;
}

/// Reads counters from a procfs tree and the configured mount point
#[derive(Debug, Clone)]
pub struct ProcCounterReader {
    root: PathBuf,
    disk_mount: PathBuf,
    exclude_interfaces: Vec<String>,
}

impl ProcCounterReader {
    pub fn new(root: impl Into<PathBuf>, disk_mount: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            disk_mount: disk_mount.into(),
            exclude_interfaces: Vec::new(),
        }
    }

    /// Interfaces left out of the network totals (e.g. "lo")
    pub fn exclude_interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.exclude_interfaces = interfaces;
        self
    }

    fn read(&self, relative: &str) -> Result<String, ProbeError> {
        let path = self.root.join(relative);
        fs::read_to_string(&path).map_err(|source| ProbeError::Io { path, source })
    }
}

impl CounterSource for ProcCounterReader {
    fn cpu_times(&self) -> Result<Vec<CpuTimes>, ProbeError> {
        let text = self.read("stat")?;
        let cores = parse_cpu_times(&text);
        if cores.is_empty() {
            return Err(ProbeError::Incomplete("stat"));
        }
        Ok(cores)
    }

    fn memory(&self) -> Result<MemCounters, ProbeError> {
        parse_meminfo(&self.read("meminfo")?)
    }

    fn disk(&self) -> Result<DiskCounters, ProbeError> {
        disk_usage(&self.disk_mount)
    }

    fn network(&self) -> Result<NetCounters, ProbeError> {
        Ok(parse_net_dev(&self.read("net/dev")?, &self.exclude_interfaces))
    }
}

fn disk_usage(mount: &Path) -> Result<DiskCounters, ProbeError> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == mount)
        .map(|disk| DiskCounters {
            total: disk.total_space(),
            available: disk.available_space(),
        })
        .ok_or_else(|| ProbeError::MountNotFound(mount.display().to_string()))
}

/// Parse the per-core `cpuN` lines of /proc/stat.
///
/// The aggregate `cpu ` line is ignored. Idle is the fourth value, total is
/// the sum of every value on the line. Lines with fewer than four values or
/// non-numeric fields are skipped.
pub fn parse_cpu_times(text: &str) -> Vec<CpuTimes> {
    let mut cores = Vec::new();

    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let Some(label) = fields.next() else {
            continue;
        };
        if label == "cpu" || !label.starts_with("cpu") {
            continue;
        }

        let values: Result<Vec<u64>, _> = fields.map(str::parse::<u64>).collect();
        let Ok(values) = values else {
            continue;
        };
        if values.len() < 4 {
            continue;
        }

        cores.push(CpuTimes {
            idle: values[3],
            total: values.iter().copied().fold(0u64, u64::saturating_add),
        });
    }

    cores
}

/// Parse /proc/meminfo (values in kB) into byte counters
pub fn parse_meminfo(text: &str) -> Result<MemCounters, ProbeError> {
    let mut total = None;
    let mut available = None;
    let mut free = 0u64;
    let mut buffers = 0u64;
    let mut cached = 0u64;
    let mut swap_total = 0u64;
    let mut swap_free = 0u64;

    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };
        let bytes = kb.saturating_mul(1024);

        match key {
            "MemTotal:" => total = Some(bytes),
            "MemAvailable:" => available = Some(bytes),
            "MemFree:" => free = bytes,
            "Buffers:" => buffers = bytes,
            "Cached:" => cached = bytes,
            "SwapTotal:" => swap_total = bytes,
            "SwapFree:" => swap_free = bytes,
            _ => {}
        }
    }

    let total = total.ok_or(ProbeError::Incomplete("meminfo"))?;
    // Kernels before 3.14 have no MemAvailable
    let available = available.unwrap_or_else(|| free + buffers + cached);

    Ok(MemCounters {
        total,
        available: available.min(total),
        swap_total,
        swap_free: swap_free.min(swap_total),
    })
}

/// Sum rx/tx byte counters from /proc/net/dev
pub fn parse_net_dev(text: &str, exclude: &[String]) -> NetCounters {
    let mut counters = NetCounters::default();

    for line in text.lines() {
        let Some((iface, rest)) = line.split_once(':') else {
            continue;
        };
        let iface = iface.trim();
        if exclude.iter().any(|e| e == iface) {
            continue;
        }

        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() < 9 {
            continue;
        }
        let (Ok(rx), Ok(tx)) = (fields[0].parse::<u64>(), fields[8].parse::<u64>()) else {
            continue;
        };

        counters.rx_bytes = counters.rx_bytes.saturating_add(rx);
        counters.tx_bytes = counters.tx_bytes.saturating_add(tx);
    }

    counters
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STAT: &str = "\
cpu  400 0 200 1000 10 0 0 0 0 0
cpu0 200 0 100 500 5 0 0 0 0 0
cpu1 200 0 100 500 5 0 0 0 0 0
intr 12345 0 0
ctxt 999
";

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0
  eth0:    5000      50    0    0    0     0          0         0     2500      25    0    0    0     0       0          0
";

    #[test]
    fn test_parse_cpu_times_skips_aggregate() {
        let cores = parse_cpu_times(STAT);
        assert_eq!(cores.len(), 2);
        assert_eq!(cores[0], CpuTimes { idle: 500, total: 805 });
    }

    #[test]
    fn test_parse_cpu_times_skips_malformed_lines() {
        let text = "cpu0 1 2 3\ncpu1 10 x 10 10\ncpu2 10 0 10 80\n";
        let cores = parse_cpu_times(text);
        assert_eq!(cores, vec![CpuTimes { idle: 80, total: 100 }]);
    }

    #[test]
    fn test_parse_cpu_times_saturates_huge_counters() {
        let max = u64::MAX;
        let text = format!("cpu0 {} {} 5 7\n", max - 1, max - 1);
        let cores = parse_cpu_times(&text);
        assert_eq!(cores, vec![CpuTimes { idle: 7, total: u64::MAX }]);
    }

    #[test]
    fn test_parse_meminfo() {
        let text = "MemTotal: 1000 kB\nMemFree: 100 kB\nMemAvailable: 250 kB\nSwapTotal: 400 kB\nSwapFree: 100 kB\n";
        let mem = parse_meminfo(text).unwrap();
        assert_eq!(mem.total, 1000 * 1024);
        assert_eq!(mem.available, 250 * 1024);
        assert_eq!(mem.swap_total, 400 * 1024);
        assert_eq!(mem.swap_free, 100 * 1024);
    }

    #[test]
    fn test_parse_meminfo_without_available() {
        let text = "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: 50 kB\nCached: 150 kB\n";
        let mem = parse_meminfo(text).unwrap();
        assert_eq!(mem.available, 300 * 1024);
    }

    #[test]
    fn test_parse_meminfo_missing_total() {
        assert!(matches!(
            parse_meminfo("MemFree: 100 kB\n"),
            Err(ProbeError::Incomplete("meminfo"))
        ));
    }

    #[test]
    fn test_parse_net_dev() {
        let all = parse_net_dev(NET_DEV, &[]);
        assert_eq!(all, NetCounters { rx_bytes: 6000, tx_bytes: 3500 });

        let without_lo = parse_net_dev(NET_DEV, &["lo".to_string()]);
        assert_eq!(without_lo, NetCounters { rx_bytes: 5000, tx_bytes: 2500 });
    }

    #[test]
    fn test_reader_uses_proc_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stat"), STAT).unwrap();
        fs::create_dir(dir.path().join("net")).unwrap();
        fs::write(dir.path().join("net/dev"), NET_DEV).unwrap();

        let reader = ProcCounterReader::new(dir.path(), "/");
        assert_eq!(reader.cpu_times().unwrap().len(), 2);
        assert_eq!(reader.network().unwrap().rx_bytes, 6000);
        assert!(matches!(reader.memory(), Err(ProbeError::Io { .. })));
    }

    #[test]
    fn test_disk_missing_mount() {
        let err = disk_usage(Path::new("/definitely/not/a/mount")).unwrap_err();
        assert!(matches!(err, ProbeError::MountNotFound(_)));
    }
}
