/// Process listing via `ps`

use std::process::Command;

use crate::core::counters::ProbeError;

/// One line of process listing output, unparsed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawProcess {
    pub pid: String,
    pub user: String,
    pub command: String,
    pub cpu: String,
    pub mem: String,
}

/// A point-in-time process entry shown by the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub user: String,
    pub name: String,
    pub cpu_percent: f64,
    pub mem_percent: f64,
}

impl ProcessRow {
    /// Convert a raw listing entry. Entries without a numeric pid are
    /// dropped; unparsable percentages become 0.
    pub fn from_raw(raw: &RawProcess) -> Option<Self> {
        let pid = raw.pid.trim().parse::<u32>().ok()?;
        Some(Self {
            pid,
            user: raw.user.clone(),
            name: raw.command.clone(),
            cpu_percent: parse_percent(&raw.cpu),
            mem_percent: parse_percent(&raw.mem),
        })
    }
}

fn parse_percent(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

/// Source of the current full process list
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLister: Send + Sync {
    fn list(&self) -> Result<Vec<RawProcess>, ProbeError>;
}

/// Lists processes with `ps -eo pid,user,comm,%cpu,%mem`
#[derive(Debug, Clone, Default)]
pub struct PsLister;

impl ProcessLister for PsLister {
    fn list(&self) -> Result<Vec<RawProcess>, ProbeError> {
        let output = Command::new("ps")
            .args(["-eo", "pid,user,comm,%cpu,%mem", "--no-headers"])
            .output()
            .map_err(|e| ProbeError::Command {
                command: "ps".to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProbeError::Command {
                command: "ps".to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_ps_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `pid user comm %cpu %mem` lines.
///
/// `comm` may contain spaces, so pid and user are taken from the front and
/// the two percentages from the back. Lines with fewer than five fields are
/// skipped.
pub fn parse_ps_output(text: &str) -> Vec<RawProcess> {
    text.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            let n = fields.len();
            Some(RawProcess {
                pid: fields[0].to_string(),
                user: fields[1].to_string(),
                command: fields[2..n - 2].join(" "),
                cpu: fields[n - 2].to_string(),
                mem: fields[n - 1].to_string(),
            })
        })
        .collect()
}
