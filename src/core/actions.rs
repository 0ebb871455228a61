/// Threshold rules that run a command when a process gets too hot
///
/// Rules are edge-triggered: a rule fires once when a matching process
/// crosses its CPU threshold, then stays disarmed until no matching process
/// is above the threshold any more.

use anyhow::{Context, Result};
use log::info;
use regex::Regex;

use crate::core::processes::ProcessRow;
use crate::utils::app_config::ActionConfig;
use crate::utils::shell_quote;

/// Which process names a rule applies to
#[derive(Debug, Clone)]
pub enum ProcessMatcher {
    /// `*` or `any`
    Any,
    /// Exact command name
    Exact(String),
    /// Glob with `*` and `?`, e.g. `python*`
    Glob { pattern: String, regex: Regex },
}

impl ProcessMatcher {
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern == "*" || pattern.eq_ignore_ascii_case("any") {
            return Ok(ProcessMatcher::Any);
        }
        if !pattern.contains(['*', '?']) {
            return Ok(ProcessMatcher::Exact(pattern.to_string()));
        }

        let mut expr = String::from("^");
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr)
            .with_context(|| format!("Invalid process pattern '{}'", pattern))?;
        Ok(ProcessMatcher::Glob {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            ProcessMatcher::Any => true,
            ProcessMatcher::Exact(expected) => name == expected,
            ProcessMatcher::Glob { regex, .. } => regex.is_match(name),
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            ProcessMatcher::Any => "*",
            ProcessMatcher::Exact(name) => name,
            ProcessMatcher::Glob { pattern, .. } => pattern,
        }
    }
}

/// A configured threshold rule and its trigger state
#[derive(Debug, Clone)]
pub struct ActionRule {
    pub name: String,
    pub matcher: ProcessMatcher,
    pub cpu_threshold: f64,
    /// Command template; `{pid}` and `{name}` are substituted
    pub action: String,
    /// False while the current exceed episode has already fired
    pub armed: bool,
}

impl ActionRule {
    pub fn from_config(config: &ActionConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            matcher: ProcessMatcher::parse(&config.process)?,
            cpu_threshold: config.cpu_threshold,
            action: config.action.clone(),
            armed: true,
        })
    }

    /// The action command with placeholders filled in for `row`
    pub fn render_command(&self, row: &ProcessRow) -> String {
        self.action
            .replace("{pid}", &row.pid.to_string())
            .replace("{name}", &shell_quote(&row.name))
    }
}

/// A rule that crossed its threshold this tick
#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub rule: String,
    pub pid: u32,
    pub process: String,
    pub cpu_percent: f64,
    pub command: String,
}

/// Evaluates every rule against the full process snapshot once per tick
#[derive(Debug, Clone, Default)]
pub struct ActionEngine {
    rules: Vec<ActionRule>,
    enabled: bool,
}

impl ActionEngine {
    pub fn new(rules: Vec<ActionRule>) -> Self {
        Self {
            rules,
            enabled: true,
        }
    }

    /// Build rules from configuration entries
    pub fn from_config(actions: &[ActionConfig]) -> Result<Self> {
        let rules = actions
            .iter()
            .map(ActionRule::from_config)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// Keep rules visible but never fire them
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rules(&self) -> &[ActionRule] {
        &self.rules
    }

    /// Arm/disarm rules against `rows` and return the rules that fire now.
    ///
    /// The hottest matching process (lowest pid on ties) is the one
    /// substituted into the command.
    pub fn evaluate(&mut self, rows: &[ProcessRow]) -> Vec<Firing> {
        if !self.enabled {
            return Vec::new();
        }

        let mut firings = Vec::new();

        for rule in &mut self.rules {
            let hottest = rows
                .iter()
                .filter(|row| rule.matcher.matches(&row.name))
                .filter(|row| row.cpu_percent >= rule.cpu_threshold)
                .max_by(|a, b| {
                    a.cpu_percent
                        .total_cmp(&b.cpu_percent)
                        .then(b.pid.cmp(&a.pid))
                });

            match hottest {
                Some(row) if rule.armed => {
                    rule.armed = false;
                    let command = rule.render_command(row);
                    info!(
                        "rule '{}' triggered by {} (pid {}) at {:.1}% cpu",
                        rule.name, row.name, row.pid, row.cpu_percent
                    );
                    firings.push(Firing {
                        rule: rule.name.clone(),
                        pid: row.pid,
                        process: row.name.clone(),
                        cpu_percent: row.cpu_percent,
                        command,
                    });
                }
                Some(_) => {}
                None => {
                    if !rule.armed {
                        info!("rule '{}' re-armed", rule.name);
                    }
                    rule.armed = true;
                }
            }
        }

        firings
    }
}
