/// Dashboard state machine
///
/// `DashboardState::update` is the single place where dashboard state
/// changes. It takes one message (tick, key press, finished command), applies
/// it, and returns the effects the runtime should carry out. It performs no
/// I/O itself: counter readings arrive inside the tick message and commands
/// leave as [`Effect::Exec`] values.

use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::event::KeyCode;
use log::warn;

use crate::core::actions::ActionEngine;
use crate::core::counters::CounterSource;
use crate::core::executor::CommandOutput;
use crate::core::keymap::{Action, Key, KeyMap};
use crate::core::process_view::ProcessView;
use crate::core::processes::{ProcessLister, RawProcess};
use crate::core::sampler::{CounterReadings, MetricsSnapshot, RateSampler};
use crate::utils::app_config::{AppConfig, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    FilterEdit,
    Help,
}

/// Everything read from the collaborators for one tick
#[derive(Debug, Clone)]
pub struct Sample {
    pub at: Instant,
    pub counters: CounterReadings,
    pub processes: Vec<RawProcess>,
}

impl Sample {
    /// Read counters and the process list; failures degrade to empty values
    pub fn collect(counters: &dyn CounterSource, lister: &dyn ProcessLister) -> Self {
        let processes = lister.list().unwrap_or_else(|e| {
            warn!("process listing unavailable: {}", e);
            Vec::new()
        });

        Self {
            at: Instant::now(),
            counters: CounterReadings::collect(counters),
            processes,
        }
    }
}

/// Why a command is being run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOrigin {
    Kill { pid: u32 },
    Rule { rule: String, pid: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub origin: ExecOrigin,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub request: ExecRequest,
    pub output: CommandOutput,
}

#[derive(Debug, Clone)]
pub enum Msg {
    Tick(Box<Sample>),
    Key(Key),
    CommandFinished(CommandOutcome),
}

/// Side effects requested by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Quit,
    Exec(ExecRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Error,
}

/// Last action/outcome line shown under the table
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub level: MessageLevel,
    pub at: DateTime<Local>,
}

pub struct DashboardState {
    mode: Mode,
    view: ProcessView,
    metrics: MetricsSnapshot,
    message: Option<StatusMessage>,
    sampler: RateSampler,
    engine: ActionEngine,
    keymap: KeyMap,
    kill_command: String,
    thresholds: Thresholds,
    ticks: u64,
}

impl DashboardState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self::with_engine(
            config,
            ActionEngine::from_config(&config.actions)?,
        ))
    }

    pub fn with_engine(config: &AppConfig, engine: ActionEngine) -> Self {
        Self {
            mode: Mode::Normal,
            view: ProcessView::with_sort_key(config.display_limit, config.sort_key),
            metrics: MetricsSnapshot::default(),
            message: None,
            sampler: RateSampler::new(),
            engine,
            keymap: KeyMap::default(),
            kill_command: config.kill_command.clone(),
            thresholds: config.thresholds.clone(),
            ticks: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn view(&self) -> &ProcessView {
        &self.view
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    pub fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    pub fn engine(&self) -> &ActionEngine {
        &self.engine
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Apply one message and return the effects to run
    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::Tick(sample) => self.on_tick(*sample),
            Msg::Key(key) => self.on_key(key),
            Msg::CommandFinished(outcome) => {
                self.record_outcome(outcome);
                Vec::new()
            }
        }
    }

    fn on_tick(&mut self, sample: Sample) -> Vec<Effect> {
        self.ticks += 1;
        self.metrics = self.sampler.sample(&sample.counters, sample.at);
        self.view.refresh(&sample.processes);

        // Rules see the whole snapshot, not just the rows on screen
        self.engine
            .evaluate(self.view.all_rows())
            .into_iter()
            .map(|firing| {
                Effect::Exec(ExecRequest {
                    origin: ExecOrigin::Rule {
                        rule: firing.rule,
                        pid: firing.pid,
                    },
                    command: firing.command,
                })
            })
            .collect()
    }

    fn on_key(&mut self, key: Key) -> Vec<Effect> {
        match self.mode {
            Mode::Normal => self.on_normal_key(key),
            Mode::FilterEdit => {
                self.on_filter_key(key);
                Vec::new()
            }
            Mode::Help => {
                if key == Key::Code(KeyCode::Esc) || self.keymap.action(&key) == Some(Action::Help)
                {
                    self.mode = Mode::Normal;
                }
                Vec::new()
            }
        }
    }

    fn on_normal_key(&mut self, key: Key) -> Vec<Effect> {
        let Some(action) = self.keymap.action(&key) else {
            return Vec::new();
        };

        match action {
            Action::Quit => return vec![Effect::Quit],
            Action::Up => self.view.select_previous(),
            Action::Down => self.view.select_next(),
            Action::Sort(sort_key) => self.view.set_sort_key(sort_key),
            Action::Filter => {
                self.view.clear_filter();
                self.mode = Mode::FilterEdit;
            }
            Action::Help => self.mode = Mode::Help,
            Action::KillSelected => {
                return match self.view.selected_row() {
                    Some(row) => vec![Effect::Exec(ExecRequest {
                        origin: ExecOrigin::Kill { pid: row.pid },
                        command: self.kill_command.replace("{pid}", &row.pid.to_string()),
                    })],
                    None => {
                        self.set_message(MessageLevel::Error, "No process selected".to_string());
                        Vec::new()
                    }
                };
            }
        }

        Vec::new()
    }

    fn on_filter_key(&mut self, key: Key) {
        match key {
            Key::Code(KeyCode::Esc) | Key::Ctrl('c') => {
                self.view.clear_filter();
                self.mode = Mode::Normal;
            }
            Key::Code(KeyCode::Enter) => self.mode = Mode::Normal,
            Key::Code(KeyCode::Backspace) => self.view.pop_filter_char(),
            Key::Char(c) if !c.is_control() => self.view.push_filter_char(c),
            _ => {}
        }
    }

    fn record_outcome(&mut self, outcome: CommandOutcome) {
        let success = outcome.output.success;
        let detail = outcome
            .output
            .output
            .lines()
            .next()
            .filter(|line| !line.is_empty())
            .unwrap_or("command exited with an error")
            .to_string();

        let text = match (&outcome.request.origin, success) {
            (ExecOrigin::Kill { pid }, true) => format!("Process {} killed", pid),
            (ExecOrigin::Kill { pid }, false) => {
                format!("Failed to kill process {}: {}", pid, detail)
            }
            (ExecOrigin::Rule { rule, pid }, true) => {
                format!("Rule '{}' ran `{}` (pid {})", rule, outcome.request.command, pid)
            }
            (ExecOrigin::Rule { rule, pid }, false) => {
                format!("Rule '{}' failed on pid {}: {}", rule, pid, detail)
            }
        };

        let level = if success {
            MessageLevel::Info
        } else {
            MessageLevel::Error
        };
        self.set_message(level, text);
    }

    fn set_message(&mut self, level: MessageLevel, text: String) {
        self.message = Some(StatusMessage {
            text,
            level,
            at: Local::now(),
        });
    }
}
