/// Flat, render-ready projection of the dashboard state
///
/// Everything the screen needs is formatted here so the renderer only maps
/// values onto widgets.

use crate::core::state::{DashboardState, MessageLevel, Mode};
use crate::utils::{format_clock, format_percent, format_rate, WARN_FRACTION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Normal,
    Warning,
    Critical,
}

impl Level {
    /// Critical at or above `threshold`, warning from `WARN_FRACTION` of it
    pub fn for_percent(percent: f64, threshold: f64) -> Self {
        if percent >= threshold {
            Level::Critical
        } else if percent >= threshold * WARN_FRACTION {
            Level::Warning
        } else {
            Level::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeView {
    pub label: String,
    /// Clamped to [0, 100]
    pub percent: f64,
    pub text: String,
    pub level: Level,
}

impl GaugeView {
    fn new(label: impl Into<String>, percent: f64, threshold: f64) -> Self {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            label: label.into(),
            percent,
            text: format_percent(percent),
            level: Level::for_percent(percent, threshold),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub pid: String,
    pub user: String,
    pub name: String,
    pub cpu: String,
    pub mem: String,
    pub selected: bool,
    /// CPU at or above the CPU threshold
    pub hot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub header: String,
    /// Average CPU, memory, swap and disk
    pub gauges: Vec<GaugeView>,
    /// One gauge per core
    pub cores: Vec<GaugeView>,
    pub net_rx: String,
    pub net_tx: String,
    /// Shown while editing or while a filter is applied
    pub filter_bar: Option<String>,
    pub filter_editing: bool,
    pub table_title: String,
    pub rows: Vec<RowView>,
    /// Index into `rows`, used to keep the selection scrolled into view
    pub selected: Option<usize>,
    pub message: Option<MessageView>,
    pub footer: String,
    /// Help overlay rows, present only in help mode
    pub help: Option<Vec<(String, &'static str)>>,
}

pub fn build(state: &DashboardState) -> ViewModel {
    let metrics = state.metrics();
    let thresholds = state.thresholds();
    let view = state.view();
    let engine = state.engine();

    let rules = if !engine.is_enabled() {
        "actions off".to_string()
    } else {
        let armed = engine.rules().iter().filter(|r| r.armed).count();
        format!("{} rules ({} armed)", engine.rules().len(), armed)
    };
    let header = format!(
        "syskit pulse  |  {} cores  |  sort: {}  |  {}",
        metrics.cpu_percent.len(),
        view.sort_key().label(),
        rules
    );

    let gauges = vec![
        GaugeView::new("CPU", metrics.cpu_average(), thresholds.cpu),
        GaugeView::new("MEM", metrics.mem_percent, thresholds.ram),
        GaugeView::new("SWAP", metrics.swap_percent, thresholds.ram),
        GaugeView::new("DISK", metrics.disk_percent, thresholds.disk),
    ];

    let cores = metrics
        .cpu_percent
        .iter()
        .enumerate()
        .map(|(i, percent)| GaugeView::new(format!("cpu{}", i), *percent, thresholds.cpu))
        .collect();

    let filter_editing = state.mode() == Mode::FilterEdit;
    let filter_bar = if filter_editing {
        Some(format!("/{}", view.filter()))
    } else if !view.filter().is_empty() {
        Some(format!("filter: {}", view.filter()))
    } else {
        None
    };

    let shown = view.display_rows().len();
    let table_title = if view.matching_count() > shown {
        format!(
            "Processes ({} of {}, by {})",
            shown,
            view.matching_count(),
            view.sort_key().label()
        )
    } else {
        format!("Processes ({}, by {})", shown, view.sort_key().label())
    };

    let rows = view
        .display_rows()
        .iter()
        .enumerate()
        .map(|(i, row)| RowView {
            pid: row.pid.to_string(),
            user: row.user.clone(),
            name: row.name.clone(),
            cpu: format!("{:.1}", row.cpu_percent),
            mem: format!("{:.1}", row.mem_percent),
            selected: view.selected() == Some(i),
            hot: row.cpu_percent >= thresholds.cpu,
        })
        .collect();

    let message = state.message().map(|m| MessageView {
        text: format!("[{}] {}", format_clock(&m.at), m.text),
        is_error: m.level == MessageLevel::Error,
    });

    let footer = match state.mode() {
        Mode::Normal => {
            "[↑↓] Select | [F3/F4/F5] Sort | [/] Filter | [K] Kill | [?] Help | [q] Quit"
        }
        Mode::FilterEdit => "Type to filter | [Enter] Apply | [Esc] Cancel",
        Mode::Help => "[Esc] / [?] Close help",
    }
    .to_string();

    let help = (state.mode() == Mode::Help).then(|| state.keymap().help_entries());

    ViewModel {
        header,
        gauges,
        cores,
        net_rx: format_rate(metrics.net_rx_rate),
        net_tx: format_rate(metrics.net_tx_rate),
        filter_bar,
        filter_editing,
        table_title,
        rows,
        selected: view.selected(),
        message,
        footer,
        help,
    }
}
