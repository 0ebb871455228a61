/// Sorted, filtered and capped process table with selection tracking

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::core::processes::{ProcessRow, RawProcess};

/// Column the process table is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// CPU descending
    #[default]
    Cpu,
    /// Memory descending
    Mem,
    /// PID ascending
    Pid,
}

impl SortKey {
    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Cpu => "CPU",
            SortKey::Mem => "MEM",
            SortKey::Pid => "PID",
        }
    }
}

/// The process table behind the dashboard.
///
/// Holds the full snapshot from the last refresh and the derived display
/// rows (filtered, sorted, capped). `selected` always indexes into the
/// display rows, or is `None` when there are none.
#[derive(Debug, Clone)]
pub struct ProcessView {
    rows: Vec<ProcessRow>,
    display: Vec<ProcessRow>,
    matching: usize,
    sort_key: SortKey,
    filter: String,
    limit: usize,
    selected: Option<usize>,
}

impl ProcessView {
    pub fn new(limit: usize) -> Self {
        Self::with_sort_key(limit, SortKey::default())
    }

    pub fn with_sort_key(limit: usize, sort_key: SortKey) -> Self {
        Self {
            rows: Vec::new(),
            display: Vec::new(),
            matching: 0,
            sort_key,
            filter: String::new(),
            limit: limit.max(1),
            selected: None,
        }
    }

    /// Replace the snapshot with a fresh listing and rebuild the display rows
    pub fn refresh(&mut self, raw: &[RawProcess]) {
        self.set_rows(raw.iter().filter_map(ProcessRow::from_raw).collect());
    }

    pub fn set_rows(&mut self, rows: Vec<ProcessRow>) {
        self.rows = rows;
        self.rebuild();
    }

    /// Full uncapped, unfiltered snapshot in listing order
    pub fn all_rows(&self) -> &[ProcessRow] {
        &self.rows
    }

    pub fn display_rows(&self) -> &[ProcessRow] {
        &self.display
    }

    /// Number of rows matching the filter before the display cap
    pub fn matching_count(&self) -> usize {
        self.matching
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
        self.rebuild();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.to_string();
        self.rebuild();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter.push(c);
        self.rebuild();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter.pop();
        self.rebuild();
    }

    pub fn clear_filter(&mut self) {
        self.set_filter("");
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&ProcessRow> {
        self.selected.and_then(|i| self.display.get(i))
    }

    pub fn select_previous(&mut self) {
        if let Some(i) = self.selected {
            self.selected = Some(i.saturating_sub(1));
        }
    }

    pub fn select_next(&mut self) {
        if let Some(i) = self.selected {
            self.selected = Some((i + 1).min(self.display.len().saturating_sub(1)));
        }
    }

    fn rebuild(&mut self) {
        let selected_pid = self.selected_row().map(|row| row.pid);
        let needle = self.filter.to_lowercase();

        let mut rows: Vec<ProcessRow> = self
            .rows
            .iter()
            .filter(|row| matches_filter(row, &needle))
            .cloned()
            .collect();
        self.matching = rows.len();

        sort_rows(&mut rows, self.sort_key);
        rows.truncate(self.limit);
        self.display = rows;

        self.selected = if self.display.is_empty() {
            None
        } else {
            // Follow the selected process if it is still shown, else clamp the index
            selected_pid
                .and_then(|pid| self.display.iter().position(|row| row.pid == pid))
                .or_else(|| Some(self.selected.unwrap_or(0).min(self.display.len() - 1)))
        };
    }
}

/// Case-insensitive substring match against name, user and pid.
/// `needle` must already be lowercase; an empty needle matches everything.
pub fn matches_filter(row: &ProcessRow, needle: &str) -> bool {
    needle.is_empty()
        || row.name.to_lowercase().contains(needle)
        || row.user.to_lowercase().contains(needle)
        || row.pid.to_string().contains(needle)
}

/// Sort by `key`, breaking ties by ascending pid
pub fn sort_rows(rows: &mut [ProcessRow], key: SortKey) {
    rows.sort_by(|a, b| {
        let primary = match key {
            SortKey::Cpu => b.cpu_percent.total_cmp(&a.cpu_percent),
            SortKey::Mem => b.mem_percent.total_cmp(&a.mem_percent),
            SortKey::Pid => Ordering::Equal,
        };
        primary.then(a.pid.cmp(&b.pid))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pid: u32, name: &str, cpu: f64, mem: f64) -> ProcessRow {
        ProcessRow {
            pid,
            user: "root".to_string(),
            name: name.to_string(),
            cpu_percent: cpu,
            mem_percent: mem,
        }
    }

    fn pids(view: &ProcessView) -> Vec<u32> {
        view.display_rows().iter().map(|r| r.pid).collect()
    }

    #[test]
    fn test_empty_view_has_no_selection() {
        let mut view = ProcessView::new(30);
        view.set_rows(Vec::new());
        assert_eq!(view.selected(), None);
        view.select_next();
        assert_eq!(view.selected(), None);
    }

    #[test]
    fn test_filter_clamps_selection() {
        let mut view = ProcessView::new(30);
        view.set_filter("ssh");
        view.set_rows(vec![row(10, "sshd", 1.0, 1.0), row(20, "bash", 2.0, 1.0)]);
        assert_eq!(pids(&view), vec![10]);
        assert_eq!(view.selected(), Some(0));
    }

    #[test]
    fn test_filter_matches_user_and_pid_case_insensitively() {
        let mut view = ProcessView::new(30);
        let mut alice = row(4242, "vim", 0.0, 0.0);
        alice.user = "Alice".to_string();
        view.set_rows(vec![alice, row(7, "bash", 0.0, 0.0)]);

        view.set_filter("ALI");
        assert_eq!(pids(&view), vec![4242]);
        view.set_filter("424");
        assert_eq!(pids(&view), vec![4242]);
        view.set_filter("BASH");
        assert_eq!(pids(&view), vec![7]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let rows = vec![
            row(3, "python", 10.0, 1.0),
            row(1, "python3", 20.0, 1.0),
            row(2, "bash", 30.0, 1.0),
        ];
        let mut view = ProcessView::new(30);
        view.set_rows(rows);
        view.set_filter("py");
        let once = view.display_rows().to_vec();
        view.set_filter("py");
        assert_eq!(view.display_rows(), once.as_slice());
    }

    #[test]
    fn test_ties_broken_by_ascending_pid() {
        let mut view = ProcessView::new(30);
        view.set_rows(vec![
            row(30, "c", 5.0, 2.0),
            row(10, "a", 5.0, 2.0),
            row(20, "b", 9.0, 2.0),
        ]);
        assert_eq!(pids(&view), vec![20, 10, 30]);

        view.set_sort_key(SortKey::Mem);
        assert_eq!(pids(&view), vec![10, 20, 30]);

        view.set_sort_key(SortKey::Pid);
        assert_eq!(pids(&view), vec![10, 20, 30]);
    }

    #[test]
    fn test_display_cap_keeps_full_snapshot() {
        let rows: Vec<ProcessRow> = (1..=50).map(|pid| row(pid, "worker", pid as f64, 0.0)).collect();
        let mut view = ProcessView::new(30);
        view.set_rows(rows);
        assert_eq!(view.display_rows().len(), 30);
        assert_eq!(view.matching_count(), 50);
        assert_eq!(view.all_rows().len(), 50);
        assert_eq!(view.display_rows()[0].pid, 50);
    }

    #[test]
    fn test_selection_follows_pid_across_refresh() {
        let mut view = ProcessView::new(30);
        view.set_rows(vec![row(1, "a", 50.0, 0.0), row(2, "b", 40.0, 0.0)]);
        view.select_next();
        assert_eq!(view.selected_row().map(|r| r.pid), Some(2));

        view.set_rows(vec![row(1, "a", 10.0, 0.0), row(2, "b", 40.0, 0.0)]);
        assert_eq!(view.selected(), Some(0));
        assert_eq!(view.selected_row().map(|r| r.pid), Some(2));
    }

    #[test]
    fn test_selection_reclamped_when_rows_shrink() {
        let mut view = ProcessView::new(30);
        view.set_rows((1..=5).map(|pid| row(pid, "x", 0.0, 0.0)).collect());
        for _ in 0..10 {
            view.select_next();
        }
        assert_eq!(view.selected(), Some(4));

        view.set_rows(vec![row(9, "x", 0.0, 0.0), row(8, "x", 0.0, 0.0)]);
        assert_eq!(view.selected(), Some(1));

        view.set_rows(Vec::new());
        assert_eq!(view.selected(), None);
    }

    #[test]
    fn test_refresh_maps_raw_rows() {
        let raw = vec![
            RawProcess {
                pid: "5".to_string(),
                user: "root".to_string(),
                command: "init".to_string(),
                cpu: "0.5".to_string(),
                mem: "0.1".to_string(),
            },
            RawProcess::default(),
        ];
        let mut view = ProcessView::new(30);
        view.refresh(&raw);
        assert_eq!(pids(&view), vec![5]);
    }
}
