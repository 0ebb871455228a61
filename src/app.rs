/// Main TUI application

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use log::{debug, info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::executor::CommandOutput;
use crate::core::sampler::CounterReadings;
use crate::core::keymap::Key;
use crate::core::state::{CommandOutcome, Effect, ExecRequest, Msg, Sample};
use crate::core::{
    view_model, ActionEngine, CommandExecutor, CounterSource, DashboardState, ProcCounterReader,
    ProcessLister, PsLister, ShellExecutor,
};
use crate::screens;
use crate::utils::AppConfig;

/// Runs `Effect::Exec` requests off the message loop and posts the outcome back
#[derive(Clone)]
pub struct EffectRunner {
    executor: Arc<dyn CommandExecutor>,
    finished: mpsc::UnboundedSender<CommandOutcome>,
}

impl EffectRunner {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        finished: mpsc::UnboundedSender<CommandOutcome>,
    ) -> Self {
        Self { executor, finished }
    }

    pub fn spawn(&self, request: ExecRequest) -> JoinHandle<()> {
        let executor = Arc::clone(&self.executor);
        let finished = self.finished.clone();

        tokio::spawn(async move {
            let command = request.command.clone();
            let output = tokio::task::spawn_blocking(move || executor.execute(&command))
                .await
                .unwrap_or_else(|e| CommandOutput::failed(format!("command task failed: {}", e)));

            if finished.send(CommandOutcome { request, output }).is_err() {
                debug!("dashboard closed before command finished");
            }
        })
    }
}

pub struct App {
    state: DashboardState,
    counters: Arc<dyn CounterSource>,
    lister: Arc<dyn ProcessLister>,
    runner: EffectRunner,
    finished_rx: mpsc::UnboundedReceiver<CommandOutcome>,
    refresh_interval: Duration,
}

impl App {
    /// Build the dashboard over the live `/proc`, `ps` and shell collaborators
    pub fn new(config: &AppConfig, actions_enabled: bool) -> Result<Self> {
        let mut engine = ActionEngine::from_config(&config.actions)?;
        if !actions_enabled {
            engine = engine.disabled();
        }

        let counters = ProcCounterReader::new(&config.proc_root, &config.disk_mount)
            .exclude_interfaces(config.exclude_interfaces.clone());

        Ok(Self::with_collaborators(
            DashboardState::with_engine(config, engine),
            Arc::new(counters),
            Arc::new(PsLister),
            Arc::new(ShellExecutor),
            config.refresh_interval()?,
        ))
    }

    pub fn with_collaborators(
        state: DashboardState,
        counters: Arc<dyn CounterSource>,
        lister: Arc<dyn ProcessLister>,
        executor: Arc<dyn CommandExecutor>,
        refresh_interval: Duration,
    ) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        Self {
            state,
            counters,
            lister,
            runner: EffectRunner::new(executor, finished_tx),
            finished_rx,
            refresh_interval,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        info!("dashboard started, refresh every {:?}", self.refresh_interval);
        let result = self.run_loop(&mut terminal).await;
        info!("dashboard stopped");

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn run_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events = EventStream::new();

        loop {
            let vm = view_model::build(&self.state);
            terminal.draw(|f| screens::render(f, &vm))?;

            let msg = tokio::select! {
                _ = ticker.tick() => Some(self.sample().await),
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        Some(Msg::Key(Key::from(key)))
                    }
                    // Resize and other events only need a redraw
                    Some(Ok(_)) => None,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                },
                Some(outcome) = self.finished_rx.recv() => Some(Msg::CommandFinished(outcome)),
            };

            let Some(msg) = msg else {
                continue;
            };

            if self.dispatch(msg) {
                return Ok(());
            }
        }
    }

    /// Read counters and processes off the async runtime.
    /// A failed read still ticks, with no readings and no processes.
    async fn sample(&self) -> Msg {
        let counters = Arc::clone(&self.counters);
        let lister = Arc::clone(&self.lister);
        let sample = tokio::task::spawn_blocking(move || Sample::collect(&*counters, &*lister))
            .await
            .unwrap_or_else(|e| {
                warn!("sampling task failed: {}", e);
                Sample {
                    at: Instant::now(),
                    counters: CounterReadings::default(),
                    processes: Vec::new(),
                }
            });
        Msg::Tick(Box::new(sample))
    }

    /// Feed one message through the state machine and run its effects.
    /// Returns true when the dashboard should quit.
    fn dispatch(&mut self, msg: Msg) -> bool {
        let mut quit = false;
        for effect in self.state.update(msg) {
            match effect {
                Effect::Quit => quit = true,
                Effect::Exec(request) => {
                    info!("running `{}`", request.command);
                    self.runner.spawn(request);
                }
            }
        }
        quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counters::{MockCounterSource, ProbeError};
    use crate::core::executor::MockCommandExecutor;
    use crate::core::processes::{MockProcessLister, RawProcess};
    use crate::core::state::{ExecOrigin, MessageLevel};

    fn offline_counters() -> MockCounterSource {
        let mut counters = MockCounterSource::new();
        counters
            .expect_cpu_times()
            .returning(|| Err(ProbeError::Incomplete("stat")));
        counters
            .expect_memory()
            .returning(|| Err(ProbeError::Incomplete("meminfo")));
        counters
            .expect_disk()
            .returning(|| Err(ProbeError::MountNotFound("/".to_string())));
        counters
            .expect_network()
            .returning(|| Err(ProbeError::Incomplete("net/dev")));
        counters
    }

    fn hot_python() -> MockProcessLister {
        let mut lister = MockProcessLister::new();
        lister.expect_list().returning(|| {
            Ok(vec![RawProcess {
                pid: "77".to_string(),
                user: "bob".to_string(),
                command: "python".to_string(),
                cpu: "95.0".to_string(),
                mem: "1.0".to_string(),
            }])
        });
        lister
    }

    fn app_with(lister: MockProcessLister, executor: MockCommandExecutor) -> App {
        App::with_collaborators(
            DashboardState::new(&AppConfig::default()).unwrap(),
            Arc::new(offline_counters()),
            Arc::new(lister),
            Arc::new(executor),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_effect_runner_reports_outcome() {
        let mut executor = MockCommandExecutor::new();
        executor.expect_execute().times(1).returning(|command| CommandOutput {
            success: true,
            output: format!("ran {}", command),
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = EffectRunner::new(Arc::new(executor), tx);
        let request = ExecRequest {
            origin: ExecOrigin::Kill { pid: 5 },
            command: "kill -9 5".to_string(),
        };
        runner.spawn(request.clone()).await.unwrap();

        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.request, request);
        assert_eq!(outcome.output.output, "ran kill -9 5");
    }

    #[tokio::test]
    async fn test_rule_fires_once_and_outcome_is_recorded() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_execute()
            .times(1)
            .returning(|_| CommandOutput::failed("Operation not permitted"));
        let mut app = app_with(hot_python(), executor);

        for _ in 0..3 {
            let msg = app.sample().await;
            assert!(!app.dispatch(msg));
        }

        let outcome = app.finished_rx.recv().await.unwrap();
        assert!(!app.dispatch(Msg::CommandFinished(outcome)));

        let message = app.state().message().unwrap();
        assert_eq!(message.level, MessageLevel::Error);
        assert_eq!(
            message.text,
            "Rule 'Kill High CPU Python' failed on pid 77: Operation not permitted"
        );
    }

    #[tokio::test]
    async fn test_lister_failure_yields_empty_table() {
        let mut lister = MockProcessLister::new();
        lister.expect_list().returning(|| {
            Err(ProbeError::Command {
                command: "ps".to_string(),
                reason: "not found".to_string(),
            })
        });
        let mut app = app_with(lister, MockCommandExecutor::new());

        let msg = app.sample().await;
        assert!(!app.dispatch(msg));
        assert!(app.state().view().display_rows().is_empty());
        assert_eq!(app.state().ticks(), 1);
    }

    #[tokio::test]
    async fn test_quit_key() {
        let mut app = app_with(hot_python(), MockCommandExecutor::new());
        assert!(app.dispatch(Msg::Key(Key::Char('q'))));
    }

    #[tokio::test]
    async fn test_panicking_lister_still_ticks() {
        let mut lister = MockProcessLister::new();
        lister
            .expect_list()
            .returning(|| panic!("ps output could not be decoded"));
        let mut app = app_with(lister, MockCommandExecutor::new());

        let msg = app.sample().await;
        assert!(!app.dispatch(msg));
        assert_eq!(app.state().ticks(), 1);
        assert!(app.state().view().display_rows().is_empty());

        // The loop keeps going on the next tick
        let msg = app.sample().await;
        assert!(!app.dispatch(msg));
        assert_eq!(app.state().ticks(), 2);
    }
}
