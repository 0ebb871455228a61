pub mod actions;
pub mod counters;
pub mod executor;
pub mod keymap;
pub mod process_view;
pub mod processes;
pub mod sampler;
pub mod state;
pub mod view_model;

pub use actions::ActionEngine;
pub use counters::{CounterSource, ProbeError, ProcCounterReader};
pub use executor::{CommandExecutor, ShellExecutor};
pub use processes::{ProcessLister, PsLister};
pub use state::DashboardState;
