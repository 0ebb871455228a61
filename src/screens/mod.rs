pub mod dashboard;

// The pulse dashboard is a single screen:
// - Header with sort key and rule status
// - CPU/MEM/SWAP/DISK gauges, per-core load and network rates
// - Filterable process table
// - Status line and help overlay ('?')

pub use dashboard::render;
