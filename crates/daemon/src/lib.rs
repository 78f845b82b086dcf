// Taskforge Daemon - Composition Root
// Wires core, the RESP transport and the metrics adapter together

pub mod bootstrap;
pub mod logging;
pub mod settings;

pub use bootstrap::{bootstrap, check_connectivity, Runtime};
