//! Logging abstractions for runtime-agnostic logging
//!
//! Components never pick a logging backend themselves; they receive an
//! `Arc<dyn Logger>` at construction and prefix their lines with
//! `[Component]`.

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{Level, Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use memory::{LogLine, MemoryLogger};
