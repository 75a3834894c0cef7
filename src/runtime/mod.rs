//! Engine runtime.

pub mod engine;

pub use engine::{EngineEvent, LineEngine, OutputHandle};
