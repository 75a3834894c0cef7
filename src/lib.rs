//! Bottom-anchored terminal input line.
//!
//! moorline pins an editable prompt to the last terminal row while arbitrary,
//! uncoordinated output keeps streaming above it. Native scrolling is confined
//! to a scroll region with plain escape sequences; there is no alternate
//! screen and no terminal emulation.
//!
//! Invariant: single output gate — only `core::output::OutputGate::flush(..)`
//! writes to the terminal.
//!
//! # Overview
//! - [`LineEngine`] owns the terminal write channel between `init()` and
//!   `destroy()`; every write flows through its interceptor and lands inside
//!   the scroll region while the visible cursor stays parked on the input row.
//! - Keystrokes arrive as raw chunks and decode into edit commands
//!   ([`decode`], [`Cmd`]); submitted lines reach the caller through the
//!   submit callback and a bounded [`History`].
//! - [`ProcessTerminal`] provides raw mode, a stdin reader thread, and
//!   SIGWINCH resize notifications on Unix.
//!
//! ```no_run
//! use moorline::{LineEngine, ProcessTerminal};
//!
//! let mut engine = LineEngine::new(ProcessTerminal::new());
//! engine.set_on_submit(Some(Box::new(|line| {
//!     // hand the line to the application
//!     let _ = line;
//! })));
//! engine.start().expect("terminal start");
//! while engine.run_blocking_once() {}
//! engine.close();
//! ```

pub mod config;
pub mod core;
pub mod platform;
pub mod runtime;

/// Keystroke decoding.
pub use crate::core::decoder::{decode, Cmd};

/// Line editing and history.
pub use crate::core::history::{History, HISTORY_CAPACITY};
pub use crate::core::line_buffer::LineBuffer;

/// Row layout math.
pub use crate::core::layout::Layout;

/// Typed output commands and the single write gate.
pub use crate::core::output::{OutputGate, TerminalCmd};

/// Terminal interfaces and process-backed implementation.
pub use crate::core::terminal::{Terminal, TerminalGuard};
pub use crate::platform::chunker::InputChunker;
pub use crate::platform::process_terminal::ProcessTerminal;

/// Environment configuration.
pub use crate::config::EnvConfig;

/// ANSI-aware width helper.
pub use crate::core::text::width::visible_width;

/// The engine.
pub use crate::runtime::engine::{EngineEvent, LineEngine, OutputHandle};
