//! The input-line engine: lifecycle, output interception, render.
//!
//! The engine pins an editable prompt to the bottom terminal row while
//! intercepted writes stream inside a scroll region above it. It owns the
//! write channel from `init()` to `destroy()`; everything it emits flows
//! through the single [`OutputGate`].
//!
//! Event handling is single-threaded and cooperative: one event runs to
//! completion before the next, so escape sequences are never interleaved
//! mid-emission. Platform threads only enqueue events on the wake.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::config::EnvConfig;
use crate::core::decoder::{decode, Cmd};
use crate::core::history::History;
use crate::core::layout::Layout;
use crate::core::line_buffer::LineBuffer;
use crate::core::output::{OutputGate, TerminalCmd};
use crate::core::terminal::Terminal;
use crate::core::text::width::visible_width;

const STOP_DRAIN_MAX_MS: u64 = 1000;
const STOP_DRAIN_IDLE_MS: u64 = 50;

const DEFAULT_PROMPT: &str = "> ";

/// Events dispatched through the engine's single processing entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Raw keystroke chunk from the terminal.
    Input(String),
    /// Terminal size changed; the engine re-queries the terminal.
    Resize,
    /// External write destined for the terminal.
    Output(String),
}

#[derive(Default)]
struct WakeState {
    events: Vec<EngineEvent>,
    stop_requested: bool,
}

/// Cross-thread event queue feeding the engine.
#[derive(Default)]
pub(crate) struct EngineWake {
    state: Mutex<WakeState>,
    cvar: Condvar,
}

impl EngineWake {
    fn lock(&self) -> std::sync::MutexGuard<'_, WakeState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn enqueue(&self, event: EngineEvent) {
        let mut state = self.lock();
        // Consecutive resizes carry no payload; one is enough.
        if !(event == EngineEvent::Resize && state.events.last() == Some(&EngineEvent::Resize)) {
            state.events.push(event);
        }
        self.cvar.notify_one();
    }

    fn wait_for_event(&self) -> bool {
        let mut state = self.lock();
        while !state.stop_requested && state.events.is_empty() {
            state = self
                .cvar
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        !state.stop_requested
    }

    fn drain(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.lock().events)
    }

    fn request_stop(&self) {
        self.lock().stop_requested = true;
        self.cvar.notify_all();
    }

    fn reset_for_start(&self) {
        let mut state = self.lock();
        state.stop_requested = false;
        state.events.clear();
    }
}

/// Cloneable handle for uncoordinated writers on other threads.
///
/// Writes are enqueued and confined to the scroll region when the engine
/// drains them; there is no other sanctioned write path while the engine is
/// active.
#[derive(Clone)]
pub struct OutputHandle {
    wake: Arc<EngineWake>,
}

impl OutputHandle {
    pub fn write(&self, data: impl Into<String>) {
        self.wake.enqueue(EngineEvent::Output(data.into()));
    }
}

/// Best-effort terminal state restoration for crashes and signals.
///
/// A scroll region that survives the process corrupts the user's shell, so
/// cleanup resets it and re-shows the cursor. The sequences are idempotent
/// and ignored by terminals that never saw the region.
#[derive(Debug, Default)]
pub(crate) struct CrashCleanup {
    ran: AtomicBool,
}

impl CrashCleanup {
    pub(crate) fn run<T: Terminal>(&self, terminal: &mut T) {
        if self.ran.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut output = OutputGate::new();
        output.push(TerminalCmd::ResetScrollRegion);
        output.push(TerminalCmd::ShowCursor);
        output.flush(terminal);
    }

    #[cfg(all(unix, not(test)))]
    fn run_best_effort(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut terminal = crate::platform::hooks::TtyWriter::new();
            self.run(&mut terminal);
        }));
    }
}

/// Bottom-anchored input line over a [`Terminal`].
pub struct LineEngine<T: Terminal> {
    terminal: T,
    output: OutputGate,
    layout: Layout,
    buffer: LineBuffer,
    history: History,
    prompt: String,
    prompt_width: usize,
    active: bool,
    paused: bool,
    destroyed: bool,
    started: bool,
    intercept: bool,
    wake: Arc<EngineWake>,
    on_submit: Option<Box<dyn FnMut(String)>>,
    on_exit: Option<Box<dyn FnMut()>>,
    #[cfg(all(unix, not(test)))]
    signal_hook_guard: Option<crate::platform::hooks::SignalHookGuard>,
    #[cfg(all(unix, not(test)))]
    panic_hook_guard: Option<crate::platform::hooks::PanicHookGuard>,
}

impl<T: Terminal> LineEngine<T> {
    pub fn new(terminal: T) -> Self {
        let intercept = terminal.is_interactive() && !EnvConfig::from_env().passthrough;
        let layout = Layout::compute(terminal.rows(), terminal.columns());
        Self {
            terminal,
            output: OutputGate::new(),
            layout,
            buffer: LineBuffer::new(),
            history: History::new(),
            prompt: DEFAULT_PROMPT.to_string(),
            prompt_width: visible_width(DEFAULT_PROMPT),
            active: false,
            paused: false,
            destroyed: false,
            started: false,
            intercept,
            wake: Arc::new(EngineWake::default()),
            on_submit: None,
            on_exit: None,
            #[cfg(all(unix, not(test)))]
            signal_hook_guard: None,
            #[cfg(all(unix, not(test)))]
            panic_hook_guard: None,
        }
    }

    pub fn set_on_submit(&mut self, handler: Option<Box<dyn FnMut(String)>>) {
        self.on_submit = handler;
    }

    /// Override the action taken when the session terminates (interrupt on an
    /// empty buffer, or `close()`). Defaults to exiting the process.
    pub fn set_on_exit(&mut self, handler: Option<Box<dyn FnMut()>>) {
        self.on_exit = handler;
    }

    /// Replace the prompt. Styled prompts are fine; layout math uses the
    /// visible width.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        self.prompt_width = visible_width(&self.prompt);
    }

    /// Current contents of the editable line.
    pub fn line(&self) -> &str {
        self.buffer.text()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Handle for writers on other threads; drained through [`Self::run_blocking_once`].
    pub fn output_handle(&self) -> OutputHandle {
        OutputHandle {
            wake: Arc::clone(&self.wake),
        }
    }

    /// Start the terminal (raw mode, reader/resize threads) and acquire the
    /// screen. For purely cooperative use, call [`Self::init`] directly
    /// instead and dispatch events yourself.
    pub fn start(&mut self) -> io::Result<()> {
        if self.started || self.destroyed {
            return Ok(());
        }
        self.wake.reset_for_start();

        let wake_input = Arc::clone(&self.wake);
        let wake_resize = Arc::clone(&self.wake);
        self.terminal.start(
            Box::new(move |data| {
                wake_input.enqueue(EngineEvent::Input(data));
            }),
            Box::new(move || {
                wake_resize.enqueue(EngineEvent::Resize);
            }),
        )?;
        self.started = true;

        #[cfg(all(unix, not(test)))]
        self.install_cleanup_hooks();

        self.init();
        Ok(())
    }

    /// Acquire the screen: confine scrolling, paint chrome, establish the
    /// output anchor, render the input row. No-op if already active,
    /// destroyed, or not intercepting.
    pub fn init(&mut self) {
        if self.active || self.destroyed {
            return;
        }
        self.active = true;
        self.paused = false;
        if self.intercept {
            self.acquire_screen();
        }
    }

    /// Block until at least one event is queued, then drain and handle all of
    /// them. Returns false once the engine should stop.
    pub fn run_blocking_once(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        if !self.wake.wait_for_event() {
            return false;
        }
        for event in self.wake.drain() {
            self.handle_event(event);
        }
        !self.destroyed
    }

    /// Single event-processing entry point.
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            // Writes are never dropped: pass through whenever interception
            // is off (inactive, paused, destroyed, or non-interactive).
            EngineEvent::Output(data) => self.write_out(&data),
            EngineEvent::Input(data) => {
                if !self.active || self.paused || self.destroyed {
                    return;
                }
                for cmd in decode(&data) {
                    self.apply(cmd);
                    if self.destroyed {
                        break;
                    }
                }
            }
            EngineEvent::Resize => {
                if self.destroyed {
                    return;
                }
                self.layout = Layout::compute(self.terminal.rows(), self.terminal.columns());
                if self.active && !self.paused && self.intercept {
                    self.acquire_screen();
                }
            }
        }
    }

    /// Write to the terminal through the interceptor.
    pub fn write(&mut self, data: impl Into<String>) {
        self.handle_event(EngineEvent::Output(data.into()));
    }

    /// Re-render the input row. No-op if paused or inactive.
    pub fn prompt(&mut self) {
        if !self.active || self.paused || self.destroyed {
            return;
        }
        self.push_render();
        self.flush();
    }

    /// Release the full terminal so an external interactive helper can borrow
    /// it; the chrome stays on screen but scrolling is no longer confined and
    /// writes pass through.
    pub fn pause(&mut self) {
        if !self.active || self.paused || self.destroyed {
            return;
        }
        self.paused = true;
        if self.intercept {
            // Continue where streamed output stopped, then hand the whole
            // screen back.
            self.output.push(TerminalCmd::RestoreCursor);
            self.output.push(TerminalCmd::ResetScrollRegion);
            self.flush();
        }
    }

    /// Re-acquire the screen after [`Self::pause`]. Recomputes the layout in
    /// case the terminal was resized while paused.
    pub fn resume(&mut self) {
        if !self.active || !self.paused || self.destroyed {
            return;
        }
        self.paused = false;
        if self.intercept {
            self.acquire_screen();
        }
    }

    /// Release the screen permanently. Irreversible: a destroyed engine
    /// ignores all further lifecycle calls and passes writes through.
    pub fn destroy(&mut self) {
        if !self.active || self.destroyed {
            return;
        }
        // While paused the scroll region is already reset and an external
        // helper may own the screen; skip the chrome erase in that case.
        if self.intercept && !self.paused {
            self.output.push(TerminalCmd::ResetScrollRegion);
            self.output.push(TerminalCmd::MoveTo(self.layout.separator_row, 1));
            self.output.push(TerminalCmd::ClearLine);
            self.output.push(TerminalCmd::MoveTo(self.layout.input_row, 1));
            self.output.push(TerminalCmd::ClearLine);
            self.flush();
        }
        self.active = false;
        self.destroyed = true;
    }

    /// Destroy, drain in-flight keystrokes, and stop the terminal.
    pub fn stop(&mut self) -> io::Result<()> {
        self.wake.request_stop();
        self.destroy();
        let result = if self.started {
            self.terminal
                .drain_input(STOP_DRAIN_MAX_MS, STOP_DRAIN_IDLE_MS);
            self.started = false;
            self.terminal.stop()
        } else {
            Ok(())
        };
        #[cfg(all(unix, not(test)))]
        self.uninstall_cleanup_hooks();
        result
    }

    /// Full teardown followed by session termination: runs the exit handler,
    /// or exits the process when none is set.
    pub fn close(&mut self) {
        let _ = self.stop();
        match self.on_exit.as_mut() {
            Some(handler) => handler(),
            None => std::process::exit(0),
        }
    }

    #[cfg(all(unix, not(test)))]
    fn install_cleanup_hooks(&mut self) {
        let cleanup = Arc::new(CrashCleanup::default());
        let signal_cleanup = Arc::clone(&cleanup);
        let panic_cleanup = Arc::clone(&cleanup);
        self.signal_hook_guard = Some(crate::platform::hooks::install_signal_handlers(move || {
            signal_cleanup.run_best_effort()
        }));
        self.panic_hook_guard = Some(crate::platform::hooks::install_panic_hook(move || {
            panic_cleanup.run_best_effort()
        }));
    }

    #[cfg(all(unix, not(test)))]
    fn uninstall_cleanup_hooks(&mut self) {
        self.signal_hook_guard = None;
        self.panic_hook_guard = None;
    }

    fn apply(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::Insert(ch) => {
                self.buffer.insert_char(ch);
                self.push_render();
            }
            Cmd::CursorLeft => {
                self.buffer.move_left();
                self.push_render();
            }
            Cmd::CursorRight => {
                self.buffer.move_right();
                self.push_render();
            }
            Cmd::CursorHome => {
                self.buffer.move_home();
                self.push_render();
            }
            Cmd::CursorEnd => {
                self.buffer.move_end();
                self.push_render();
            }
            Cmd::Backspace => {
                self.buffer.backspace();
                self.push_render();
            }
            Cmd::DeleteForward => {
                self.buffer.delete_forward();
                self.push_render();
            }
            Cmd::KillLine => {
                self.buffer.kill_line();
                self.push_render();
            }
            Cmd::KillToEnd => {
                self.buffer.kill_to_end();
                self.push_render();
            }
            Cmd::DeleteWordBack => {
                self.buffer.delete_word_back();
                self.push_render();
            }
            Cmd::HistoryUp => {
                self.history.up(&mut self.buffer);
                self.push_render();
            }
            Cmd::HistoryDown => {
                self.history.down(&mut self.buffer);
                self.push_render();
            }
            Cmd::Submit => {
                self.submit();
                return;
            }
            Cmd::Paste(text) => {
                self.buffer.set_text(text);
                self.push_render();
                self.flush();
                self.submit();
                return;
            }
            Cmd::Interrupt => {
                if self.buffer.is_empty() {
                    self.close();
                } else {
                    self.buffer.clear();
                    self.history.reset_browsing();
                    self.push_render();
                    self.flush();
                }
                return;
            }
        }
        self.flush();
    }

    fn submit(&mut self) {
        let line = self.buffer.take();
        self.history.push(&line);
        self.history.reset_browsing();
        self.push_render();
        self.flush();
        if let Some(handler) = self.on_submit.as_mut() {
            handler(line);
        }
    }

    /// Confined write: restore the output anchor, write, save the new anchor,
    /// park the visible cursor back on the input row.
    fn write_out(&mut self, data: &str) {
        if self.active && !self.paused && !self.destroyed && self.intercept {
            self.output.push(TerminalCmd::RestoreCursor);
            self.output.push(TerminalCmd::bytes(data));
            self.output.push(TerminalCmd::SaveCursor);
            self.output
                .push(TerminalCmd::MoveTo(self.layout.input_row, self.input_cursor_col()));
        } else {
            self.output.push(TerminalCmd::bytes(data));
        }
        self.flush();
    }

    fn acquire_screen(&mut self) {
        self.layout = Layout::compute(self.terminal.rows(), self.terminal.columns());
        self.layout.apply_scroll_region(&mut self.output);
        self.layout.draw_chrome(&mut self.output);
        self.layout.reset_anchor(&mut self.output);
        self.push_render();
        self.flush();
    }

    /// Buffer slice and cursor cell shown on the input row. When the line is
    /// wider than the terminal the window is centred on the cursor:
    /// `window_start = max(0, cursor - window/2)`.
    fn display_state(&self) -> (String, usize) {
        let avail = (self.layout.cols as usize).saturating_sub(self.prompt_width + 1);
        let cursor = self.buffer.cursor_chars();
        let chars: Vec<char> = self.buffer.text().chars().collect();
        if chars.len() <= avail {
            return (self.buffer.text().to_string(), cursor);
        }
        let start = cursor.saturating_sub(avail / 2);
        let end = (start + avail).min(chars.len());
        (chars[start..end].iter().collect(), cursor - start)
    }

    fn input_cursor_col(&self) -> u16 {
        let (_, display_cursor) = self.display_state();
        (self.prompt_width + display_cursor + 1) as u16
    }

    fn push_render(&mut self) {
        if !self.intercept {
            return;
        }
        let (slice, display_cursor) = self.display_state();
        let row = self.layout.input_row;
        self.output.push(TerminalCmd::MoveTo(row, 1));
        self.output.push(TerminalCmd::ClearLine);
        self.output
            .push(TerminalCmd::bytes(format!("{}{}", self.prompt, slice)));
        self.output
            .push(TerminalCmd::MoveTo(row, (self.prompt_width + display_cursor + 1) as u16));
    }

    fn flush(&mut self) {
        self.output.flush(&mut self.terminal);
    }
}
