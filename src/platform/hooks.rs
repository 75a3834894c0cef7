//! Crash and signal cleanup.
//!
//! A scroll region left confined after an abnormal exit corrupts the user's
//! shell, so SIGINT/SIGTERM and panics must reset it best-effort. Cleanup
//! writes go straight to `/dev/tty`, not stdout, and never block.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use libc::c_int;
use signal_hook::iterator::Signals;

use crate::core::terminal::Terminal;

/// Signal handler guard; closes the signal stream and joins its thread on drop.
pub struct SignalHookGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for SignalHookGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Run `cleanup` once on SIGINT or SIGTERM.
pub fn install_signal_handlers<F>(cleanup: F) -> SignalHookGuard
where
    F: Fn() + Send + Sync + 'static,
{
    let cleanup = Arc::new(cleanup);
    let ran = Arc::new(AtomicBool::new(false));
    let mut signals =
        Signals::new([libc::SIGINT, libc::SIGTERM]).expect("failed to register signal handlers");
    let handle = signals.handle();

    let thread = thread::spawn(move || {
        for _ in signals.forever() {
            if !ran.swap(true, Ordering::SeqCst) {
                cleanup();
            }
        }
    });

    SignalHookGuard {
        handle,
        thread: Some(thread),
    }
}

/// Panic hook guard; the wrapper hook stays installed after drop but becomes
/// inert, so hooks installed later by other code are never clobbered.
pub struct PanicHookGuard {
    active: Arc<AtomicBool>,
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Wrap the current panic hook with one that runs `cleanup` once first, then
/// delegates to the previous hook.
pub fn install_panic_hook<F>(cleanup: F) -> PanicHookGuard
where
    F: Fn() + Send + Sync + 'static,
{
    let active = Arc::new(AtomicBool::new(true));
    let ran = AtomicBool::new(false);
    let hook_active = Arc::clone(&active);
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        if hook_active.load(Ordering::SeqCst) && !ran.swap(true, Ordering::SeqCst) {
            cleanup();
        }
        previous(info);
    }));

    PanicHookGuard { active }
}

/// Minimal terminal writer for panic/signal cleanup.
///
/// Best-effort by construction:
/// - never panics
/// - never blocks (the fd is opened non-blocking; a full pipe drops output)
/// - does not touch termios / raw mode
pub(crate) struct TtyWriter {
    fd: c_int,
    owns_fd: bool,
}

impl TtyWriter {
    pub(crate) fn new() -> Self {
        // Prefer the controlling TTY; it works even when stdout is redirected.
        let flags = libc::O_WRONLY | libc::O_NONBLOCK | libc::O_NOCTTY | libc::O_CLOEXEC;
        let fd = unsafe { libc::open(c"/dev/tty".as_ptr(), flags) };
        if fd >= 0 {
            Self { fd, owns_fd: true }
        } else {
            // No controlling TTY: disable output rather than risk a blocking
            // write to stdout/stderr.
            Self {
                fd: -1,
                owns_fd: false,
            }
        }
    }

    fn write_best_effort(&self, data: &str) {
        if self.fd < 0 || data.is_empty() {
            return;
        }

        let bytes = data.as_bytes();
        let mut written = 0;
        while written < bytes.len() {
            let remaining = &bytes[written..];
            let result = unsafe {
                libc::write(
                    self.fd,
                    remaining.as_ptr() as *const libc::c_void,
                    remaining.len(),
                )
            };
            if result > 0 {
                written = written.saturating_add(result as usize);
                continue;
            }
            if result == 0 {
                break;
            }
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            // WouldBlock or anything else: drop the rest.
            break;
        }
    }
}

impl Drop for TtyWriter {
    fn drop(&mut self) {
        if self.owns_fd {
            unsafe {
                libc::close(self.fd);
            }
        }
    }
}

impl Terminal for TtyWriter {
    fn start(
        &mut self,
        _on_input: Box<dyn FnMut(String) + Send>,
        _on_resize: Box<dyn FnMut() + Send>,
    ) -> std::io::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn drain_input(&mut self, _max_ms: u64, _idle_ms: u64) {}

    fn write(&mut self, data: &str) {
        self.write_best_effort(data);
    }

    fn columns(&self) -> u16 {
        80
    }

    fn rows(&self) -> u16 {
        24
    }

    fn is_interactive(&self) -> bool {
        true
    }
}
