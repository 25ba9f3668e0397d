//! Developer traces ("level 6") with a thread-local capture sink.
//!
//! Compiled queries and batch timings are emitted through [`dev6!`](crate::dev6). They always
//! go to the `nexusdoc::dev6` log target at TRACE; when a sink is enabled on the current
//! thread they are also captured so tests can assert on them without a global logger.

use std::cell::RefCell;

thread_local! {
    static SINK: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Disables the current thread's sink when dropped.
#[must_use = "the sink is disabled as soon as the guard is dropped"]
pub struct SinkGuard(());

impl Drop for SinkGuard {
    fn drop(&mut self) {
        SINK.with(|s| s.borrow_mut().take());
    }
}

pub fn enable_thread_sink() -> SinkGuard {
    SINK.with(|s| *s.borrow_mut() = Some(Vec::new()));
    SinkGuard(())
}

pub fn record(line: String) {
    SINK.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(line);
        }
    });
}

/// Captured lines so far, emptying the sink. Empty when no sink is enabled.
pub fn drain() -> Vec<String> {
    SINK.with(|s| s.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Captured lines so far, leaving them in place.
pub fn snapshot() -> Vec<String> {
    SINK.with(|s| s.borrow().clone().unwrap_or_default())
}

/// Runs `f` with a fresh sink and returns its result together with the captured lines.
pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let _guard = enable_thread_sink();
    let out = f();
    (out, drain())
}

#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let line = format!($($arg)*);
        ::log::trace!(target: "nexusdoc::dev6", "{}", line);
        $crate::utils::devlog::record(line);
    }};
}
