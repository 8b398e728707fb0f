//! Helper to set the backtrace env var.

use std::sync::Once;

static INIT: Once = Once::new();

/// Sets `RUST_BACKTRACE=1` unless a value was provided explicitly.
///
/// Must be called at startup, before any other thread is spawned.
pub fn enable() {
    INIT.call_once(|| {
        if std::env::var_os("RUST_BACKTRACE").is_none() {
            // SAFETY: called once, before the runtime spawns any thread.
            unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
        }
    });
}
