//! Crate-wide error type and signal constants.
//!
//! Per the error handling design: suspension interrupts (cancellation,
//! preemption, a user-supplied reason) are never represented here — they
//! travel back to the caller as a plain `i64` signal, see [`signal`].
//! `Error` is reserved for the two fatal cases: a contract violation, or a
//! coroutine body that unwound through a panic.

use std::fmt;

/// Fatal conditions that abort the current replication.
#[derive(Debug)]
pub enum Error {
    /// A release-mode invariant was violated (bad handle, capacity overflow,
    /// heap ordering broken, ...). Carries a short `"file:line: message"`
    /// style description.
    Contract(String),
    /// A process body panicked while running.
    Panicked(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Contract(msg) => write!(f, "contract violation: {}", msg),
            Error::Panicked(msg) => write!(f, "process panicked: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Aborts the replication with a contract violation. Always compiled in,
/// unlike `debug_assert!`. Panics with a real [`Error::Contract`] value
/// (rather than a bare string) so a caller further up the stack that
/// catches the unwind — see the coroutine trampoline — can recover it.
macro_rules! contract {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            std::panic::panic_any($crate::error::Error::Contract(format!(
                "{}:{}: {}",
                file!(),
                line!(),
                format!($($arg)*)
            )));
        }
    };
}
pub(crate) use contract;

/// Conventional signal codes returned by suspending calls. Anything
/// non-zero is an interrupt reason; values below [`signal::USER_BASE`] are
/// reserved by the runtime, the rest are free for application use.
pub mod signal {
    /// The suspending call completed normally.
    pub const SUCCESS: i64 = 0;
    /// The process was forcibly preempted out of a resource it was
    /// acquiring or holding.
    pub const PREEMPTED: i64 = -1;
    /// The pending wait was cancelled (the appointment was removed before
    /// firing, or the process was stopped).
    pub const CANCELLED: i64 = -2;
    /// First value available for application-defined interrupt reasons.
    pub const USER_BASE: i64 = 1;
}
