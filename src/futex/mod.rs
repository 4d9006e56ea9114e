//! # Futex backends
//!
//! Futex is "fast userspace mutex": the state lives in a plain 32-bit word in user memory,
//! and the kernel is only asked for help when a thread really has to sleep.
//! There are just 2 operations we care about:
//! - `wait(word, expected)` - sleep, but only if `*word == expected` at the moment the kernel checks it.
//!   The check and the sleep are atomic from the point of view of `wake`, so no wake-up can slip in between.
//! - `wake(word, n)` - wake up to `n` threads sleeping on the same word
//!
//! Neither of them changes the word. They don't take any part in memory consistency either,
//! they just spare us from spinning. Whoever uses them must keep re-checking the word.
//!
//! The [Futex] trait hides the syscall so a slot can run on top of the kernel ([LinuxFutex])
//! or on top of in-process stand-ins ([simulated]) in tests.

use std::{sync::atomic::AtomicU32, time::Duration};

use crate::error::SyncError;

#[cfg(target_os = "linux")]
mod linux;
pub mod simulated;

#[cfg(target_os = "linux")]
pub use linux::{LinuxFutex, Scope};

/// What a non-fatal return from [Futex::wait] means.
/// All of them tell the caller the same thing: go and look at the word again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// somebody called wake on the word
    Woken,
    /// the word didn't hold the expected value, so the kernel didn't even put us to sleep (EAGAIN)
    ValueChanged,
    /// a signal or just the kernel being the kernel (EINTR)
    Spurious,
}

/// The kernel wait / wake capability.
///
/// `wait` may return at any time for no reason, callers loop.
/// A timeout is reported as [SyncError::TimedOut], never as one of the [WaitOutcome]s.
pub trait Futex: Send + Sync {
    fn wait(
        &self,
        word: &AtomicU32,
        expected: u32,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, SyncError>;

    /// returns the number of threads actually woken, 0 is fine
    fn wake(&self, word: &AtomicU32, count: u32) -> Result<u32, SyncError>;
}

impl<F: Futex + ?Sized> Futex for &F {
    fn wait(
        &self,
        word: &AtomicU32,
        expected: u32,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, SyncError> {
        (**self).wait(word, expected, timeout)
    }

    fn wake(&self, word: &AtomicU32, count: u32) -> Result<u32, SyncError> {
        (**self).wake(word, count)
    }
}
