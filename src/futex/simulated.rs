//! In-process stand-ins for the kernel.
//!
//! They're handy to prove that slots never rely on a wake being delivered:
//! the word is the only source of truth, wait & wake are there to save cycles.

use std::{
    io,
    sync::atomic::{AtomicU32, AtomicUsize, Ordering::Relaxed},
    thread,
    time::Duration,
};

use super::{Futex, WaitOutcome};
use crate::error::SyncError;

/// Drops every notification on the floor.
///
/// `wake` reports 0 woken and does nothing, `wait` never sleeps and comes back as a spurious wake.
/// A slot on top of it degrades to a yielding spin loop, but must stay correct.
#[derive(Debug, Default)]
pub struct LostWakeFutex;

impl Futex for LostWakeFutex {
    fn wait(
        &self,
        word: &AtomicU32,
        expected: u32,
        _timeout: Option<Duration>,
    ) -> Result<WaitOutcome, SyncError> {
        if word.load(Relaxed) != expected {
            return Ok(WaitOutcome::ValueChanged);
        }
        thread::yield_now();
        Ok(WaitOutcome::Spurious)
    }

    fn wake(&self, _word: &AtomicU32, _count: u32) -> Result<u32, SyncError> {
        Ok(0)
    }
}

/// Counts the trips to the "kernel" and passes them on.
#[derive(Debug, Default)]
pub struct CountingFutex<F> {
    inner: F,
    waits: AtomicUsize,
    wakes: AtomicUsize,
}

impl<F> CountingFutex<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            waits: AtomicUsize::new(0),
            wakes: AtomicUsize::new(0),
        }
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Relaxed)
    }

    pub fn wakes(&self) -> usize {
        self.wakes.load(Relaxed)
    }
}

impl<F: Futex> Futex for CountingFutex<F> {
    fn wait(
        &self,
        word: &AtomicU32,
        expected: u32,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, SyncError> {
        self.waits.fetch_add(1, Relaxed);
        self.inner.wait(word, expected, timeout)
    }

    fn wake(&self, word: &AtomicU32, count: u32) -> Result<u32, SyncError> {
        self.wakes.fetch_add(1, Relaxed);
        self.inner.wake(word, count)
    }
}

/// A broken kernel: every wait and/or every wake fails with EINVAL.
/// Whatever isn't broken behaves like [LostWakeFutex].
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingFutex {
    pub fail_wait: bool,
    pub fail_wake: bool,
}

impl FailingFutex {
    pub fn failing_wait() -> Self {
        Self {
            fail_wait: true,
            fail_wake: false,
        }
    }

    pub fn failing_wake() -> Self {
        Self {
            fail_wait: false,
            fail_wake: true,
        }
    }

    fn einval() -> io::Error {
        io::Error::from_raw_os_error(libc::EINVAL)
    }
}

impl Futex for FailingFutex {
    fn wait(
        &self,
        word: &AtomicU32,
        expected: u32,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, SyncError> {
        if self.fail_wait {
            return Err(SyncError::Wait(Self::einval()));
        }
        LostWakeFutex.wait(word, expected, timeout)
    }

    fn wake(&self, word: &AtomicU32, count: u32) -> Result<u32, SyncError> {
        if self.fail_wake {
            return Err(SyncError::Wake(Self::einval()));
        }
        LostWakeFutex.wake(word, count)
    }
}
