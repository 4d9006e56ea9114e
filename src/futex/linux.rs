//! # The real thing
//!
//! `futex(2)` has no glibc wrapper, so it goes through `libc::syscall` directly.
//! Refer to the man page for the full signature:
//! `futex(uaddr, futex_op, val, timeout, uaddr2, val3)`.
//! Only the first 4 arguments matter for WAIT and WAKE.

use std::{io, ptr, sync::atomic::AtomicU32, time::Duration};

use tracing::trace;

use super::{Futex, WaitOutcome};
use crate::error::SyncError;

/// Who can see the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// the word is only used from one address space => `FUTEX_*_PRIVATE`, a bit cheaper for the kernel
    #[default]
    Private,
    /// the word may live in memory mapped into several processes
    Shared,
}

impl Scope {
    fn flag(self) -> libc::c_int {
        match self {
            Scope::Private => libc::FUTEX_PRIVATE_FLAG,
            Scope::Shared => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxFutex {
    scope: Scope,
}

impl LinuxFutex {
    pub const fn new(scope: Scope) -> Self {
        Self { scope }
    }

    pub const fn private() -> Self {
        Self::new(Scope::Private)
    }

    pub const fn shared() -> Self {
        Self::new(Scope::Shared)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }
}

impl Futex for LinuxFutex {
    fn wait(
        &self,
        word: &AtomicU32,
        expected: u32,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, SyncError> {
        // FUTEX_WAIT takes a relative timeout, null means forever.
        // Seconds which don't fit time_t are as good as forever too.
        let ts = timeout.and_then(|t| {
            libc::time_t::try_from(t.as_secs())
                .ok()
                .map(|tv_sec| libc::timespec {
                    tv_sec,
                    tv_nsec: t.subsec_nanos() as libc::c_long,
                })
        });
        let ts_ptr = ts
            .as_ref()
            .map_or(ptr::null(), |t| t as *const libc::timespec);

        trace!(expected, ?timeout, "FUTEX_WAIT");
        // SAFETY: the word is a live, aligned AtomicU32 for the whole call, the kernel only reads it
        let r = unsafe {
            libc::syscall(
                libc::SYS_futex,
                word as *const AtomicU32,
                libc::FUTEX_WAIT | self.scope.flag(),
                expected,
                ts_ptr,
            )
        };
        if r == 0 {
            return Ok(WaitOutcome::Woken);
        }

        let e = io::Error::last_os_error();
        match e.raw_os_error() {
            Some(libc::EAGAIN) => Ok(WaitOutcome::ValueChanged),
            Some(libc::EINTR) => Ok(WaitOutcome::Spurious),
            Some(libc::ETIMEDOUT) => Err(SyncError::TimedOut(timeout.unwrap_or_default())),
            _ => Err(SyncError::Wait(e)),
        }
    }

    fn wake(&self, word: &AtomicU32, count: u32) -> Result<u32, SyncError> {
        // the kernel reads the count as an int
        let count = count.min(i32::MAX as u32) as libc::c_int;
        // SAFETY: same as for wait, the kernel doesn't even look at the value here
        let r = unsafe {
            libc::syscall(
                libc::SYS_futex,
                word as *const AtomicU32,
                libc::FUTEX_WAKE | self.scope.flag(),
                count,
            )
        };
        if r < 0 {
            return Err(SyncError::Wake(io::Error::last_os_error()));
        }
        trace!(woken = r, "FUTEX_WAKE");
        Ok(r as u32)
    }
}
