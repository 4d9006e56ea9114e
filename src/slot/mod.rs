//! # Slot futex
//!
//! A one-shot binary handoff: a u32 which is either [AVAILABLE] or [UNAVAILABLE].
//! It's almost the Mutex from the locks chapter without the data and without the guard:
//! the one who takes the slot is never the one who gives it back.
//!
//! - [SlotFutex::acquire] flips 1 -> 0, sleeping in the kernel while the word is 0
//! - [SlotFutex::release] flips 0 -> 1 and wakes a single sleeper
//!
//! Both go through compare_exchange only. Nothing ever stores into the word after [SlotFutex::new].
//!
//! ## Avoiding syscalls
//! If the peer already posted, acquire is a single successful CAS => no kernel at all.
//! The kernel is only entered when we really have to sleep.
//!
//! ## Lost wake-ups
//! The word is the truth, the wake is a hint. Acquire re-checks the word after every return from wait,
//! be it a real wake-up, a stale value or a spurious one. So a dropped wake costs time, not correctness.
//! Asking the kernel to sleep only while the word is still 0 closes the gap between our failed CAS and the wait:
//! if the peer posts in-between, the kernel returns EAGAIN instead of sleeping.
//!
//! ## Memory ordering
//! Release on a successful post and Acquire on a successful take make everything the poster did
//! before posting happen-before everything the taker does after taking. That's what makes the actions
//! of 2 actors visible to each other in order. Failed CAS-es don't publish anything => Relaxed.

use std::{
    fmt,
    sync::atomic::{
        AtomicU32,
        Ordering::{AcqRel, Acquire, Relaxed, Release},
    },
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::{error::SyncError, futex::Futex};

pub const UNAVAILABLE: u32 = 0;
pub const AVAILABLE: u32 = 1;

pub struct SlotFutex {
    word: AtomicU32,
}

impl SlotFutex {
    pub const fn new(available: bool) -> Self {
        Self {
            word: AtomicU32::new(if available { AVAILABLE } else { UNAVAILABLE }),
        }
    }

    pub const fn available() -> Self {
        Self::new(true)
    }

    pub const fn unavailable() -> Self {
        Self::new(false)
    }

    /// A snapshot, it can be outdated by the time you look at it
    pub fn is_available(&self) -> bool {
        self.word.load(Relaxed) == AVAILABLE
    }

    /// The fast path alone: take the slot if it's there, never block
    pub fn try_acquire(&self) -> bool {
        self.word
            .compare_exchange(AVAILABLE, UNAVAILABLE, Acquire, Relaxed)
            .is_ok()
    }

    /// Blocks until the slot is ours.
    pub fn acquire(&self, futex: &impl Futex) -> Result<(), SyncError> {
        self.acquire_until(futex, None)
    }

    /// Same as [SlotFutex::acquire], but gives up after `timeout`.
    /// A timeout too far away to be represented as an [Instant] means no timeout.
    pub fn acquire_timeout(&self, futex: &impl Futex, timeout: Duration) -> Result<(), SyncError> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .map(|at| (at, timeout));
        self.acquire_until(futex, deadline)
    }

    fn acquire_until(
        &self,
        futex: &impl Futex,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<(), SyncError> {
        while !self.try_acquire() {
            let remaining = match deadline {
                Some((at, timeout)) => {
                    let left = at.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Err(SyncError::TimedOut(timeout));
                    }
                    Some(left)
                }
                None => None,
            };
            // sleep only while it's still unavailable, then look again whatever woke us up
            match futex.wait(&self.word, UNAVAILABLE, remaining) {
                Ok(outcome) => debug!(?outcome, "slot wait returned"),
                Err(SyncError::TimedOut(_)) => {
                    // report the caller's timeout, not the leftover
                    if let Some((_, timeout)) = deadline {
                        return Err(SyncError::TimedOut(timeout));
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Hands the slot over and wakes at most one waiter.
    ///
    /// Posting an already available slot means the caller didn't hold the claim to post it.
    /// That's rejected with [SyncError::DoublePost] and the word stays as it is.
    pub fn release(&self, futex: &impl Futex) -> Result<(), SyncError> {
        if self
            .word
            .compare_exchange(UNAVAILABLE, AVAILABLE, Release, Relaxed)
            .is_err()
        {
            warn!("double post on an available slot");
            return Err(SyncError::DoublePost);
        }
        let woken = futex.wake(&self.word, 1)?;
        debug!(woken, "slot posted");
        Ok(())
    }

    /// Teardown-only post: makes the slot available no matter who holds the claim
    /// and ignores a failing wake, the caller is already on its way out.
    ///
    /// The word is written even if it's already available, so whatever the caller stored
    /// before this call is visible to the next taker.
    pub(crate) fn force_release(&self, futex: &impl Futex) {
        let mut current = self.word.load(Relaxed);
        while let Err(v) = self
            .word
            .compare_exchange_weak(current, AVAILABLE, AcqRel, Relaxed)
        {
            current = v;
        }
        if let Err(e) = futex.wake(&self.word, u32::MAX) {
            warn!(error = %e, "wake during teardown failed");
        }
    }
}

impl fmt::Debug for SlotFutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotFutex")
            .field("available", &self.is_available())
            .finish()
    }
}
