use std::{io, time::Duration};

use thiserror::Error;

use crate::turns::Actor;

/// Everything that can go wrong while taking turns.
///
/// The retryable outcomes of a futex wait (value changed, spurious wake) never show up here,
/// see [`WaitOutcome`](crate::futex::WaitOutcome). Whatever lands here ends the protocol.
#[derive(Debug, Error)]
pub enum SyncError {
    /// FUTEX_WAIT failed with something other than EAGAIN / EINTR
    #[error("futex-FUTEX_WAIT: {0}")]
    Wait(#[source] io::Error),

    /// FUTEX_WAKE failed
    #[error("futex-FUTEX_WAKE: {0}")]
    Wake(#[source] io::Error),

    /// the slot didn't become available in time
    #[error("slot was not posted within {0:?}")]
    TimedOut(Duration),

    /// post on a slot that is already available => someone broke the alternation
    #[error("double post: slot is already available")]
    DoublePost,

    /// the other actor died and poisoned the pair
    #[error("{0} actor failed, turn abandoned")]
    PeerFailed(Actor),

    #[error("failed to spawn the {actor} thread: {source}")]
    Spawn {
        actor: Actor,
        #[source]
        source: io::Error,
    },

    #[error("the {0} thread panicked")]
    Panicked(Actor),

    #[error("invalid loop count {0:?}, expected a non-negative integer")]
    InvalidIterations(String),
}
