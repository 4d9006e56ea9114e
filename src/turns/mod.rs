//! # Taking turns
//!
//! 2 actors, 2 slots. Each slot is named after the actor it lets in:
//! the parent takes `turn(Parent)` and posts `turn(Child)`, the child does the opposite.
//!
//! ```text
//! parent: acquire(turn(Parent)) -> act -> release(turn(Child))
//! child:  acquire(turn(Child))  -> act -> release(turn(Parent))
//! ```
//!
//! Exactly one of the slots is available at a time, so exactly one actor can be acting.
//! Whoever's slot starts available goes first, then they strictly alternate.
//! There's no shutdown state, the loops just stop after N rounds.
//!
//! ## Teardown
//! If an actor hits a fatal error its peer may be asleep waiting for a post which will never come.
//! So the failing actor poisons the pair and pushes the peer's slot to available.
//! The peer wakes up, sees the poison and leaves with [SyncError::PeerFailed].

pub mod bootstrap;

use std::sync::atomic::{
    AtomicBool,
    Ordering::{Acquire, Release},
};

use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, error, info};

use crate::{error::SyncError, futex::Futex, slot::SlotFutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display)]
pub enum Actor {
    Parent,
    Child,
}

impl Actor {
    pub fn peer(self) -> Self {
        match self {
            Actor::Parent => Actor::Child,
            Actor::Child => Actor::Parent,
        }
    }
}

/// The shared state of the protocol: 2 slots and the futex backend they sleep on.
#[derive(Debug)]
pub struct TurnPair<F> {
    parent: SlotFutex,
    child: SlotFutex,
    poisoned: AtomicBool,
    futex: F,
}

impl<F: Futex> TurnPair<F> {
    /// `first` gets an available slot, the other one an unavailable
    pub fn new(first: Actor, futex: F) -> Self {
        Self {
            parent: SlotFutex::new(first == Actor::Parent),
            child: SlotFutex::new(first == Actor::Child),
            poisoned: AtomicBool::new(false),
            futex,
        }
    }

    /// The slot that lets `actor` in
    pub fn turn(&self, actor: Actor) -> &SlotFutex {
        match actor {
            Actor::Parent => &self.parent,
            Actor::Child => &self.child,
        }
    }

    pub fn futex(&self) -> &F {
        &self.futex
    }

    /// Blocks until it's `actor`'s turn
    pub fn wait_turn(&self, actor: Actor) -> Result<(), SyncError> {
        self.turn(actor).acquire(&self.futex)?;
        self.check_poison(actor)
    }

    /// Gives the turn to `actor`'s peer
    pub fn pass_turn(&self, actor: Actor) -> Result<(), SyncError> {
        self.check_poison(actor)?;
        self.turn(actor.peer()).release(&self.futex)
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Acquire)
    }

    /// Called by `failed` on its way out, so the peer doesn't sleep forever.
    pub fn abandon(&self, failed: Actor) {
        // the poison is published by the post's CAS below
        self.poisoned.store(true, Release);
        self.turn(failed.peer()).force_release(&self.futex);
    }

    fn check_poison(&self, actor: Actor) -> Result<(), SyncError> {
        if self.is_poisoned() {
            return Err(SyncError::PeerFailed(actor.peer()));
        }
        Ok(())
    }
}

/// Runs `iterations` rounds of wait -> act -> pass for a single actor.
///
/// The action receives the actor and the round number and runs while holding the turn.
/// Any error ends the loop, no retries here.
pub fn run_actor<F, A>(
    pair: &TurnPair<F>,
    actor: Actor,
    iterations: usize,
    mut action: A,
) -> Result<(), SyncError>
where
    F: Futex,
    A: FnMut(Actor, usize),
{
    info!(%actor, iterations, "actor started");
    for j in 0..iterations {
        let round = pair.wait_turn(actor).and_then(|()| {
            debug!(%actor, j, "got the turn");
            action(actor, j);
            pair.pass_turn(actor)
        });
        if let Err(e) = round {
            // no point to poison for someone who already knows
            if !matches!(e, SyncError::PeerFailed(_)) {
                error!(%actor, j, error = %e, "actor failed");
                pair.abandon(actor);
            }
            return Err(e);
        }
    }
    info!(%actor, "actor finished");
    Ok(())
}
