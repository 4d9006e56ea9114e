//! Starting and joining the 2 actors.
//!
//! The pair lives on the stack of [run] and the actors borrow it through scoped threads,
//! so it's reclaimed right after both of them are joined. No statics involved.

use std::thread::{self, Builder};

use strum::IntoEnumIterator;
use tracing::{debug, error};

use super::{run_actor, Actor, TurnPair};
use crate::{config::Config, error::SyncError, futex::Futex};

/// Poisons the pair if the actor's thread unwinds, e.g. the action panicked.
/// Otherwise the peer would wait for its turn forever and the scope would never join.
struct AbandonOnPanic<'a, F: Futex> {
    pair: &'a TurnPair<F>,
    actor: Actor,
}

impl<F: Futex> Drop for AbandonOnPanic<'_, F> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.pair.abandon(self.actor);
        }
    }
}

/// Runs both actors to completion with `action` as their shared action.
///
/// Returns the first real failure. A [SyncError::PeerFailed] is only reported
/// if there's nothing better, it's just a consequence of the other actor's failure.
pub fn run<F, A>(config: &Config, futex: F, action: A) -> Result<(), SyncError>
where
    F: Futex,
    A: Fn(Actor, usize) + Sync,
{
    let pair = TurnPair::new(config.first, futex);
    let pair = &pair;
    let action = &action;
    debug!(?config, "starting actors");

    let results = thread::scope(|s| {
        let mut handles = Vec::new();
        let mut results = Vec::new();

        for actor in Actor::iter() {
            let spawned = Builder::new()
                .name(actor.to_string().to_lowercase())
                .stack_size(config.stack_size)
                .spawn_scoped(s, move || {
                    let _guard = AbandonOnPanic { pair, actor };
                    run_actor(pair, actor, config.iterations, action)
                });
            match spawned {
                Ok(handle) => handles.push((actor, handle)),
                Err(source) => {
                    error!(%actor, error = %source, "failed to spawn");
                    // let the ones already running bail out
                    pair.abandon(actor);
                    results.push(Err(SyncError::Spawn { actor, source }));
                    break;
                }
            }
        }

        for (actor, handle) in handles {
            let r = handle.join().unwrap_or_else(|_| {
                error!(%actor, "actor panicked");
                Err(SyncError::Panicked(actor))
            });
            results.push(r);
        }
        results
    });

    let mut peer_failed = None;
    for r in results {
        match r {
            Ok(()) => {}
            Err(e @ SyncError::PeerFailed(_)) => peer_failed = Some(e),
            Err(e) => return Err(e),
        }
    }
    peer_failed.map_or(Ok(()), Err)
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering::SeqCst},
            Mutex,
        },
        time::{Duration, Instant},
    };

    use rstest::rstest;

    use super::*;
    use crate::futex::simulated::{CountingFutex, FailingFutex, LostWakeFutex};
    #[cfg(target_os = "linux")]
    use crate::futex::LinuxFutex;

    /// Enter / exit marks of every action, in the order they were taken
    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<(Actor, usize, Instant, Instant)>>,
        busy: AtomicBool,
        overlaps: AtomicBool,
    }

    impl Journal {
        fn record(&self, actor: Actor, j: usize) {
            if self.busy.swap(true, SeqCst) {
                self.overlaps.store(true, SeqCst);
            }
            let enter = Instant::now();
            // widen the window for an overlap to show up
            std::hint::spin_loop();
            let exit = Instant::now();
            self.busy.store(false, SeqCst);
            self.entries.lock().unwrap().push((actor, j, enter, exit));
        }

        fn check(self, first: Actor, iterations: usize) {
            assert!(!self.overlaps.load(SeqCst));
            let entries = self.entries.into_inner().unwrap();
            assert_eq!(entries.len(), 2 * iterations);

            let mut expected = first;
            for (i, (actor, j, _, _)) in entries.iter().enumerate() {
                assert_eq!(*actor, expected, "action #{i} is out of turn");
                assert_eq!(*j, i / 2);
                expected = expected.peer();
            }

            // every action exits before the next one enters
            for pair in entries.windows(2) {
                assert!(pair[0].3 <= pair[1].2);
            }
        }
    }

    fn config(first: Actor, iterations: usize) -> Config {
        Config {
            iterations,
            first,
            ..Config::default()
        }
    }

    #[cfg(target_os = "linux")]
    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    #[case(1000)]
    fn test_strict_alternation(#[case] iterations: usize) {
        let journal = Journal::default();
        run(
            &config(Actor::Parent, iterations),
            LinuxFutex::private(),
            |a, j| journal.record(a, j),
        )
        .unwrap();
        journal.check(Actor::Parent, iterations);
    }

    #[cfg(target_os = "linux")]
    #[rstest]
    #[case(Actor::Parent)]
    #[case(Actor::Child)]
    fn test_first_turn_follows_initial_state(#[case] first: Actor) {
        for _ in 0..20 {
            let journal = Journal::default();
            run(&config(first, 3), LinuxFutex::private(), |a, j| {
                journal.record(a, j)
            })
            .unwrap();
            journal.check(first, 3);
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_shared_scope() {
        let journal = Journal::default();
        run(&config(Actor::Child, 100), LinuxFutex::shared(), |a, j| {
            journal.record(a, j)
        })
        .unwrap();
        journal.check(Actor::Child, 100);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_one_wake_per_turn() {
        let futex = CountingFutex::new(LinuxFutex::private());
        run(&config(Actor::Parent, 50), &futex, |_, _| {}).unwrap();
        // every pass is exactly one wake, sleeping is up to the scheduler
        assert_eq!(futex.wakes(), 100);
    }

    #[rstest]
    #[case(Actor::Parent, 1)]
    #[case(Actor::Child, 1000)]
    fn test_lost_wakes(#[case] first: Actor, #[case] iterations: usize) {
        let journal = Journal::default();
        run(&config(first, iterations), LostWakeFutex, |a, j| {
            journal.record(a, j)
        })
        .unwrap();
        journal.check(first, iterations);
    }

    #[test]
    fn test_failed_wake_is_reported_and_nobody_hangs() {
        let start = Instant::now();
        let r = run(
            &config(Actor::Parent, 10),
            FailingFutex::failing_wake(),
            |_, _| {},
        );
        assert!(matches!(r, Err(SyncError::Wake(_))));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_panicking_action_is_reported() {
        let r = run(&config(Actor::Parent, 10), LostWakeFutex, |a, j| {
            if a == Actor::Child && j == 2 {
                panic!("boom");
            }
        });
        assert!(matches!(r, Err(SyncError::Panicked(Actor::Child))));
    }
}
