// tests/property/main.rs

use std::time::{Duration, Instant};

use proptest::prelude::*;
use replit::engine::{CoreCommand, RunOutcome, SchedulerCore, SchedulerEvent, SlotState};
use replit::types::ChangeOrigin;

/// Abstract inputs; the harness turns them into concrete events.
#[derive(Debug, Clone)]
enum Op {
    /// Advance the clock by this many milliseconds, then deliver a change.
    Change(u64, bool),
    Kill,
    /// Let the active process exit on its own.
    Exit(u64),
    /// Report the active process as reaped after a kill.
    Reaped,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..3000u64, any::<bool>()).prop_map(|(ms, manual)| Op::Change(ms, manual)),
        1 => Just(Op::Kill),
        3 => (1..500u64).prop_map(Op::Exit),
        2 => Just(Op::Reaped),
    ]
}

/// Simulated "OS": which run ids currently own a live process.
#[derive(Debug, Default)]
struct World {
    live: Vec<u64>,
    completed: u64,
}

impl World {
    fn apply(&mut self, commands: &[CoreCommand]) {
        for command in commands {
            if let CoreCommand::StartRun(id) = command {
                self.live.push(*id);
            }
        }
    }
}

proptest! {
    #[test]
    fn single_flight_and_exact_statistics(
        ops in proptest::collection::vec(op_strategy(), 1..200),
        stale_ms in 1..3000u64,
    ) {
        let mut core = SchedulerCore::new(Duration::from_millis(stale_ms));
        let mut world = World::default();
        let mut now = Instant::now();
        let mut last_count = 0;

        for op in ops {
            let event = match op {
                Op::Change(ms, manual) => {
                    now += Duration::from_millis(ms);
                    SchedulerEvent::ChangeDetected {
                        origin: if manual { ChangeOrigin::Manual } else { ChangeOrigin::Watcher },
                        at: now,
                    }
                }
                Op::Kill => SchedulerEvent::KillRequested,
                Op::Exit(ms) => {
                    let SlotState::Running { run_id, .. } = core.state() else {
                        continue;
                    };
                    now += Duration::from_millis(ms);
                    world.live.retain(|id| *id != run_id);
                    world.completed += 1;
                    SchedulerEvent::RunEnded {
                        run_id,
                        outcome: RunOutcome::Exited {
                            duration: Duration::from_millis(ms),
                            exit_code: Some(0),
                        },
                        at: now,
                    }
                }
                Op::Reaped => {
                    let SlotState::Killing { run_id, .. } = core.state() else {
                        continue;
                    };
                    world.live.retain(|id| *id != run_id);
                    SchedulerEvent::RunEnded {
                        run_id,
                        outcome: RunOutcome::Killed,
                        at: now,
                    }
                }
            };

            let step = core.step(event);
            world.apply(&step.commands);

            prop_assert!(world.live.len() <= 1, "two processes alive: {:?}", world.live);
            prop_assert!(core.stats().count >= last_count, "count decreased");
            prop_assert_eq!(core.stats().count, world.completed);
            if core.is_idle() {
                prop_assert!(world.live.is_empty());
            }
            last_count = core.stats().count;
        }
    }

    #[test]
    fn every_burst_of_changes_ends_in_at_most_one_pending_run(
        burst in 1..50usize,
        gap_ms in 0..100u64,
    ) {
        let mut core = SchedulerCore::new(Duration::from_secs(3600));
        let mut now = Instant::now();
        let mut starts = 0;

        for _ in 0..burst {
            now += Duration::from_millis(gap_ms);
            let step = core.step(SchedulerEvent::ChangeDetected { origin: ChangeOrigin::Watcher, at: now });
            starts += step.commands.iter().filter(|c| matches!(c, CoreCommand::StartRun(_))).count();
        }
        prop_assert_eq!(starts, 1);

        let step = core.step(SchedulerEvent::RunEnded {
            run_id: 1,
            outcome: RunOutcome::Exited { duration: Duration::from_millis(1), exit_code: Some(0) },
            at: now,
        });
        let restarted = step.commands.iter().filter(|c| matches!(c, CoreCommand::StartRun(_))).count();
        prop_assert_eq!(restarted, usize::from(burst > 1));
    }
}
