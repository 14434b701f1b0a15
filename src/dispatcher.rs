//! Behavior dispatcher.
//!
//! The dispatcher owns the robot handle. A synchronous behavior borrows it
//! on the calling thread. Walk gets it through a hand-off slot that the walk
//! thread locks for its whole run; the dispatcher reclaims the robot from
//! the slot only after join. Since the handle can only be in one place, two
//! behaviors can never command the actuators at the same time, and every
//! switch away from Walk goes through cancel then join before the next
//! behavior sees the robot.
//!
//! The slot outlives the walk thread, so the robot comes back even when
//! that thread panics or never starts.

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::actuators::Actuation;
use crate::behaviors::pushups::{self, PushupsExit};
use crate::behaviors::{run_steps, walk, BehaviorId};
use crate::clock::Clock;
use crate::error::BehaviorError;
use crate::keyboard::InputSource;
use crate::policy::PolicyLoader;
use crate::task::TaskHandle;

struct WalkTask<R> {
    task: TaskHandle<Result<u64, BehaviorError>>,
    robot: Arc<Mutex<R>>,
}

enum Control<R> {
    Idle(R),
    Walking(WalkTask<R>),
    /// The handle could not be reclaimed from the walk slot.
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Walking,
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// A synchronous behavior ran to completion.
    Completed,
    /// A background behavior was started and is still running.
    Started,
    /// The operator asked to quit while the behavior was running.
    QuitRequested,
}

pub struct Dispatcher<R> {
    control: Control<R>,
    loader: Box<dyn PolicyLoader>,
    clock: Arc<dyn Clock>,
    tick: Duration,
}

impl<R: Actuation + 'static> Dispatcher<R> {
    pub fn new(
        robot: R,
        loader: Box<dyn PolicyLoader>,
        clock: Arc<dyn Clock>,
        tick: Duration,
    ) -> Self {
        Self {
            control: Control::Idle(robot),
            loader,
            clock,
            tick,
        }
    }

    pub fn state(&self) -> DispatcherState {
        match self.control {
            Control::Idle(_) => DispatcherState::Idle,
            Control::Walking(_) => DispatcherState::Walking,
            Control::Unavailable => DispatcherState::Unavailable,
        }
    }

    /// The robot handle, when no background behavior holds it.
    pub fn robot(&self) -> Option<&R> {
        match &self.control {
            Control::Idle(robot) => Some(robot),
            _ => None,
        }
    }

    /// Stops whatever is running and starts `behavior`.
    ///
    /// Walk is started in the background and this returns immediately.
    /// Every other behavior runs to completion before this returns, and no
    /// input is serviced meanwhile except the stop key Pushups polls for.
    /// On error the dispatcher is left idle.
    pub fn select(
        &mut self,
        behavior: BehaviorId,
        input: &mut dyn InputSource,
    ) -> Result<Selection, BehaviorError> {
        info!("Selected {}", behavior);
        let mut robot = self.take_robot()?;

        let result = match behavior {
            BehaviorId::Walk => return self.start_walk(robot),
            BehaviorId::Pushups => {
                info!("Press 'x' to stop");
                pushups::run(&mut robot, &*self.clock, input).map(|exit| match exit {
                    PushupsExit::Stopped => Selection::Completed,
                    PushupsExit::Quit => Selection::QuitRequested,
                })
            }
            fixed => {
                let steps = fixed.steps(robot.registry()).unwrap_or_default();
                run_steps(&mut robot, &*self.clock, &steps)
                    .map(|()| Selection::Completed)
                    .map_err(BehaviorError::from)
            }
        };
        self.control = Control::Idle(robot);
        result
    }

    /// Joins the walk task if it has already stopped on its own, returning
    /// the error or panic that stopped it. The robot is idle afterwards.
    pub fn reap(&mut self) -> Result<(), BehaviorError> {
        match mem::replace(&mut self.control, Control::Unavailable) {
            Control::Walking(walk) if walk.task.is_finished() => {
                let outcome = walk.task.join();
                self.control = Control::Idle(reclaim(walk.robot)?);
                outcome
                    .and_then(|result| result)
                    .map(|ticks| info!("Walk ended by itself after {} ticks", ticks))
            }
            other => {
                self.control = other;
                Ok(())
            }
        }
    }

    /// Cancels and joins any background behavior, then disables the motors.
    /// Failures are logged, never returned.
    pub fn shutdown(&mut self) {
        let mut robot = match self.take_robot() {
            Ok(robot) => robot,
            Err(e) => {
                error!("Cannot disable motors: {}", e);
                return;
            }
        };
        match robot.disable_motors() {
            Ok(()) => info!("Motors disabled"),
            Err(e) => error!("Error disabling motors: {}", e),
        }
        self.control = Control::Idle(robot);
    }

    /// Takes the robot handle, cancelling and joining the walk task first if
    /// one holds it. The dispatcher is `Unavailable` until the handle is put
    /// back.
    fn take_robot(&mut self) -> Result<R, BehaviorError> {
        match mem::replace(&mut self.control, Control::Unavailable) {
            Control::Idle(robot) => Ok(robot),
            Control::Walking(mut walk) => {
                walk.task.cancel();
                match walk.task.join() {
                    Ok(Ok(ticks)) => info!("Walk stopped after {} ticks", ticks),
                    Ok(Err(e)) => warn!("Walk had already failed: {}", e),
                    Err(e) => error!("Walk ended abnormally: {}", e),
                }
                reclaim(walk.robot)
            }
            Control::Unavailable => Err(BehaviorError::RobotUnavailable),
        }
    }

    fn start_walk(&mut self, robot: R) -> Result<Selection, BehaviorError> {
        let mut policy = match self.loader.load() {
            Ok(policy) => policy,
            Err(e) => {
                self.control = Control::Idle(robot);
                return Err(e.into());
            }
        };

        let tick = self.tick;
        let slot = Arc::new(Mutex::new(robot));
        let walk_slot = Arc::clone(&slot);
        let spawned = TaskHandle::spawn("walk", move |token| {
            let mut robot = walk_slot.lock().unwrap_or_else(PoisonError::into_inner);
            walk::run_walk(&mut *robot, policy.as_mut(), tick, &token)
        });

        match spawned {
            Ok(task) => {
                self.control = Control::Walking(WalkTask { task, robot: slot });
                Ok(Selection::Started)
            }
            Err(e) => {
                self.control = Control::Idle(reclaim(slot)?);
                Err(e)
            }
        }
    }
}

/// Takes the robot back out of a walk slot whose thread has been joined or
/// never started. A panic on the walk thread poisons the lock but leaves
/// the robot in place.
fn reclaim<R>(slot: Arc<Mutex<R>>) -> Result<R, BehaviorError> {
    Arc::try_unwrap(slot)
        .map(|robot| robot.into_inner().unwrap_or_else(PoisonError::into_inner))
        .map_err(|_| BehaviorError::RobotUnavailable)
}
