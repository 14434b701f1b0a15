//! Operator session: the keyboard event loop around a [`Dispatcher`].

use std::time::Duration;

use tracing::{debug, error, info};

use crate::actuators::Actuation;
use crate::behaviors::BehaviorId;
use crate::dispatcher::{Dispatcher, Selection};
use crate::error::BehaviorError;
use crate::keyboard::{Action, InputSource, Keymap};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Owns the dispatcher and the input source for one run of the program.
///
/// Shutdown happens exactly once, either through [`Session::shutdown`] or
/// when the session is dropped. After shutdown the input source has been
/// released and [`Session::run`] returns immediately.
pub struct Session<R: Actuation + 'static, I: InputSource> {
    dispatcher: Dispatcher<R>,
    input: Option<I>,
    finished: bool,
}

impl<R: Actuation + 'static, I: InputSource> Session<R, I> {
    pub fn new(dispatcher: Dispatcher<R>, input: I) -> Self {
        Self {
            dispatcher,
            input: Some(input),
            finished: false,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<R> {
        &self.dispatcher
    }

    /// Puts the robot in the neutral stance.
    pub fn start(&mut self) -> Result<(), BehaviorError> {
        let Some(input) = self.input.as_mut() else {
            return Ok(());
        };
        info!("Starting session");
        match self.dispatcher.select(BehaviorId::Stand, input) {
            Ok(_) => Ok(()),
            Err(e) => recover(e),
        }
    }

    /// Services key presses until the operator quits.
    ///
    /// A behavior that fails is reported and the loop keeps going. Errors
    /// that leave no robot to command, or no input to read, end the loop.
    pub fn run(&mut self) -> Result<(), BehaviorError> {
        let Some(input) = self.input.as_mut() else {
            return Ok(());
        };
        loop {
            if let Err(e) = self.dispatcher.reap() {
                recover(e)?;
            }

            let Some(event) = input.poll(POLL_INTERVAL)? else {
                continue;
            };
            match Keymap::action(event) {
                None => debug!("session::unbound {:?}", event),
                Some(Action::Quit) => {
                    info!("Quit requested");
                    return Ok(());
                }
                Some(Action::Select(behavior)) => {
                    match self.dispatcher.select(behavior, &mut *input) {
                        Ok(Selection::QuitRequested) => {
                            info!("Quit requested during {}", behavior);
                            return Ok(());
                        }
                        Ok(_) => {}
                        Err(e) => recover(e)?,
                    }
                }
            }
        }
    }

    /// Stops any running behavior, disables the motors, then releases the
    /// input source. Later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        info!("Shutting down session");
        self.dispatcher.shutdown();
        drop(self.input.take());
        info!("Input released");
    }
}

impl<R: Actuation + 'static, I: InputSource> Drop for Session<R, I> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Reports a behavior failure, or returns it when the session cannot go on.
/// A crashed or unspawnable walk task still hands the robot back, so only
/// a lost robot or a dead input source is fatal.
fn recover(e: BehaviorError) -> Result<(), BehaviorError> {
    match e {
        BehaviorError::RobotUnavailable | BehaviorError::Input(_) => Err(e),
        e => {
            error!("Behavior failed: {}", e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::dispatcher::DispatcherState;
    use crate::error::PolicyLoadError;
    use crate::keyboard::{InputEvent, Key};
    use crate::policy::PolicyEvaluator;
    use crate::pose::Pose;
    use crate::sim::{Command, Journal, SimulatedRobot};
    use crate::testing::{FixedPolicy, FnLoader, ManualClock, PanickingPolicy, ScriptedInput};

    fn key(c: char) -> Option<InputEvent> {
        Some(InputEvent::KeyDown(Key::Char(c)))
    }

    fn session(
        robot: SimulatedRobot,
        script: Vec<Option<InputEvent>>,
    ) -> Session<SimulatedRobot, ScriptedInput> {
        let loader = Box::new(FnLoader(|| {
            Ok(Box::new(FixedPolicy::legs(2.0)) as Box<dyn PolicyEvaluator>)
        }));
        let dispatcher = Dispatcher::new(
            robot,
            loader,
            Arc::new(ManualClock::new()),
            Duration::from_millis(1),
        );
        Session::new(dispatcher, ScriptedInput::new(script))
    }

    fn disables(journal: &Journal) -> usize {
        journal
            .entries()
            .iter()
            .filter(|e| e.command == Command::Disable)
            .count()
    }

    #[test]
    fn start_stands_the_robot() {
        let journal = Journal::new();
        let mut session = session(SimulatedRobot::new().with_journal(journal.clone()), vec![]);
        session.start().unwrap();
        assert_eq!(journal.poses(), vec![Pose::neutral()]);
    }

    #[test]
    fn walk_then_stand_then_quit() {
        let journal = Journal::new();
        let robot = SimulatedRobot::new().with_journal(journal.clone());
        let mut session = session(
            robot,
            vec![key('w'), None, Some(InputEvent::KeyDown(Key::Space)), None],
        );

        session.run().unwrap();
        assert_eq!(session.dispatcher().state(), DispatcherState::Idle);
        assert_eq!(journal.poses().last(), Some(&Pose::neutral()));

        session.shutdown();
        session.shutdown();
        assert!(session.run().is_ok());
        drop(session);
        assert_eq!(disables(&journal), 1);
    }

    #[test]
    fn drop_shuts_down_a_walking_robot() {
        let journal = Journal::new();
        let robot = SimulatedRobot::new().with_journal(journal.clone());
        let mut session = session(robot, vec![key('w'), Some(InputEvent::Quit)]);
        session.run().unwrap();
        assert_eq!(session.dispatcher().state(), DispatcherState::Walking);

        drop(session);
        let entries = journal.entries();
        assert_eq!(disables(&journal), 1);
        assert_eq!(entries.last().unwrap().command, Command::Disable);
    }

    #[test]
    fn failed_behavior_does_not_end_the_session() {
        let journal = Journal::new();
        let mut robot = SimulatedRobot::new().with_journal(journal.clone());
        robot.inject_fault_at(1);
        let mut session = session(
            robot,
            vec![
                key('1'),
                key('z'),
                Some(InputEvent::KeyDown(Key::Space)),
                Some(InputEvent::KeyDown(Key::Escape)),
            ],
        );

        session.run().unwrap();
        assert_eq!(journal.poses(), vec![Pose::neutral()]);
    }

    #[test]
    fn policy_load_failure_is_reported_not_fatal() {
        let loader = Box::new(FnLoader(|| {
            Err(PolicyLoadError::NotFound("missing.onnx".into()))
        }));
        let dispatcher = Dispatcher::new(
            SimulatedRobot::new(),
            loader,
            Arc::new(ManualClock::new()),
            Duration::from_millis(1),
        );
        let mut session = Session::new(
            dispatcher,
            ScriptedInput::new(vec![key('w'), key('q')]),
        );
        session.run().unwrap();
        assert_eq!(session.dispatcher().state(), DispatcherState::Idle);
        assert!(!session.dispatcher().robot().unwrap().commanded_positions().is_empty());
    }

    #[test]
    fn quitting_from_pushups_ends_the_session() {
        let journal = Journal::new();
        let robot = SimulatedRobot::new().with_journal(journal.clone());
        // The final Quit is consumed by pushups, not by the event loop.
        let mut session = session(robot, vec![key('4'), None]);
        session.run().unwrap();
        assert_eq!(session.dispatcher().state(), DispatcherState::Idle);
        assert_eq!(disables(&journal), 0);
    }

    #[test]
    fn walk_panic_is_survivable_and_motors_are_disabled() {
        let journal = Journal::new();
        let loader = Box::new(FnLoader(|| {
            Ok(Box::new(PanickingPolicy::after(0)) as Box<dyn PolicyEvaluator>)
        }));
        let dispatcher = Dispatcher::new(
            SimulatedRobot::new().with_journal(journal.clone()),
            loader,
            Arc::new(ManualClock::new()),
            Duration::from_millis(1),
        );
        let mut session = Session::new(
            dispatcher,
            ScriptedInput::new(vec![key('w'), Some(InputEvent::KeyDown(Key::Space))]),
        );

        session.run().unwrap();
        assert_eq!(session.dispatcher().state(), DispatcherState::Idle);
        assert_eq!(journal.poses(), vec![Pose::neutral()]);

        drop(session);
        assert_eq!(journal.entries().last().unwrap().command, Command::Disable);
    }
}
