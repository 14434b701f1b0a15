use ::std::sync::atomic::{AtomicBool, Ordering};
use ::std::sync::Arc;
use ::std::thread::{self, JoinHandle};
use ::thread_priority::{set_current_thread_priority, ThreadPriority};
use tracing::{debug, info, warn};

use crate::error::BehaviorError;

/// Cooperative stop flag shared between the dispatcher and one task.
///
/// Only the owning [`TaskHandle`] sets it; the task only reads it.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Running,
    CancelRequested,
    Joined,
}

/// A background behavior running on its own thread.
pub struct TaskHandle<T> {
    name: String,
    token: CancellationToken,
    state: TaskState,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> TaskHandle<T> {
    /// Spawns `task` on a new named thread with a raised priority.
    pub fn spawn<F>(name: &str, task: F) -> Result<Self, BehaviorError>
    where
        F: FnOnce(CancellationToken) -> T + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if let Err(e) = set_current_thread_priority(ThreadPriority::Max) {
                    debug!("Could not raise priority of {} thread: {:?}", thread_name, e);
                }
                task(task_token)
            })
            .map_err(|source| BehaviorError::Spawn {
                name: name.to_string(),
                source,
            })?;

        info!("Started {} task", name);
        Ok(Self {
            name: name.to_string(),
            token,
            state: TaskState::Running,
            handle,
        })
    }
}

impl<T> TaskHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// True once the task body has returned, whether or not it was asked to.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Requests cancellation. Only the first call has an effect.
    pub fn cancel(&mut self) {
        if self.state == TaskState::Running {
            debug!("Requesting cancellation of {} task", self.name);
            self.token.cancel();
            self.state = TaskState::CancelRequested;
        }
    }

    /// Blocks until the task returns.
    pub fn join(mut self) -> Result<T, BehaviorError> {
        let result = self.handle.join();
        self.state = TaskState::Joined;
        debug!("{} task state: {:?}", self.name, self.state);
        result.map_err(|_| {
            warn!("{} task panicked", self.name);
            BehaviorError::TaskPanicked(self.name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_observed_and_join_returns_value() {
        let mut task = TaskHandle::spawn("counter", |token| {
            let mut ticks = 0u32;
            loop {
                ticks += 1;
                if token.is_cancelled() {
                    break ticks;
                }
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();

        assert_eq!(task.state(), TaskState::Running);
        thread::sleep(Duration::from_millis(10));
        task.cancel();
        assert_eq!(task.state(), TaskState::CancelRequested);
        task.cancel();
        assert_eq!(task.state(), TaskState::CancelRequested);

        let ticks = task.join().unwrap();
        assert!(ticks > 0);
    }

    #[test]
    fn task_that_fails_still_joins() {
        let task = TaskHandle::spawn("failing", |_| -> Result<(), String> {
            Err("bus fault".to_string())
        })
        .unwrap();
        while !task.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(task.join().unwrap(), Err("bus fault".to_string()));
    }

    #[test]
    fn panicking_task_is_reported() {
        let task = TaskHandle::spawn("panicking", |_| -> u8 { panic!("boom") }).unwrap();
        assert!(matches!(
            task.join(),
            Err(BehaviorError::TaskPanicked(name)) if name == "panicking"
        ));
    }

    #[test]
    fn thread_carries_task_name() {
        let task = TaskHandle::spawn("walk", |_| thread::current().name().map(str::to_string))
            .unwrap();
        assert_eq!(task.name(), "walk");
        assert_eq!(task.join().unwrap().as_deref(), Some("walk"));
    }
}
