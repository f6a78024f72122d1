use core::pin::Pin;

use tokio::runtime::{Handle, TryCurrentError};

use crate::{RefillExecutor, RefillTask, SleepProvider};

/// A [`SleepProvider`] backed by Tokio's timer.
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    type Sleep = tokio::time::Sleep;

    fn sleep_for(dur: core::time::Duration) -> Self::Sleep {
        tokio::time::sleep(dur)
    }
}

/// A [`SleepProvider`] that yields to the Tokio scheduler instead of sleeping.
///
/// A waiting caller re-checks the standby buffer on every poll, which picks
/// up a finished refill sooner at the cost of a busier loop. Under many
/// concurrent waiters [`TokioSleep`] usually does better.
pub struct TokioYield;
impl SleepProvider for TokioYield {
    /// `yield_now()` returns an unnameable future.
    type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn sleep_for(_dur: core::time::Duration) -> Self::Sleep {
        Box::pin(tokio::task::yield_now())
    }
}

/// A [`RefillExecutor`] that runs refills on Tokio's blocking thread pool.
///
/// Refill tasks call the ID source synchronously and sleep while it recovers,
/// so they go through [`Handle::spawn_blocking`] rather than onto the async
/// workers. If the runtime has shut down the task is dropped, which releases
/// the buffer's refill slot.
#[derive(Clone, Debug)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Uses the runtime behind `handle`.
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is currently running on.
    ///
    /// # Errors
    ///
    /// Fails when called outside of a Tokio runtime.
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl RefillExecutor for TokioExecutor {
    fn execute(&self, task: RefillTask) {
        drop(self.handle.spawn_blocking(task));
    }
}
