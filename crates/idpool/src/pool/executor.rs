use std::thread;

/// A unit of background refill work handed to a [`RefillExecutor`].
pub type RefillTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs fire-and-forget refill tasks on behalf of an [`IdPool`].
///
/// The pool never submits more than one task per buffer at a time, so an
/// executor sees at most two live tasks. A task that is dropped without being
/// run (for example because a thread could not be spawned) releases its
/// buffer's refill slot, and a later request will try again.
///
/// [`IdPool`]: crate::IdPool
pub trait RefillExecutor: Send + Sync + 'static {
    /// Starts `task` without waiting for it to finish.
    fn execute(&self, task: RefillTask);
}

/// Runs every refill on a fresh, named OS thread.
///
/// This is the default executor. Refill tasks call the ID source and may
/// sleep while it recovers, so they belong on their own thread rather than on
/// a caller's.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadExecutor;

impl RefillExecutor for ThreadExecutor {
    fn execute(&self, task: RefillTask) {
        let spawned = thread::Builder::new()
            .name("idpool-refill".to_string())
            .spawn(task);

        if let Err(_e) = spawned {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %_e, "failed to spawn refill thread");
        }
    }
}
