use core::fmt;

/// The capability that mints one unique ID per call.
///
/// An [`IdPool`] only calls this from its fill routines: sequentially while
/// it is being built, and afterwards from at most two concurrent refill tasks
/// (one per buffer). Implementations must therefore be safe to share across
/// threads, but the pool imposes no other synchronization requirement.
///
/// Every error is treated as transient. The pool logs it with [`Debug`],
/// backs off and calls again; it never inspects the error's content.
///
/// Closures returning `Result<u64, E>` implement this trait, which is handy
/// for tests and adapters:
///
/// ```
/// use idpool::IdSource;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let counter = AtomicU64::new(0);
/// let source = move || Ok::<_, ()>(counter.fetch_add(1, Ordering::Relaxed));
/// assert_eq!(source.next_id(), Ok(0));
/// assert_eq!(source.next_id(), Ok(1));
/// ```
///
/// [`IdPool`]: crate::IdPool
pub trait IdSource: Send + Sync + 'static {
    /// The error returned when an ID could not be produced right now.
    type Err: fmt::Debug + Send;

    /// Produces the next unique ID.
    ///
    /// # Errors
    ///
    /// Any error is considered retryable by the caller.
    fn next_id(&self) -> Result<u64, Self::Err>;
}

impl<F, E> IdSource for F
where
    F: Fn() -> Result<u64, E> + Send + Sync + 'static,
    E: fmt::Debug + Send,
{
    type Err = E;

    fn next_id(&self) -> Result<u64, Self::Err> {
        self()
    }
}
