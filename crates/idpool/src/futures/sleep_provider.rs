use core::time::Duration;

/// How an async caller waits between attempts on an empty standby buffer.
///
/// Implemented per runtime so [`IdPool::get_id_async`] stays
/// runtime-agnostic.
///
/// [`IdPool::get_id_async`]: crate::IdPool::get_id_async
pub trait SleepProvider {
    /// The wait future. It is awaited inside request handlers that may move
    /// between worker threads.
    type Sleep: Future<Output = ()> + Send;

    /// Returns a future that completes after roughly `dur`.
    fn sleep_for(dur: Duration) -> Self::Sleep;
}
