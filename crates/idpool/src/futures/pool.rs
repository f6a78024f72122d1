use crate::{IdPool, IdSource, RefillExecutor, SleepProvider};

impl<S, E> IdPool<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    /// Async counterpart of [`IdPool::get_id`].
    ///
    /// Runs the same switch-and-refill algorithm, but waits on an empty
    /// standby buffer with `P`'s sleep so the calling task yields its worker
    /// thread instead of blocking it.
    ///
    /// Like [`IdPool::get_id`], this never fails and waits forever if the
    /// source never recovers. Wrap it in a runtime timeout to bound the wait.
    ///
    /// # Example
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use idpool::{IdPool, TokioSleep};
    /// use std::sync::atomic::{AtomicU64, Ordering};
    ///
    /// let next = AtomicU64::new(1);
    /// let pool = IdPool::new(8, move || Ok::<_, ()>(next.fetch_add(1, Ordering::Relaxed))).unwrap();
    /// assert_eq!(pool.get_id_async::<TokioSleep>().await, 1);
    /// # }
    /// ```
    pub async fn get_id_async<P>(&self) -> u64
    where
        P: SleepProvider,
    {
        let standby = match self.try_take_active() {
            Ok(id) => return id,
            Err(standby) => standby,
        };

        loop {
            if let Some(id) = self.try_take_standby(standby) {
                return id;
            }
            P::sleep_for(self.wait_interval()).await;
        }
    }

    /// Async counterpart of [`IdPool::get_ids`]: `count` sequential
    /// [`Self::get_id_async`] calls, in call order.
    pub async fn get_ids_async<P>(&self, count: usize) -> Vec<u64>
    where
        P: SleepProvider,
    {
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.get_id_async::<P>().await);
        }
        ids
    }
}
