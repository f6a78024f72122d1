use core::time::Duration;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Default epoch: Friday, January 1, 2021 00:00:00 UTC
pub const DEFAULT_EPOCH: Duration = Duration::from_millis(1_609_459_200_000);

/// A source of millisecond timestamps relative to some origin.
///
/// Lets [`SnowflakeSource`] run against the real [`MonotonicClock`] or a
/// mocked time source in tests.
///
/// # Example
///
/// ```
/// use idpool::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1234);
/// ```
///
/// [`SnowflakeSource`]: crate::SnowflakeSource
pub trait TimeSource: Send + Sync + 'static {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> u64;
}

/// Milliseconds since the clock started, published by the ticker thread.
#[derive(Debug)]
struct Ticker {
    elapsed_ms: AtomicU64,
    started: Instant,
    running: AtomicBool,
}

/// A monotonic time source anchored to a wall-clock epoch.
///
/// At construction the clock captures how far the wall clock is past `epoch`
/// and then only ever adds monotonic elapsed time to it, so NTP steps or
/// manual clock changes never move it backwards. A background thread bumps a
/// shared atomic once per millisecond, keeping syscalls off the hot path. The
/// thread exits once every clone of the clock has been dropped.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    ticker: Arc<Ticker>,
    epoch_offset: u64,
}

impl Default for MonotonicClock {
    /// Constructs a monotonic clock aligned to [`DEFAULT_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(DEFAULT_EPOCH)
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock whose zero point is `epoch`, given as a
    /// [`Duration`] since 1970-01-01 UTC.
    ///
    /// A wall clock that reads earlier than `epoch` starts the clock at zero.
    pub fn with_epoch(epoch: Duration) -> Self {
        let epoch_offset = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|now| now.checked_sub(epoch))
            .unwrap_or_default()
            .as_millis() as u64;

        let ticker = Arc::new(Ticker {
            elapsed_ms: AtomicU64::new(0),
            started: Instant::now(),
            running: AtomicBool::new(false),
        });
        spawn_ticker(&ticker);

        Self {
            ticker,
            epoch_offset,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        if self.ticker.running.load(Ordering::Acquire) {
            self.ticker.elapsed_ms.load(Ordering::Relaxed)
        } else {
            // Recorded so the first tick can never publish less than a
            // reader has already seen.
            let now_ms = self.ticker.started.elapsed().as_millis() as u64;
            let seen = self.ticker.elapsed_ms.fetch_max(now_ms, Ordering::Relaxed);
            seen.max(now_ms)
        }
    }
}

/// Starts the thread that keeps `ticker` current. It holds only a weak
/// reference and stops once the last clock clone is gone.
///
/// Until the first tick lands, or for good if the thread cannot be spawned,
/// the clock reads `Instant` directly.
fn spawn_ticker(ticker: &Arc<Ticker>) {
    let weak = Arc::downgrade(ticker);
    let started = ticker.started;

    let spawned = thread::Builder::new()
        .name("idpool-clock".into())
        .spawn(move || {
            let mut next_ms = 0;
            while let Some(ticker) = weak.upgrade() {
                let elapsed = started.elapsed();
                let wake_at = Duration::from_millis(next_ms);
                if elapsed < wake_at {
                    drop(ticker);
                    thread::sleep(wake_at - elapsed);
                    continue;
                }

                let now_ms = elapsed.as_millis() as u64;
                ticker.elapsed_ms.fetch_max(now_ms, Ordering::Relaxed);
                if !ticker.running.load(Ordering::Relaxed) {
                    ticker.running.store(true, Ordering::Release);
                }
                next_ms = ticker.elapsed_ms.load(Ordering::Relaxed) + 1;
            }
        });

    if let Err(_err) = spawned {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_err, "clock ticker thread not started, reading Instant directly");
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.epoch_offset + self.elapsed_ms()
    }
}
