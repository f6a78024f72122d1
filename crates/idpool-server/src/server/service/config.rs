use idpool::{IdPool, MonotonicClock, SnowflakeSource, TokioExecutor};

/// Clock embedded into every Snowflake ID the server hands out.
pub type Clock = MonotonicClock;

/// The pool's ID source.
pub type Source = SnowflakeSource<Clock>;

/// The pool served by the HTTP handlers. Refills run on Tokio's blocking
/// pool.
pub type Pool = IdPool<Source, TokioExecutor>;
