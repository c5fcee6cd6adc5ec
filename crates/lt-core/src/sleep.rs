//! Timed suspension used by the retry and poll delays.

use std::future::Future;
use std::time::Duration;

/// Something that can suspend the current task for a duration.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Wall-clock sleeper backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
