use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

const TICK: Duration = Duration::from_secs(1);

fn whole_seconds(remaining: Duration) -> u32 {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

/// A running auto-advance countdown.
///
/// `on_tick` receives the whole seconds left, once per second and once at
/// zero; returning `false` stops the countdown without firing. `on_expire`
/// runs at most once.
#[derive(Debug)]
pub(crate) struct Countdown {
    id: u64,
    task: JoinHandle<()>,
}

impl Countdown {
    pub(crate) fn spawn<T, E, Fut>(id: u64, duration: Duration, on_tick: T, on_expire: E) -> Self
    where
        T: Fn(u32) -> bool + Send + 'static,
        E: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut remaining = duration;
            loop {
                if !on_tick(whole_seconds(remaining)) {
                    return;
                }
                if remaining.is_zero() {
                    break;
                }
                let step = remaining.min(TICK);
                sleep(step).await;
                remaining -= step;
            }
            on_expire().await;
        });
        Self { id, task }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Stop the countdown; `on_expire` will not run if it has not started.
    pub(crate) fn cancel(self) {
        self.task.abort();
    }

    /// Forget the handle and let the task run to completion.
    pub(crate) fn detach(self) {}
}
