use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Wrap `callback` so it runs at most once per `period`.
///
/// Leading edge only: the first value in a window is delivered, the rest of the
/// window is dropped. Meant for status text that updates far faster than a
/// person can read it.
pub fn throttle<T, F>(period: Duration, callback: F) -> impl Fn(&T) + Send + Sync
where
    F: Fn(&T) + Send + Sync,
{
    let last: Mutex<Option<Instant>> = Mutex::new(None);
    move |value: &T| {
        let now = Instant::now();
        {
            let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(prev) = *last {
                if now.duration_since(prev) < period {
                    return;
                }
            }
            *last = Some(now);
        }
        callback(value);
    }
}
