use std::thread;
use std::time::{Duration, Instant};

/// Poll `pred` until it holds or the timeout elapses. Returns the last
/// observation, so callers can `assert!` on it directly.
pub fn wait_until<F>(timeout: Duration, pred: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    pred()
}
