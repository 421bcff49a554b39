use std::time::{Duration, Instant};

/// Sleep function invoked when the request quota for the current window is
/// spent. Injectable so tests can record delays instead of waiting them out.
pub type Sleeper = Box<dyn FnMut(Duration) + Send>;

/// Client-side request pacing over a one-second window.
///
/// The window is anchored at the moment its first request fired. Requests
/// 1..N within a window dispatch immediately; the (N+1)-th triggers exactly
/// one sleep for the remainder of the window, after which the window and
/// counter restart.
pub struct RateLimiter {
    requests_per_second: u32,
    window_start: Instant,
    count: u32,
    sleeper: Sleeper,
}

impl RateLimiter {
    /// Create a limiter that blocks the calling thread when the quota is hit
    pub fn new(requests_per_second: u32) -> Self {
        Self::with_sleeper(requests_per_second, Box::new(std::thread::sleep))
    }

    /// Create a limiter with an injected sleep function
    pub fn with_sleeper(requests_per_second: u32, sleeper: Sleeper) -> Self {
        RateLimiter {
            requests_per_second: requests_per_second.max(1),
            window_start: Instant::now(),
            count: 0,
            sleeper,
        }
    }

    /// Account for one outgoing dispatch, sleeping first if the current
    /// window's quota is already exhausted
    pub fn throttle(&mut self) {
        let window = Duration::from_secs(1);
        let now = Instant::now();

        if now.duration_since(self.window_start) > window {
            self.window_start = now;
            self.count = 0;
        }

        if self.count >= self.requests_per_second {
            let elapsed = now.duration_since(self.window_start);
            (self.sleeper)(window.saturating_sub(elapsed));
            self.window_start = Instant::now();
            self.count = 0;
        }

        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_limiter(requests_per_second: u32) -> (RateLimiter, Arc<Mutex<Vec<Duration>>>) {
        let sleeps: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&sleeps);
        let limiter = RateLimiter::with_sleeper(
            requests_per_second,
            Box::new(move |duration| recorded.lock().unwrap().push(duration)),
        );
        (limiter, sleeps)
    }

    #[test]
    fn test_passes_through_single_request() {
        let (mut limiter, sleeps) = recording_limiter(5);

        limiter.throttle();

        assert!(sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sleeps_on_the_rps_plus_oneth_request() {
        let (mut limiter, sleeps) = recording_limiter(5);

        for _ in 0..5 {
            limiter.throttle();
        }
        assert!(sleeps.lock().unwrap().is_empty());

        limiter.throttle();

        let sleeps = sleeps.lock().unwrap();
        assert_eq!(sleeps.len(), 1);
        assert!(sleeps[0] > Duration::from_millis(900));
        assert!(sleeps[0] <= Duration::from_secs(1));
    }

    #[test]
    fn test_counter_restarts_after_sleep() {
        let (mut limiter, sleeps) = recording_limiter(2);

        for _ in 0..5 {
            limiter.throttle();
        }

        // 2 pass, sleep, 2 pass, sleep, 1 passes
        assert_eq!(sleeps.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_zero_rps_is_clamped_to_one() {
        let (mut limiter, sleeps) = recording_limiter(0);

        limiter.throttle();
        assert!(sleeps.lock().unwrap().is_empty());

        limiter.throttle();
        assert_eq!(sleeps.lock().unwrap().len(), 1);
    }
}
