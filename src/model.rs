use std::time::Duration;

/// Run parameters resolved once at start-up. Every worker gets its own clone.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub uri: String,
    pub threads: usize,
    pub minutes: f64,
    pub sleepms: u64,
    /// Accepted for command-line compatibility; has no effect.
    pub poolsize: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uri: String::new(),
            threads: 1,
            minutes: 1.0,
            sleepms: 0,
            poolsize: 0,
        }
    }
}

impl Config {
    /// Time budget of a single worker, at millisecond precision.
    pub fn run_for(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.minutes * 60_000.0) as i64)
    }

    /// Pause inserted before each request, if any.
    pub fn pace(&self) -> Option<Duration> {
        (self.sleepms > 0).then(|| Duration::from_millis(self.sleepms))
    }
}

/// What a worker reports once its time budget is spent.
#[derive(Debug)]
pub struct WorkerState {
    pub rank: usize,
    pub requests: usize,
    pub begin: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
}
