// src/watch/watermark.rs

use std::sync::Mutex;
use std::time::SystemTime;

/// Instant of the last completed build-or-restart decision.
///
/// Files modified at or before the watermark count as already observed.
/// The watermark only moves forward.
#[derive(Debug)]
pub struct Watermark {
    at: Mutex<SystemTime>,
}

impl Watermark {
    pub fn new(at: SystemTime) -> Self {
        Self { at: Mutex::new(at) }
    }

    /// Watermark starting at the current time.
    pub fn now() -> Self {
        Self::new(SystemTime::now())
    }

    pub fn get(&self) -> SystemTime {
        match self.at.lock() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Move the watermark to `t` unless it is already later.
    pub fn advance_to(&self, t: SystemTime) {
        let mut guard = match self.at.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if t > *guard {
            *guard = t;
        }
    }

    pub fn advance_now(&self) {
        self.advance_to(SystemTime::now());
    }
}
