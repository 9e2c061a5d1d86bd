use crate::clock::ClockSource;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time source.
#[derive(Clone, Copy, Default)]
pub struct System;

impl System {
    pub fn new() -> Self { System }
}

impl ClockSource for System {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}
