use chrono::{NaiveDateTime, Timelike};

pub const START_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Hour of day from which check-in endpoints open
const OPEN_HOUR: u32 = 8;

/// Hour of day from which teams may submit
const SUBMIT_HOUR: u32 = 12;

/// Opening window of the event, all times are local wall-clock times
#[derive(Debug, Clone, Default)]
pub struct EventWindow {
    pub start: Option<NaiveDateTime>,
    /// Reject check-in operations outside the window
    pub enforce: bool,
}

impl EventWindow {
    pub fn new(start: Option<NaiveDateTime>, enforce: bool) -> Self {
        Self { start, enforce }
    }

    pub fn parse_start(value: &str) -> crate::error::Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(value.trim(), START_DATE_FORMAT).map_err(|e| {
            crate::error::WalkError::ConfigValidation {
                message: format!("invalid event start date '{}': {}", value, e),
            }
        })
    }

    /// Whole days elapsed since the start date
    pub fn day_index(&self, now: NaiveDateTime) -> i64 {
        match self.start {
            Some(start) => (now - start).num_days(),
            None => 0,
        }
    }

    pub fn can_open_api(&self, now: NaiveDateTime) -> bool {
        if let Some(start) = self.start {
            if now <= start {
                return false;
            }
        }
        now.hour() >= OPEN_HOUR
    }

    pub fn can_submit(&self, now: NaiveDateTime) -> bool {
        now.hour() >= SUBMIT_HOUR
    }

    /// Gate for admin check-in operations
    pub fn check_open(&self, now: NaiveDateTime) -> crate::error::Result<()> {
        if self.enforce && !self.can_open_api(now) {
            return Err(crate::error::WalkError::EventNotOpen);
        }
        Ok(())
    }
}
