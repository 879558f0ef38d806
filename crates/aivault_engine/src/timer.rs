//! Game timer stored in the state tree.
//!
//! `timer.elapsed` counts whole seconds and is advanced by [`PathStore::tick_timer`],
//! which the host calls once per second. Room timers record the elapsed
//! value at first entry and at completion.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::state::{RoomId, RoomTime};
use crate::store::PathStore;

/// Formats seconds as `mm:ss`, or `hh:mm:ss` from one hour up.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

fn wall_clock_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl PathStore {
    /// Starts (or resumes) the timer. Stamps `startTime` on the first start.
    #[instrument(skip(self))]
    pub fn start_timer(&mut self) -> Result<(), StoreError> {
        if self.get("startTime").is_none_or(|v| v.is_null()) {
            self.set("startTime", json!(wall_clock_millis()))?;
        }
        if !self.timer_running() {
            self.set("timer.running", json!(true))?;
            debug!("Timer running");
        }
        Ok(())
    }

    /// Advances the timer by one second if it is running.
    pub fn tick_timer(&mut self) -> Result<bool, StoreError> {
        if !self.timer_running() {
            return Ok(false);
        }
        let elapsed = self.elapsed() + 1;
        self.set("timer.elapsed", json!(elapsed))?;
        Ok(true)
    }

    /// Pauses the timer.
    #[instrument(skip(self))]
    pub fn pause_timer(&mut self) -> Result<(), StoreError> {
        if self.timer_running() {
            self.set("timer.running", json!(false))?;
        }
        Ok(())
    }

    /// Stops the timer and stamps `endTime`.
    #[instrument(skip(self))]
    pub fn stop_timer(&mut self) -> Result<(), StoreError> {
        self.pause_timer()?;
        self.set("endTime", json!(wall_clock_millis()))
    }

    /// Stops the timer and clears elapsed time and timestamps.
    #[instrument(skip(self))]
    pub fn reset_timer(&mut self) -> Result<(), StoreError> {
        self.pause_timer()?;
        self.set("timer.elapsed", json!(0))?;
        self.set("startTime", json!(null))?;
        self.set("endTime", json!(null))
    }

    /// Whether the timer is running.
    pub fn timer_running(&self) -> bool {
        self.get_bool("timer.running")
    }

    /// Elapsed game seconds.
    pub fn elapsed(&self) -> u64 {
        self.get_u64("timer.elapsed").unwrap_or(0)
    }

    /// Starts the room timer. Only the first entry counts.
    #[instrument(skip(self))]
    pub fn start_room_timer(&mut self, room: RoomId) -> Result<(), StoreError> {
        if self.room_timer(room).is_some() {
            return Ok(());
        }
        let start = self.elapsed();
        self.set(
            &format!("timer.roomTimes.{}", room.as_str()),
            json!({ "start": start, "end": null }),
        )
    }

    /// Stamps the end of the room timer if it was started.
    #[instrument(skip(self))]
    pub fn stop_room_timer(&mut self, room: RoomId) -> Result<(), StoreError> {
        if self.room_timer(room).is_none() {
            return Ok(());
        }
        let end = self.elapsed();
        self.set(
            &format!("timer.roomTimes.{}.end", room.as_str()),
            json!(end),
        )
    }

    /// Recorded start/end for `room`.
    pub fn room_timer(&self, room: RoomId) -> Option<RoomTime> {
        self.get_as(&format!("timer.roomTimes.{}", room.as_str()))
    }

    /// Every recorded room timer.
    pub fn room_timers(&self) -> BTreeMap<RoomId, RoomTime> {
        self.get_as("timer.roomTimes").unwrap_or_default()
    }

    /// Seconds spent in `room`. An open timer counts up to now.
    pub fn room_time(&self, room: RoomId) -> u64 {
        match self.room_timer(room) {
            Some(time) => time
                .end
                .unwrap_or_else(|| self.elapsed())
                .saturating_sub(time.start),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DEFAULT_TOTAL_HINTS, default_state};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(75), "01:15");
        assert_eq!(format_duration(3600), "01:00:00");
        assert_eq!(format_duration(3725), "01:02:05");
    }

    #[test]
    fn test_ticks_only_while_running() {
        let mut store = PathStore::new(default_state(DEFAULT_TOTAL_HINTS));
        assert!(!store.tick_timer().unwrap());
        store.start_timer().unwrap();
        store.tick_timer().unwrap();
        store.tick_timer().unwrap();
        store.pause_timer().unwrap();
        store.tick_timer().unwrap();
        assert_eq!(store.elapsed(), 2);
        assert!(store.get("startTime").is_some_and(|v| v.is_i64()));
    }

    #[test]
    fn test_room_timer_keeps_first_entry() {
        let mut store = PathStore::new(default_state(DEFAULT_TOTAL_HINTS));
        store.start_timer().unwrap();
        store.start_room_timer(RoomId::Space).unwrap();
        for _ in 0..5 {
            store.tick_timer().unwrap();
        }
        store.start_room_timer(RoomId::Space).unwrap();
        assert_eq!(store.room_time(RoomId::Space), 5);
        store.stop_room_timer(RoomId::Space).unwrap();
        store.tick_timer().unwrap();
        assert_eq!(store.room_time(RoomId::Space), 5);
        assert_eq!(
            store.room_timer(RoomId::Space),
            Some(RoomTime {
                start: 0,
                end: Some(5)
            })
        );
    }

    #[test]
    fn test_stop_stamps_end_time() {
        let mut store = PathStore::new(default_state(DEFAULT_TOTAL_HINTS));
        store.start_timer().unwrap();
        store.stop_timer().unwrap();
        assert!(!store.timer_running());
        assert!(store.get("endTime").is_some_and(|v| !v.is_null()));
        store.reset_timer().unwrap();
        assert_eq!(store.get("endTime"), Some(&json!(null)));
    }
}
