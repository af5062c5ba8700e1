//! Availability queries.
//!
//! [`AvailableSlots`] is a lazy, finite, restartable sequence of candidate
//! start times: it captures a snapshot of the occupied slots once and
//! evaluates the capacity check per candidate on iteration, so re-iterating
//! costs nothing and never observes a different schedule than the first
//! pass.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::SchedulingError;
use crate::records::TimeSlot;
use crate::types::{DurationMinutes, Timestamp};

/// The default candidate-grid spacing, 30 minutes.
pub fn default_granularity() -> DurationMinutes {
    DurationMinutes::try_new(30).expect("30 is a valid duration")
}

/// The daily opening hours inside which slots are offered.
///
/// An external configuration input; the core only requires that the window
/// is non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingWindow {
    opens: NaiveTime,
    closes: NaiveTime,
}

impl OperatingWindow {
    /// Creates a window, failing with `Validation` unless `opens < closes`.
    pub fn new(opens: NaiveTime, closes: NaiveTime) -> Result<Self, SchedulingError> {
        if opens < closes {
            Ok(Self { opens, closes })
        } else {
            Err(SchedulingError::Validation(format!(
                "operating window must open before it closes ({opens} >= {closes})"
            )))
        }
    }

    /// Opening time.
    pub const fn opens(&self) -> NaiveTime {
        self.opens
    }

    /// Closing time.
    pub const fn closes(&self) -> NaiveTime {
        self.closes
    }

    /// The window projected onto a calendar date, as UTC instants.
    pub fn on(&self, date: NaiveDate) -> (Timestamp, Timestamp) {
        (
            Timestamp::new(date.and_time(self.opens).and_utc()),
            Timestamp::new(date.and_time(self.closes).and_utc()),
        )
    }
}

impl Default for OperatingWindow {
    /// Nine to five.
    fn default() -> Self {
        Self {
            opens: NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 is a valid time"),
            closes: NaiveTime::from_hms_opt(17, 0, 0).expect("17:00 is a valid time"),
        }
    }
}

/// The free start times for one service on one date.
///
/// Produced by [`crate::scheduler::Scheduler::available_slots`]. Candidates
/// step through the operating window at the configured granularity; a
/// candidate is offered when the service's full duration fits before
/// closing and fewer than `capacity` occupied slots overlap it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableSlots {
    window_start: Timestamp,
    window_end: Timestamp,
    duration: DurationMinutes,
    granularity: DurationMinutes,
    capacity: u32,
    busy: Vec<TimeSlot>,
}

impl AvailableSlots {
    /// Builds the sequence from an occupied-slot snapshot.
    pub fn new(
        window_start: Timestamp,
        window_end: Timestamp,
        duration: DurationMinutes,
        granularity: DurationMinutes,
        capacity: u32,
        busy: Vec<TimeSlot>,
    ) -> Self {
        Self {
            window_start,
            window_end,
            duration,
            granularity,
            capacity,
            busy,
        }
    }

    /// A sequence that yields nothing (unavailable service).
    pub fn none() -> Self {
        let nowhere = Timestamp::now();
        Self {
            window_start: nowhere,
            window_end: nowhere,
            duration: default_granularity(),
            granularity: default_granularity(),
            capacity: 0,
            busy: Vec::new(),
        }
    }

    /// Starts (or restarts) iteration over the candidate grid.
    pub const fn iter(&self) -> SlotIter<'_> {
        SlotIter {
            slots: self,
            cursor: self.window_start,
        }
    }

    fn admits(&self, candidate: Timestamp) -> bool {
        let slot = TimeSlot::new(candidate, self.duration);
        if slot.end() > self.window_end {
            return false;
        }
        let occupied = self.busy.iter().filter(|b| b.overlaps(&slot)).count();
        u32::try_from(occupied).unwrap_or(u32::MAX) < self.capacity
    }
}

impl<'a> IntoIterator for &'a AvailableSlots {
    type Item = Timestamp;
    type IntoIter = SlotIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over free start times. Obtained from [`AvailableSlots::iter`].
#[derive(Debug, Clone)]
pub struct SlotIter<'a> {
    slots: &'a AvailableSlots,
    cursor: Timestamp,
}

impl Iterator for SlotIter<'_> {
    type Item = Timestamp;

    fn next(&mut self) -> Option<Timestamp> {
        let step = self.slots.granularity.to_duration();
        while self.cursor < self.slots.window_end {
            let candidate = self.cursor;
            self.cursor = candidate.plus(step);
            // The grid is finite: once the duration no longer fits before
            // closing, no later candidate fits either.
            if TimeSlot::new(candidate, self.slots.duration).end() > self.slots.window_end {
                return None;
            }
            if self.slots.admits(candidate) {
                return Some(candidate);
            }
        }
        None
    }
}
