//! Interval feasibility scan.
//!
//! Looks, per destination, for a block of `duration` consecutive hours in which
//! the destination and every person are free. When a round finds no block for
//! a destination its interval score drops by one and everyone's working
//! availability is widened by an hour on each side, so destinations that need
//! more relaxation end up with lower scores. A destination whose score reaches
//! zero is settled without a window.

use crate::availability::Availability;
use crate::models::{Destination, Person};
use time::{Duration, PrimitiveDateTime};
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Rounds executed; zero when every destination was already settled.
    pub rounds: usize,
    /// Destinations that received a window during this scan.
    pub windows_found: usize,
    /// Destinations settled at score zero during this scan.
    pub exhausted: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct IntervalScanner {
    duration: u32,
    base_start: PrimitiveDateTime,
}

impl IntervalScanner {
    pub fn new(duration: u32, base_start: PrimitiveDateTime) -> Self {
        Self {
            duration,
            base_start,
        }
    }

    pub fn scan(&self, people: &mut [Person], destinations: &mut [Destination]) -> ScanReport {
        let mut report = ScanReport::default();
        while destinations.iter().any(|d| !d.flag_interval) {
            self.round(people, destinations, &mut report);
        }
        report
    }

    /// One pass over the unsettled destinations, relaxing people afterwards if
    /// any destination is still unsettled.
    ///
    /// Shared bitmaps are AND-intersections over everyone, so every person is
    /// part of every window this finds.
    pub fn round(
        &self,
        people: &mut [Person],
        destinations: &mut [Destination],
        report: &mut ScanReport,
    ) {
        report.rounds += 1;

        for destination in destinations.iter_mut().filter(|d| !d.flag_interval) {
            let shared = shared_availability(destination, people);
            if let Some((start, end)) = self.find_window(&shared) {
                destination.activity_start = Some(start);
                destination.activity_end = Some(end);
                destination.flag_interval = true;
                report.windows_found += 1;
                debug!(
                    destination = %destination.name,
                    round = report.rounds,
                    score = destination.interval_score,
                    "shared window found"
                );
                continue;
            }

            destination.interval_score = destination.interval_score.saturating_sub(1);
            if destination.interval_score == 0 {
                destination.flag_interval = true;
                report.exhausted += 1;
                debug!(destination = %destination.name, "no shared window after full relaxation");
            }
        }

        // Any window found this round had every person free over it, so the
        // people holding back the remaining destinations are the ones whose
        // working bitmap still has busy hours.
        if destinations.iter().any(|d| !d.flag_interval) {
            for person in people.iter_mut().filter(|p| !p.relaxed_availability.all_free()) {
                person.relaxed_availability = person.relaxed_availability.relaxed();
            }
        }
    }

    /// First free run of at least `duration` hours.
    ///
    /// The start is offset from the horizon start by the busy hours preceding
    /// that run plus one. A window that would end past the last representable
    /// date counts as not found.
    pub fn find_window(
        &self,
        shared: &Availability,
    ) -> Option<(PrimitiveDateTime, PrimitiveDateTime)> {
        let mut elapsed_busy_hours: i64 = 0;

        for run in shared.runs() {
            if !run.free {
                elapsed_busy_hours += run.len as i64;
                continue;
            }
            if run.len >= self.duration as usize {
                let start = self
                    .base_start
                    .checked_add(Duration::hours(elapsed_busy_hours + 1))?;
                let end = start.checked_add(Duration::hours(i64::from(self.duration)))?;
                return Some((start, end));
            }
        }

        None
    }
}

/// Hours in which the destination and every person's working bitmap are free.
pub fn shared_availability(destination: &Destination, people: &[Person]) -> Availability {
    let mut shared = destination.availability.clone();
    for person in people {
        shared.intersect(&person.relaxed_availability);
    }
    shared
}
