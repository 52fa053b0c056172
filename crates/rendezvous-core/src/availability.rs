//! Hour-by-hour availability bitmaps.

use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// One flag per planning hour, `true` meaning free.
///
/// Serialized as a list of `0`/`1` integers; any other value is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Availability {
    hours: Vec<bool>,
}

/// A maximal block of consecutive hours sharing the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub free: bool,
    pub len: usize,
}

impl Availability {
    pub fn new(hours: Vec<bool>) -> Self {
        Self { hours }
    }

    pub fn always(len: usize) -> Self {
        Self { hours: vec![true; len] }
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn is_free(&self, hour: usize) -> bool {
        self.hours.get(hour).copied().unwrap_or(false)
    }

    pub fn any_free(&self) -> bool {
        self.hours.iter().any(|&free| free)
    }

    pub fn all_free(&self) -> bool {
        self.hours.iter().all(|&free| free)
    }

    pub fn free_hours(&self) -> usize {
        self.hours.iter().filter(|&&free| free).count()
    }

    /// Logical AND with `other`, position by position.
    ///
    /// Hours beyond the shorter bitmap are treated as busy.
    pub fn intersect(&mut self, other: &Availability) {
        for (hour, free) in self.hours.iter_mut().enumerate() {
            *free = *free && other.is_free(hour);
        }
    }

    /// Grows every free block by one hour on both sides.
    ///
    /// A bitmap with no free hour at all gets a single free hour seeded at the
    /// middle of the horizon.
    pub fn relaxed(&self) -> Availability {
        let len = self.hours.len();
        let mut grown = self.hours.clone();

        if !self.any_free() {
            if len > 0 {
                grown[len / 2] = true;
            }
            return Availability::new(grown);
        }

        for (hour, &free) in self.hours.iter().enumerate() {
            if !free {
                continue;
            }
            if hour > 0 {
                grown[hour - 1] = true;
            }
            if hour + 1 < len {
                grown[hour + 1] = true;
            }
        }

        Availability::new(grown)
    }

    /// `true` when every free hour of `other` is also free here.
    pub fn is_superset_of(&self, other: &Availability) -> bool {
        self.len() == other.len()
            && self
                .hours
                .iter()
                .zip(&other.hours)
                .all(|(&mine, &theirs)| mine || !theirs)
    }

    /// Run-length encoding, left to right.
    pub fn runs(&self) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        for &free in &self.hours {
            match runs.last_mut() {
                Some(run) if run.free == free => run.len += 1,
                _ => runs.push(Run { free, len: 1 }),
            }
        }
        runs
    }
}

impl TryFrom<Vec<u8>> for Availability {
    type Error = InputError;

    fn try_from(bits: Vec<u8>) -> Result<Self, Self::Error> {
        let hours = bits
            .into_iter()
            .map(|bit| match bit {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(InputError::InvalidAvailability(other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { hours })
    }
}

impl From<Availability> for Vec<u8> {
    fn from(availability: Availability) -> Self {
        availability.hours.into_iter().map(u8::from).collect()
    }
}
