//! Typed input records and their validation into a [`Problem`].

use crate::availability::Availability;
use crate::config::{ActivityConfig, OptimizerConfig};
use crate::error::InputError;
use crate::models::{Activity, Destination, Location, Person, Problem};
use crate::utils::parse_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonRecord {
    pub name: String,
    #[serde(alias = "loc")]
    pub location: Location,
    pub car: bool,
    #[serde(alias = "PPC_max")]
    pub max_passengers: u32,
    #[serde(alias = "availabilities")]
    pub availability: Availability,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationRecord {
    pub name: String,
    #[serde(alias = "loc")]
    pub location: Location,
    #[serde(alias = "score")]
    pub fun_score: f64,
    #[serde(alias = "availabilities")]
    pub availability: Availability,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanningInput {
    pub people: Vec<PersonRecord>,
    pub destinations: Vec<DestinationRecord>,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    pub activity: ActivityConfig,
}

impl Problem {
    pub fn from_json(raw: &str) -> Result<Self, InputError> {
        let input: PlanningInput = serde_json::from_str(raw)?;
        Self::from_input(input)
    }

    /// Validates every record and builds the entities.
    ///
    /// All availability bitmaps must share the horizon of the first person.
    pub fn from_input(input: PlanningInput) -> Result<Self, InputError> {
        let PlanningInput {
            people,
            destinations,
            optimizer,
            activity,
        } = input;

        if people.is_empty() {
            return Err(InputError::NoPeople);
        }
        if destinations.is_empty() {
            return Err(InputError::NoDestinations);
        }
        optimizer.validate()?;

        let horizon = people[0].availability.len();
        if horizon == 0 {
            return Err(InputError::EmptyHorizon);
        }

        let mut names = HashSet::new();
        let mut check = |name: &str, location: &Location, availability: &Availability| {
            if !names.insert(name.to_string()) {
                return Err(InputError::DuplicateName(name.to_string()));
            }
            if !location.is_finite() {
                return Err(InputError::NonFiniteLocation(name.to_string()));
            }
            if availability.len() != horizon {
                return Err(InputError::HorizonMismatch {
                    name: name.to_string(),
                    expected: horizon,
                    found: availability.len(),
                });
            }
            Ok(())
        };

        for record in &people {
            check(&record.name, &record.location, &record.availability)?;
        }
        for record in &destinations {
            check(&record.name, &record.location, &record.availability)?;
            if !(0.0..=10.0).contains(&record.fun_score) {
                return Err(InputError::FunScoreOutOfRange {
                    name: record.name.clone(),
                    score: record.fun_score,
                });
            }
        }

        if activity.duration == 0 {
            return Err(InputError::ZeroDuration);
        }
        let start =
            parse_timestamp(&activity.start_timestamp).map_err(|source| InputError::Timestamp {
                value: activity.start_timestamp.clone(),
                source,
            })?;
        // The latest window ends one hour past the horizon plus one duration.
        let hours = horizon as i64 + 1 + i64::from(activity.duration);
        if start.checked_add(time::Duration::hours(hours)).is_none() {
            return Err(InputError::WindowOutOfRange {
                start: activity.start_timestamp,
                hours,
            });
        }

        Ok(Problem {
            people: people
                .into_iter()
                .map(|p| Person::new(p.name, p.location, p.car, p.max_passengers, p.availability))
                .collect(),
            destinations: destinations
                .into_iter()
                .map(|d| Destination::new(d.name, d.location, d.fun_score, d.availability))
                .collect(),
            optimizer,
            activity: Activity {
                name: activity.name,
                duration: activity.duration,
                start,
            },
        })
    }
}
