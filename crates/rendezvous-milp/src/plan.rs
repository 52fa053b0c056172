use crate::oracle::OracleStatus;
use serde::Serialize;

/// One person's next hop.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Route {
    pub person: String,
    /// Name of the person picked up next, or of the destination.
    pub going_to: String,
    pub use_car: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Scores {
    pub total_distance: f64,
    pub fun_score: f64,
    pub interval_score: f64,
    pub distance_score: f64,
    pub objective: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Timings {
    pub build_secs: f64,
    pub solve_secs: f64,
}

/// The optimized outcome of one planning run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Plan {
    pub destination: String,
    pub activity_start: Option<String>,
    pub activity_end: Option<String>,
    pub routes: Vec<Route>,
    pub scores: Scores,
    pub status: OracleStatus,
    pub timings: Timings,
}

impl Plan {
    pub fn route(&self, person: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.person == person)
    }

    pub fn drivers(&self) -> impl Iterator<Item = &str> {
        self.routes
            .iter()
            .filter(|route| route.use_car)
            .map(|route| route.person.as_str())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
