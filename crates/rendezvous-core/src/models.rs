use crate::availability::Availability;
use crate::config::OptimizerConfig;
use crate::scanner::{IntervalScanner, ScanReport};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

/// Interval score a destination starts the scan with.
pub const MAX_INTERVAL_SCORE: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Location {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Location> for [f64; 2] {
    fn from(location: Location) -> Self {
        [location.x, location.y]
    }
}

/// Endpoint of a directed arc in the routing graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Person(usize),
    Destination(usize),
}

#[derive(Clone, Debug)]
pub struct Person {
    pub name: String,
    pub location: Location,
    pub car: bool,
    pub max_passengers: u32,
    pub availability: Availability,
    /// Working copy widened by the interval scanner.
    pub relaxed_availability: Availability,
    pub going_to: Option<Node>,
    pub use_car: bool,
}

impl Person {
    pub fn new(
        name: impl Into<String>,
        location: Location,
        car: bool,
        max_passengers: u32,
        availability: Availability,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            car,
            max_passengers,
            relaxed_availability: availability.clone(),
            availability,
            going_to: None,
            use_car: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Destination {
    pub name: String,
    pub location: Location,
    pub fun_score: f64,
    pub availability: Availability,
    pub interval_score: u8,
    pub flag_interval: bool,
    pub activity_start: Option<PrimitiveDateTime>,
    pub activity_end: Option<PrimitiveDateTime>,
    pub chosen: bool,
}

impl Destination {
    /// A destination that is never open is settled at once with score 0.
    pub fn new(
        name: impl Into<String>,
        location: Location,
        fun_score: f64,
        availability: Availability,
    ) -> Self {
        let never_open = !availability.any_free();
        Self {
            name: name.into(),
            location,
            fun_score,
            availability,
            interval_score: if never_open { 0 } else { MAX_INTERVAL_SCORE },
            flag_interval: never_open,
            activity_start: None,
            activity_end: None,
            chosen: false,
        }
    }

    pub fn has_window(&self) -> bool {
        self.activity_start.is_some()
    }
}

/// Validated activity settings.
#[derive(Clone, Debug)]
pub struct Activity {
    pub name: Option<String>,
    /// Contiguous hours the activity needs.
    pub duration: u32,
    /// Wall-clock time of hour 0 of the planning horizon.
    pub start: PrimitiveDateTime,
}

/// A fully validated planning instance.
///
/// Nodes are laid out people first, then destinations; `node_index` and
/// `node_at` convert between the two views.
#[derive(Clone, Debug)]
pub struct Problem {
    pub people: Vec<Person>,
    pub destinations: Vec<Destination>,
    pub optimizer: OptimizerConfig,
    pub activity: Activity,
}

impl Problem {
    pub fn horizon(&self) -> usize {
        self.people
            .first()
            .map(|person| person.availability.len())
            .unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.people.len() + self.destinations.len()
    }

    pub fn node_index(&self, node: Node) -> usize {
        match node {
            Node::Person(idx) => idx,
            Node::Destination(idx) => self.people.len() + idx,
        }
    }

    pub fn node_at(&self, index: usize) -> Node {
        if index < self.people.len() {
            Node::Person(index)
        } else {
            Node::Destination(index - self.people.len())
        }
    }

    pub fn location(&self, node: Node) -> &Location {
        match node {
            Node::Person(idx) => &self.people[idx].location,
            Node::Destination(idx) => &self.destinations[idx].location,
        }
    }

    pub fn name(&self, node: Node) -> &str {
        match node {
            Node::Person(idx) => &self.people[idx].name,
            Node::Destination(idx) => &self.destinations[idx].name,
        }
    }

    /// Runs the interval scan over this problem's own entities.
    pub fn scan_intervals(&mut self) -> ScanReport {
        IntervalScanner::new(self.activity.duration, self.activity.start)
            .scan(&mut self.people, &mut self.destinations)
    }
}
