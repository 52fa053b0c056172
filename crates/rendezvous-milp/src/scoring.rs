use crate::context::ModelContext;
use rendezvous_core::{InputError, OptimizerConfig};

/// Distances below this are treated as "everyone already there".
const EPS_DISTANCE: f64 = 1e-9;

/// How total distance is rescaled onto the 0–10 score band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScoringPolicy {
    /// Per-person reference distances: `min` scores 10, `max` scores 0.
    Reference { min: f64, max: f64 },
    /// Scores 9 at the group's mean person-to-destination distance, 10 at zero.
    MeanDistance,
}

impl ScoringPolicy {
    pub fn from_config(config: &OptimizerConfig) -> Result<Self, InputError> {
        Ok(match config.distance_reference()? {
            Some((min, max)) => ScoringPolicy::Reference { min, max },
            None => ScoringPolicy::MeanDistance,
        })
    }

    /// `(slope, intercept)` such that `distance_score = slope * total + intercept`.
    pub fn affine(&self, ctx: &ModelContext) -> (f64, f64) {
        let n_people = ctx.n_people as f64;
        match *self {
            ScoringPolicy::Reference { min, max } => {
                let d_min = min * n_people;
                let d_max = max * n_people;
                let slope = 10.0 / (d_min - d_max);
                (slope, -slope * d_max)
            }
            ScoringPolicy::MeanDistance => {
                let d_mean = ctx.mean_person_to_destination() * n_people;
                if d_mean < EPS_DISTANCE {
                    (0.0, 10.0)
                } else {
                    (-1.0 / d_mean, 10.0)
                }
            }
        }
    }

    pub fn distance_score(&self, ctx: &ModelContext, total_distance: f64) -> f64 {
        let (slope, intercept) = self.affine(ctx);
        slope * total_distance + intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_core::{Availability, Destination, Location, Person, Problem};

    fn line_problem(config: OptimizerConfig) -> Problem {
        let always = Availability::always(4);
        Problem {
            people: vec![
                Person::new("a", Location::new(0.0, 0.0), true, 3, always.clone()),
                Person::new("b", Location::new(1.0, 0.0), false, 0, always.clone()),
            ],
            destinations: vec![Destination::new("d", Location::new(3.0, 0.0), 8.0, always)],
            optimizer: config,
            activity: rendezvous_core::Activity {
                name: None,
                duration: 1,
                start: rendezvous_core::utils::parse_timestamp("2019-01-01T00:00:00").unwrap(),
            },
        }
    }

    #[test]
    fn reference_band_maps_endpoints() {
        let problem = line_problem(OptimizerConfig::default());
        let ctx = ModelContext::new(&problem);
        let policy = ScoringPolicy::Reference { min: 0.0, max: 10.0 };

        assert!((policy.distance_score(&ctx, 0.0) - 10.0).abs() < 1e-9);
        assert!(policy.distance_score(&ctx, 20.0).abs() < 1e-9);
        assert!((policy.distance_score(&ctx, 5.0) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn mean_variant_scores_nine_at_the_mean() {
        let problem = line_problem(OptimizerConfig::default());
        let ctx = ModelContext::new(&problem);
        // mean person-to-destination distance is (3 + 2) / 2, times two people
        let policy = ScoringPolicy::MeanDistance;
        assert!((policy.distance_score(&ctx, 5.0) - 9.0).abs() < 1e-9);
        assert!((policy.distance_score(&ctx, 0.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn config_selects_the_variant() {
        let config = OptimizerConfig {
            distance_reference_min: Some(1.0),
            distance_reference_max: Some(4.0),
            ..OptimizerConfig::default()
        };
        assert_eq!(
            ScoringPolicy::from_config(&config).unwrap(),
            ScoringPolicy::Reference { min: 1.0, max: 4.0 }
        );
        assert_eq!(
            ScoringPolicy::from_config(&OptimizerConfig::default()).unwrap(),
            ScoringPolicy::MeanDistance
        );
    }
}
