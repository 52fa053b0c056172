use crate::models::Location;
use time::macros::format_description;
use time::PrimitiveDateTime;

#[inline(always)]
pub fn euclidean_distance(from: &Location, to: &Location) -> f64 {
    let dx = from.x - to.x;
    let dy = from.y - to.y;

    dx.hypot(dy)
}

/// Parses `YYYY-MM-DDTHH:MM:SS`, the timestamp shape used by activity records.
pub fn parse_timestamp(value: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
}

pub fn format_timestamp(value: &PrimitiveDateTime) -> String {
    value
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_straight_line() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(3.0, 4.0);
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn timestamp_round_trips_through_text() {
        let parsed = parse_timestamp("2019-01-01T08:30:00").unwrap();
        assert_eq!(format_timestamp(&parsed), "2019-01-01T08:30:00");
        assert!(parse_timestamp("2019-01-01").is_err());
    }
}
