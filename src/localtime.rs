use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Timelike, Utc};

/// Zone used when `--local-time` rewrites broker timestamps.
#[derive(Debug, Clone, Copy)]
pub enum LocalZone {
    System,
    #[cfg_attr(not(test), allow(dead_code))]
    Fixed(FixedOffset),
}

impl LocalZone {
    /// Rewrites a broker UTC timestamp (`...Z` with 2 or 3 fractional digits)
    /// into the zone's local time with a numeric offset suffix.
    ///
    /// Anything else is returned untouched.
    pub fn convert(&self, value: &str) -> String {
        let digits = match (value.find('.'), value.find('Z')) {
            (Some(dot), Some(z)) if z > dot => z - dot - 1,
            _ => return value.to_string(),
        };
        if digits != 2 && digits != 3 {
            return value.to_string();
        }

        let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.fZ") else {
            return value.to_string();
        };
        let utc = Utc.from_utc_datetime(&naive);

        match self {
            LocalZone::System => format_local(&utc.with_timezone(&Local), digits),
            LocalZone::Fixed(offset) => format_local(&utc.with_timezone(offset), digits),
        }
    }
}

fn format_local<Tz>(time: &DateTime<Tz>, digits: usize) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let millis = time.nanosecond() / 1_000_000;
    let fraction = if digits == 2 {
        format!("{:02}", millis / 10)
    } else {
        format!("{:03}", millis)
    };
    format!(
        "{}.{}{}",
        time.format("%Y-%m-%dT%H:%M:%S"),
        fraction,
        time.format("%z")
    )
}
