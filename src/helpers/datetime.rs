use time::{OffsetDateTime, UtcOffset};

/// Log timestamps in the user's local offset
pub trait Timezone {
    fn to_localtime(&self) -> OffsetDateTime;
    fn to_formatted_string(&self) -> String;
}

impl Timezone for OffsetDateTime {
    fn to_localtime(&self) -> OffsetDateTime {
        let tz_offset_sec = chrono::Local::now().offset().local_minus_utc();
        match UtcOffset::from_whole_seconds(tz_offset_sec) {
            Ok(offset) => self.to_offset(offset),
            Err(_) => *self,
        }
    }

    // Millisecond precision, "2025-06-01 12:30:45.123 +02:00:00"
    fn to_formatted_string(&self) -> String {
        let str = format!("{:?}", self);
        match str.split_once('.') {
            Some((whole, rest)) => {
                let millis: String = rest.chars().take_while(|c| c.is_ascii_digit()).take(3).collect();
                let offset = rest.trim_start_matches(|c: char| c.is_ascii_digit());
                format!("{}.{:0<3}{}", whole, millis, offset)
            }
            None => str,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millisecond_precision() {
        let dt = OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_123_456_789).unwrap();
        let s = dt.to_formatted_string();
        assert!(s.contains(".123"), "{}", s);
        assert!(!s.contains("456"), "{}", s);
    }
}
