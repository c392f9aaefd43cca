use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use astroline_core::TimeZoneOffset;

/// Compute the next UTC instant at which a daily `hour:minute` trigger in
/// `offset` fires, strictly after `from`.
///
/// Returns `None` only if the wall-clock time cannot be represented in the
/// offset's calendar, which cannot happen for a fixed offset and validated
/// hour/minute — callers treat it as an invalid schedule.
pub fn next_fire(
    offset: TimeZoneOffset,
    hour: u8,
    minute: u8,
    from: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let tz = offset.to_fixed_offset();
    let local = from.with_timezone(&tz);

    // Today's candidate at HH:MM:00 local.
    let candidate = tz
        .with_ymd_and_hms(
            local.year(),
            local.month(),
            local.day(),
            hour as u32,
            minute as u32,
            0,
        )
        .single()?;

    let candidate = if candidate > from {
        candidate
    } else {
        // Today's window has passed — advance to tomorrow.
        candidate + Duration::days(1)
    };
    Some(candidate.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn offset(s: &str) -> TimeZoneOffset {
        s.parse().unwrap()
    }

    #[test]
    fn fires_tomorrow_when_local_time_has_passed() {
        // 09:00 UTC+3 is 06:00 UTC; at 12:00 UTC today's slot is gone.
        let next = next_fire(offset("UTC+3"), 9, 0, utc("2024-06-01T12:00:00Z")).unwrap();
        assert_eq!(next, utc("2024-06-02T06:00:00Z"));
    }

    #[test]
    fn fires_today_when_local_time_is_ahead() {
        let next = next_fire(offset("UTC+3"), 9, 0, utc("2024-06-01T03:00:00Z")).unwrap();
        assert_eq!(next, utc("2024-06-01T06:00:00Z"));
    }

    #[test]
    fn negative_offsets_shift_the_other_way() {
        // 09:00 UTC-5 is 14:00 UTC.
        let next = next_fire(offset("UTC-5"), 9, 0, utc("2024-06-01T10:00:00Z")).unwrap();
        assert_eq!(next, utc("2024-06-01T14:00:00Z"));
    }

    #[test]
    fn exact_trigger_instant_rolls_to_next_day() {
        // A fire at exactly HH:MM must schedule the NEXT day, not re-fire now.
        let next = next_fire(offset("UTC+0"), 9, 30, utc("2024-06-01T09:30:00Z")).unwrap();
        assert_eq!(next, utc("2024-06-02T09:30:00Z"));
    }

    #[test]
    fn local_date_can_differ_from_utc_date() {
        // 01:00 UTC+14 on June 2 local is 11:00 UTC June 1.
        let next = next_fire(offset("UTC+14"), 1, 0, utc("2024-06-01T00:00:00Z")).unwrap();
        assert_eq!(next, utc("2024-06-01T11:00:00Z"));
    }
}
