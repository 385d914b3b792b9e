//! Next-run computation over the configured UTC schedule slots.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Parse a comma-separated `HH:MM` list ("0:17,9:17") into sorted
/// (hour, minute) slots. Malformed entries are skipped; an empty result
/// falls back to the default twice-daily schedule.
pub fn parse_schedule(raw: &str) -> Vec<(u32, u32)> {
    let mut slots: Vec<(u32, u32)> = raw
        .split(',')
        .filter_map(|part| {
            let (h, m) = part.trim().split_once(':')?;
            let hour: u32 = h.trim().parse().ok()?;
            let minute: u32 = m.trim().parse().ok()?;
            (hour < 24 && minute < 60).then_some((hour, minute))
        })
        .collect();
    if slots.is_empty() {
        slots = vec![(0, 17), (9, 17)];
    }
    slots.sort_unstable();
    slots.dedup();
    slots
}

/// The next slot strictly later than `now` today, else the first slot of the
/// following day.
pub fn next_update_at(now: DateTime<Utc>, slots: &[(u32, u32)]) -> DateTime<Utc> {
    debug_assert!(!slots.is_empty());
    let today = now.date_naive();
    for &(hour, minute) in slots {
        let candidate = Utc
            .from_utc_datetime(&today.and_hms_opt(hour, minute, 0).expect("valid slot"));
        if candidate > now {
            return candidate;
        }
    }
    let (hour, minute) = slots[0];
    Utc.from_utc_datetime(
        &(today + Duration::days(1))
            .and_hms_opt(hour, minute, 0)
            .expect("valid slot"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2025, 6, 10)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap(),
        )
    }

    #[test]
    fn parses_and_sorts_slots() {
        assert_eq!(parse_schedule("9:17,0:17"), vec![(0, 17), (9, 17)]);
        assert_eq!(parse_schedule(" 06:00 , 18:30 "), vec![(6, 0), (18, 30)]);
    }

    #[test]
    fn malformed_entries_fall_back_to_default() {
        assert_eq!(parse_schedule("nope"), vec![(0, 17), (9, 17)]);
        assert_eq!(parse_schedule("25:00,9:99"), vec![(0, 17), (9, 17)]);
    }

    #[test]
    fn after_last_slot_rolls_to_tomorrow() {
        let slots = parse_schedule("0:17,9:17");
        let next = next_update_at(at(10, 0), &slots);
        assert_eq!(next, at(0, 17) + Duration::days(1));
    }

    #[test]
    fn before_a_slot_picks_it_today() {
        let slots = parse_schedule("0:17,9:17");
        assert_eq!(next_update_at(at(5, 0), &slots), at(9, 17));
    }

    #[test]
    fn exact_slot_time_is_not_strictly_later() {
        let slots = parse_schedule("0:17,9:17");
        assert_eq!(next_update_at(at(9, 17), &slots), at(0, 17) + Duration::days(1));
    }
}
