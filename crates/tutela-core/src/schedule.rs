//! Weekday sets and the occurrence date generator.
//!
//! A recurring task family is defined by a set of weekdays plus a start and
//! end date. Expansion into concrete dates is a pure calendar walk; nothing
//! here touches the database or the clock.

use chrono::{Datelike, Months, NaiveDate, Weekday};

/// How far an open-ended family is expanded when no end date is stored.
pub const OPEN_ENDED_HORIZON_MONTHS: u32 = 6;

/// A set of weekdays, backed by a 7-bit mask (bit 0 = Monday).
///
/// Parsing is forgiving: unrecognized day names are silently dropped rather
/// than rejected, so a malformed submission degrades to a smaller set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl WeekdaySet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Builds a set from weekday names, dropping anything unrecognized.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::empty();
        for name in names {
            if let Some(day) = weekday_from_name(name.as_ref()) {
                set.insert(day);
            }
        }
        set
    }

    /// The contained days as lowercase English names, Monday first.
    pub fn names(&self) -> Vec<&'static str> {
        ALL_DAYS
            .iter()
            .filter(|d| self.contains(**d))
            .map(|d| weekday_name(*d))
            .collect()
    }

    /// Parses the persisted representation (a JSON list of weekday names).
    /// A malformed column value degrades to the empty set.
    pub fn from_stored(raw: &str) -> Self {
        serde_json::from_str::<Vec<String>>(raw)
            .map(Self::from_names)
            .unwrap_or_default()
    }

    /// The persisted representation: a JSON list of lowercase names.
    pub fn to_stored(&self) -> String {
        serde_json::to_string(&self.names()).unwrap_or_else(|_| String::from("[]"))
    }
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name.trim().to_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// End bound used when a family has no stored end date.
pub fn default_horizon(start: NaiveDate) -> NaiveDate {
    start
        .checked_add_months(Months::new(OPEN_ENDED_HORIZON_MONTHS))
        .unwrap_or(NaiveDate::MAX)
}

/// Expands a weekday set over `[start, end]` into concrete dates.
///
/// The result is ascending and duplicate-free. An empty set or an inverted
/// range yields no dates.
pub fn occurrence_dates(days: &WeekdaySet, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if days.is_empty() || end < start {
        return Vec::new();
    }
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| days.contains(d.weekday()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn expands_weekday_set_over_range() {
        let set = WeekdaySet::from_names(["monday", "wednesday"]);
        let dates = occurrence_dates(&set, date(2025, 1, 1), date(2025, 1, 14));
        assert_eq!(
            dates,
            vec![
                date(2025, 1, 1),
                date(2025, 1, 6),
                date(2025, 1, 8),
                date(2025, 1, 13),
            ]
        );
    }

    #[rstest]
    #[case(&["monday"], 1)]
    #[case(&["monday", "monday"], 1)]
    #[case(&["monday", "fnord"], 1)]
    #[case(&["fnord", "blursday"], 0)]
    #[case(&["MONDAY", "Sunday"], 2)]
    #[case(&["mon", "tue", "wed", "thu", "fri", "sat", "sun"], 7)]
    fn parsing_drops_unrecognized_names(#[case] names: &[&str], #[case] expected: usize) {
        assert_eq!(WeekdaySet::from_names(names).len(), expected);
    }

    #[test]
    fn empty_set_and_inverted_range_yield_nothing() {
        let set = WeekdaySet::from_names(["tuesday"]);
        assert!(occurrence_dates(&WeekdaySet::empty(), date(2025, 1, 1), date(2025, 12, 31)).is_empty());
        assert!(occurrence_dates(&set, date(2025, 2, 1), date(2025, 1, 1)).is_empty());
    }

    #[test]
    fn stored_form_round_trips() {
        let set = WeekdaySet::from_names(["sunday", "wednesday"]);
        let raw = set.to_stored();
        assert_eq!(raw, r#"["wednesday","sunday"]"#);
        assert_eq!(WeekdaySet::from_stored(&raw), set);
        assert!(WeekdaySet::from_stored("not json").is_empty());
    }

    #[test]
    fn default_horizon_is_six_months_out() {
        assert_eq!(default_horizon(date(2025, 1, 15)), date(2025, 7, 15));
        assert_eq!(default_horizon(date(2025, 8, 31)), date(2026, 2, 28));
    }

    proptest! {
        #[test]
        fn generated_dates_are_exactly_the_matching_days(
            flags in proptest::collection::vec(any::<bool>(), 7),
            start_off in 0i64..2000,
            span in 0i64..90,
        ) {
            let mut set = WeekdaySet::empty();
            for (i, on) in flags.iter().enumerate() {
                if *on {
                    set.insert(ALL_DAYS[i]);
                }
            }
            let start = date(2020, 1, 1) + chrono::Duration::days(start_off);
            let end = start + chrono::Duration::days(span);
            let dates = occurrence_dates(&set, start, end);

            // ascending, no duplicates
            prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
            // exact membership over the range
            let mut expected = 0usize;
            let mut d = start;
            while d <= end {
                if set.contains(d.weekday()) {
                    prop_assert!(dates.contains(&d));
                    expected += 1;
                }
                d = d.succ_opt().unwrap();
            }
            prop_assert_eq!(dates.len(), expected);
            prop_assert!(dates.iter().all(|d| *d >= start && *d <= end && set.contains(d.weekday())));
        }
    }
}
