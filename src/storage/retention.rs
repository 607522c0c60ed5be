use chrono::{Days, NaiveDate};
use tracing::debug;

use super::LogStore;

/// Oldest date kept when `retention_days` trailing days are retained.
pub fn cutoff_date(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(retention_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Drop day sections older than the retention window. Returns how many were
/// removed.
pub fn prune(store: &mut LogStore, today: NaiveDate, retention_days: u32) -> usize {
    let cutoff = cutoff_date(today, retention_days);
    let before = store.sections.len();

    store.sections.retain(|section| section.date >= cutoff);

    let removed = before - store.sections.len();
    if removed > 0 {
        debug!(removed, %cutoff, "pruned old log sections");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DaySection;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, day).unwrap()
    }

    fn store_with_days(days: &[u32]) -> LogStore {
        LogStore {
            preamble: String::new(),
            sections: days
                .iter()
                .map(|&d| DaySection {
                    date: date(d),
                    body: format!("entry {d}"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_cutoff_date() {
        assert_eq!(cutoff_date(date(31), 0), date(31));
        assert_eq!(cutoff_date(date(31), 30), date(1));
    }

    #[test]
    fn test_prune_keeps_window_inclusive() {
        let mut store = store_with_days(&[1, 20, 28, 29, 30, 31]);

        let removed = prune(&mut store, date(31), 3);

        assert_eq!(removed, 2);
        let kept: Vec<_> = store.sections.iter().map(|s| s.date).collect();
        assert_eq!(kept, vec![date(28), date(29), date(30), date(31)]);
    }

    #[test]
    fn test_zero_retention_keeps_only_today() {
        let mut store = store_with_days(&[29, 30, 31]);

        prune(&mut store, date(31), 0);

        assert_eq!(store.sections.len(), 1);
        assert_eq!(store.sections[0].date, date(31));
    }

    #[test]
    fn test_future_sections_survive() {
        let mut store = store_with_days(&[30, 31]);

        assert_eq!(prune(&mut store, date(30), 0), 0);
        assert_eq!(store.sections.len(), 2);
    }
}
