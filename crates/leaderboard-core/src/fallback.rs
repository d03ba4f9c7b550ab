//! Demo data for the first days of a month
//!
//! Right after a month rolls over nobody has closed a contract yet, so the
//! current month's leaderboard is empty. For the first few days an empty
//! current-month leaderboard is replaced with a fixed illustrative dataset.
//! Every demo manager id starts with [`PLACEHOLDER_PREFIX`] so the
//! presentation layer can show a disclaimer.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::info;

use crate::constants::{PLACEHOLDER_PREFIX, ROLLOVER_DAYS};
use crate::leaderboard::{LeaderboardEntry, ManagerAggregate};

/// (name, office, total USD, contracts)
const DEMO_MANAGERS: [(&str, &str, f64, u32); 6] = [
    ("Alexander Petrov", "Moscow", 15_420.50, 12),
    ("Maria Sidorova", "Saint Petersburg", 12_350.75, 10),
    ("Dmitry Ivanov", "Moscow", 10_890.25, 8),
    ("Elena Kozlova", "Kazan", 9_540.00, 9),
    ("Sergey Novikov", "Yekaterinburg", 8_750.30, 7),
    ("Olga Morozova", "Novosibirsk", 7_230.80, 6),
];

/// Whether the rollover substitution applies: the leaderboard is empty, the
/// window starts in the same month as `now`, and `now` is within the first
/// [`ROLLOVER_DAYS`] days of that month.
pub fn should_substitute(
    leaderboard: &[LeaderboardEntry],
    window_start: NaiveDate,
    now: NaiveDateTime,
) -> bool {
    let today = now.date();
    leaderboard.is_empty()
        && window_start.year() == today.year()
        && window_start.month() == today.month()
        && today.day() <= ROLLOVER_DAYS
}

/// Replace an empty current-month leaderboard with the demo dataset during
/// month rollover; otherwise return the input unchanged.
pub fn apply_fallback(
    leaderboard: Vec<LeaderboardEntry>,
    window_start: NaiveDate,
    now: NaiveDateTime,
) -> Vec<LeaderboardEntry> {
    if !should_substitute(&leaderboard, window_start, now) {
        return leaderboard;
    }

    info!(day = now.day(), "no contracts yet this month, showing demo leaderboard");
    demo_leaderboard()
}

/// The fixed demo dataset, already ranked. Nobody in it is the current user.
pub fn demo_leaderboard() -> Vec<LeaderboardEntry> {
    DEMO_MANAGERS
        .iter()
        .enumerate()
        .map(|(i, &(name, office, total, count))| LeaderboardEntry {
            manager: ManagerAggregate {
                manager_id: format!("{}{}", PLACEHOLDER_PREFIX, i + 1),
                manager_name: name.to_string(),
                office_name: office.to_string(),
                total_commission_usd: total,
                contract_count: count,
            },
            rank: i as u32 + 1,
            is_current_user: false,
        })
        .collect()
}
