//! End-to-end leaderboard computation
//!
//! aggregate -> rank -> merge current user -> month-rollover fallback

use chrono::NaiveDateTime;

use crate::contract::Contract;
use crate::fallback::apply_fallback;
use crate::leaderboard::{LeaderboardEntry, aggregate, merge, rank};
use crate::period::MonthWindow;
use crate::rates::ExchangeRateTable;

/// Everything one leaderboard computation depends on
pub struct LeaderboardInputs<'a> {
    pub contracts: &'a [Contract],
    pub rates: &'a ExchangeRateTable,
    pub current_user_id: Option<&'a str>,
    /// The current user's own stats, fetched separately. Ignored without
    /// `current_user_id`.
    pub current_user_stats: Option<LeaderboardEntry>,
    pub window: MonthWindow,
    pub now: NaiveDateTime,
}

/// Compute the ranked leaderboard for one window
pub fn build_leaderboard(inputs: LeaderboardInputs<'_>) -> Vec<LeaderboardEntry> {
    let ranked = rank(aggregate(inputs.contracts, inputs.rates), inputs.current_user_id);

    let merged = match inputs.current_user_id {
        Some(user_id) => merge(ranked, inputs.current_user_stats, user_id),
        None => ranked,
    };

    apply_fallback(merged, inputs.window.start_date(), inputs.now)
}
