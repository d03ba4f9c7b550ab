//! Commission leaderboard engine
//!
//! Turns a batch of contracts plus an exchange-rate table into a ranked,
//! de-duplicated leaderboard of managers. Everything here is synchronous and
//! side-effect free: callers fetch the inputs, this crate only computes.

pub mod constants;
pub mod contract;
pub mod currency;
pub mod fallback;
pub mod leaderboard;
pub mod offices;
pub mod period;
pub mod pipeline;
pub mod rates;

pub use contract::{Contract, Creator};
pub use currency::{CommissionInCurrencies, Currency, normalize};
pub use fallback::apply_fallback;
pub use leaderboard::{LeaderboardEntry, ManagerAggregate, aggregate, merge, rank, user_stats};
pub use offices::{OfficeAggregate, OfficeLeaderboardEntry, aggregate_offices, rank_offices};
pub use period::MonthWindow;
pub use pipeline::{LeaderboardInputs, build_leaderboard};
pub use rates::{ExchangeRateTable, RateValue};
