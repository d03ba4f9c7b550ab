//! Manager aggregation, ranking and merging
//!
//! Contracts fold into one [`ManagerAggregate`] per manager id, aggregates are
//! sorted and ranked into [`LeaderboardEntry`] values, and a separately
//! fetched current-user record can be spliced in without breaking the
//! one-entry-per-manager invariant.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::constants;
use crate::contract::Contract;
use crate::currency::normalize;
use crate::rates::ExchangeRateTable;

/// Running commission totals for one manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerAggregate {
    pub manager_id: String,
    pub manager_name: String,
    pub office_name: String,
    pub total_commission_usd: f64,
    pub contract_count: u32,
}

impl ManagerAggregate {
    fn new(manager_id: &str, manager_name: &str, office_name: String) -> Self {
        Self {
            manager_id: manager_id.to_string(),
            manager_name: manager_name.to_string(),
            office_name,
            total_commission_usd: 0.0,
            contract_count: 0,
        }
    }

    fn add(&mut self, commission_usd: f64) {
        self.total_commission_usd += commission_usd;
        self.contract_count += 1;
    }
}

/// A ranked manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(flatten)]
    pub manager: ManagerAggregate,
    /// 1-based position; 0 until the entry has been through a ranking pass
    pub rank: u32,
    pub is_current_user: bool,
}

impl LeaderboardEntry {
    pub fn manager_id(&self) -> &str {
        &self.manager.manager_id
    }

    pub fn total_commission_usd(&self) -> f64 {
        self.manager.total_commission_usd
    }

    /// Whether this entry belongs to the month-rollover demo dataset
    pub fn is_placeholder(&self) -> bool {
        self.manager.manager_id.starts_with(constants::PLACEHOLDER_PREFIX)
    }
}

/// Fold contracts into per-manager totals.
///
/// Contracts that do not earn commission or have no expanded creator are
/// skipped without trace. Output follows first-seen order; use [`rank`] for a
/// meaningful order.
pub fn aggregate(contracts: &[Contract], rates: &ExchangeRateTable) -> Vec<ManagerAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut managers: Vec<ManagerAggregate> = Vec::new();
    let mut skipped = 0usize;

    for contract in contracts {
        let Some(commission) = contract.commission() else {
            skipped += 1;
            continue;
        };
        let Some(creator) = &contract.creator else {
            skipped += 1;
            continue;
        };

        let commission_usd = normalize(commission, &contract.currency, rates).usd;

        let slot = *index.entry(contract.creator_id.as_str()).or_insert_with(|| {
            managers.push(ManagerAggregate::new(
                &contract.creator_id,
                &creator.name,
                contract.manager_office_name(),
            ));
            managers.len() - 1
        });
        managers[slot].add(commission_usd);
    }

    debug!(
        contracts = contracts.len(),
        skipped,
        managers = managers.len(),
        "aggregated contracts"
    );

    managers
}

/// Descending by USD total; equal totals ordered by manager id ascending
fn by_commission_desc(a: &ManagerAggregate, b: &ManagerAggregate) -> Ordering {
    b.total_commission_usd
        .total_cmp(&a.total_commission_usd)
        .then_with(|| a.manager_id.cmp(&b.manager_id))
}

/// Sort aggregates and assign 1-based ranks.
///
/// Ranks are sequential even for equal totals. `is_current_user` is set by
/// comparing against `current_user_id`, and is false everywhere when no id is
/// given.
pub fn rank(
    mut aggregates: Vec<ManagerAggregate>,
    current_user_id: Option<&str>,
) -> Vec<LeaderboardEntry> {
    aggregates.sort_by(by_commission_desc);

    aggregates
        .into_iter()
        .enumerate()
        .map(|(position, manager)| {
            let is_current_user = current_user_id.is_some_and(|id| manager.manager_id == id);
            LeaderboardEntry {
                manager,
                rank: position as u32 + 1,
                is_current_user,
            }
        })
        .collect()
}

/// Splice the current user's own stats into a ranked leaderboard.
///
/// Without stats the base leaderboard is returned untouched. Otherwise the
/// stats are appended, duplicates by manager id are dropped keeping the
/// first occurrence (so a base entry wins over the appended one), and the
/// whole list is re-sorted, re-ranked and re-flagged against
/// `current_user_id`.
pub fn merge(
    base: Vec<LeaderboardEntry>,
    current_user_stats: Option<LeaderboardEntry>,
    current_user_id: &str,
) -> Vec<LeaderboardEntry> {
    let Some(stats) = current_user_stats else {
        return base;
    };

    let mut seen: HashSet<String> = HashSet::new();
    let unique: Vec<ManagerAggregate> = base
        .into_iter()
        .chain(std::iter::once(stats))
        .filter(|entry| seen.insert(entry.manager.manager_id.clone()))
        .map(|entry| entry.manager)
        .collect();

    rank(unique, Some(current_user_id))
}

/// Build the current user's own leaderboard record from their contracts.
///
/// Always produces an entry, even with no contracts, so the user can be shown
/// with a zero total. The creator relation is not required here since every
/// contract is already known to belong to `user_id`.
pub fn user_stats(
    user_id: &str,
    contracts: &[Contract],
    rates: &ExchangeRateTable,
    fallback_name: Option<&str>,
    fallback_office: Option<&str>,
) -> LeaderboardEntry {
    let mut totals = ManagerAggregate::new(user_id, "", String::new());

    for contract in contracts {
        if let Some(commission) = contract.commission() {
            totals.add(normalize(commission, &contract.currency, rates).usd);
        }
    }

    let first = contracts.first();

    let creator_name = first
        .and_then(|c| c.creator.as_ref())
        .map(|creator| creator.name.as_str());

    totals.manager_name = [creator_name, fallback_name]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .unwrap_or(constants::DEFAULT_USER_NAME)
        .to_string();

    totals.office_name = match first.map(Contract::manager_office_name) {
        Some(office) if office != constants::NO_OFFICE_LABEL => office,
        _ => fallback_office
            .filter(|office| !office.is_empty())
            .unwrap_or(constants::NO_OFFICE_LABEL)
            .to_string(),
    };

    LeaderboardEntry {
        manager: totals,
        rank: 0,
        is_current_user: true,
    }
}

/// The current user's entry when they are outside the podium
pub fn current_user_card(leaderboard: &[LeaderboardEntry]) -> Option<&LeaderboardEntry> {
    let on_podium = leaderboard
        .iter()
        .take(constants::PODIUM_SIZE)
        .any(|entry| entry.is_current_user);

    if on_podium {
        return None;
    }
    leaderboard.iter().find(|entry| entry.is_current_user)
}

/// Whether any entry comes from the demo dataset
pub fn contains_placeholder(leaderboard: &[LeaderboardEntry]) -> bool {
    leaderboard.iter().any(LeaderboardEntry::is_placeholder)
}

/// Medal for podium ranks
pub fn medal(rank: u32) -> Option<&'static str> {
    match rank {
        1 => Some("🥇"),
        2 => Some("🥈"),
        3 => Some("🥉"),
        _ => None,
    }
}

pub fn motivation(rank: u32) -> &'static str {
    match rank {
        1 => "Champion!",
        2 => "Almost there!",
        3 => "Great job!",
        4 | 5 => "Top 5!",
        _ => "Keep going!",
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn entry(id: &str, total: f64, count: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            manager: ManagerAggregate {
                manager_id: id.to_string(),
                manager_name: format!("Manager {}", id),
                office_name: "Bishkek".to_string(),
                total_commission_usd: total,
                contract_count: count,
            },
            rank: 0,
            is_current_user: false,
        }
    }
}
