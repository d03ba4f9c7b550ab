//! Office-level leaderboard
//!
//! Same folding and ranking rules as the manager leaderboard, keyed by the
//! office a contract was booked under.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::contract::Contract;
use crate::currency::normalize;
use crate::rates::ExchangeRateTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeAggregate {
    pub office_id: String,
    pub office_name: String,
    pub total_commission_usd: f64,
    pub contract_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeLeaderboardEntry {
    #[serde(flatten)]
    pub office: OfficeAggregate,
    pub rank: u32,
    pub is_current_office: bool,
}

/// Fold contracts into per-office totals, in first-seen order
pub fn aggregate_offices(contracts: &[Contract], rates: &ExchangeRateTable) -> Vec<OfficeAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut offices: Vec<OfficeAggregate> = Vec::new();

    for contract in contracts {
        let Some(commission) = contract.commission() else {
            continue;
        };
        let commission_usd = normalize(commission, &contract.currency, rates).usd;

        let slot = *index.entry(contract.office_id.as_str()).or_insert_with(|| {
            offices.push(OfficeAggregate {
                office_id: contract.office_id.clone(),
                office_name: contract.booked_office_name(),
                total_commission_usd: 0.0,
                contract_count: 0,
            });
            offices.len() - 1
        });

        let office = &mut offices[slot];
        office.total_commission_usd += commission_usd;
        office.contract_count += 1;
    }

    offices
}

/// Sort descending by USD total (office id ascending on ties) and assign
/// sequential 1-based ranks
pub fn rank_offices(
    mut aggregates: Vec<OfficeAggregate>,
    current_office_id: Option<&str>,
) -> Vec<OfficeLeaderboardEntry> {
    aggregates.sort_by(|a, b| {
        b.total_commission_usd
            .total_cmp(&a.total_commission_usd)
            .then_with(|| a.office_id.cmp(&b.office_id))
    });

    aggregates
        .into_iter()
        .enumerate()
        .map(|(position, office)| {
            let is_current_office = current_office_id.is_some_and(|id| office.office_id == id);
            OfficeLeaderboardEntry {
                office,
                rank: position as u32 + 1,
                is_current_office,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::fixtures::contract;

    fn booked(id: &str, office_id: &str, office: Option<&str>, net: f64, gross: f64) -> Contract {
        let mut c = contract(id, "A", Some(net), Some(gross));
        c.office_id = office_id.to_string();
        c.office_name = office.map(str::to_string);
        c
    }

    #[test]
    fn test_offices_aggregate_and_rank() {
        let contracts = vec![
            booked("c1", "o-osh", Some("Osh"), 100.0, 130.0),
            booked("c2", "o-bishkek", Some("Bishkek"), 100.0, 150.0),
            booked("c3", "o-osh", Some("Osh"), 100.0, 130.0),
            booked("c4", "o-osh", Some("Osh"), 0.0, 900.0),
            booked("c5", "o-none", None, 10.0, 20.0),
        ];
        let rates = ExchangeRateTable::new();

        let ranked = rank_offices(aggregate_offices(&contracts, &rates), Some("o-bishkek"));
        let ids: Vec<&str> = ranked.iter().map(|e| e.office.office_id.as_str()).collect();
        assert_eq!(ids, vec!["o-osh", "o-bishkek", "o-none"]);

        assert_eq!(ranked[0].office.total_commission_usd, 60.0);
        assert_eq!(ranked[0].office.contract_count, 2);
        assert_eq!(ranked[2].office.office_name, "No office");
        assert!(ranked[1].is_current_office);
        assert!(!ranked[0].is_current_office);
        assert_eq!(ranked.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_office_ties_broken_by_id() {
        let contracts = vec![
            booked("c1", "o-b", Some("B"), 1.0, 11.0),
            booked("c2", "o-a", Some("A"), 1.0, 11.0),
        ];
        let ranked = rank_offices(aggregate_offices(&contracts, &ExchangeRateTable::new()), None);
        assert_eq!(ranked[0].office.office_id, "o-a");
        assert!(ranked.iter().all(|e| !e.is_current_office));
    }
}
