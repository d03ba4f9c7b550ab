//! Contract records and per-contract commission
//!
//! Contracts arrive with their relations already expanded by the fetch layer:
//! the creating manager, the manager's office, and the contract's own office.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Manager who created a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
    /// Office expanded on the manager record itself
    pub office_name: Option<String>,
}

/// A sales contract as delivered by the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub office_id: String,
    /// Name of the office the contract was booked under
    pub office_name: Option<String>,
    /// Manager id (aggregation key)
    pub creator_id: String,
    /// Expanded manager relation. `None` means the contract cannot be attributed.
    pub creator: Option<Creator>,
    /// Office expanded through the creator relation (`created_by.office`)
    pub creator_office_name: Option<String>,
    pub gross_price: Option<f64>,
    pub net_price: Option<f64>,
    /// Native currency code, e.g. "USD", "RUB"
    pub currency: String,
    pub is_deleted: bool,
    /// Creation timestamp as stored upstream
    pub created_at: String,
}

impl Contract {
    /// Commission in the contract's native currency, or `None` when the
    /// contract does not count.
    ///
    /// Commission is gross minus net. A contract without a strictly positive
    /// net price, or one flagged as deleted, contributes nothing.
    pub fn commission(&self) -> Option<f64> {
        if self.is_deleted {
            return None;
        }
        let net = self.net_price.filter(|net| *net > 0.0)?;
        Some(self.gross_price.unwrap_or(0.0) - net)
    }

    /// Office to credit the manager with: the `created_by.office` relation,
    /// then the manager's own office, then the "No office" label.
    pub fn manager_office_name(&self) -> String {
        let manager_office = self.creator.as_ref().and_then(|c| c.office_name.as_deref());

        [self.creator_office_name.as_deref(), manager_office]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .unwrap_or(constants::NO_OFFICE_LABEL)
            .to_string()
    }

    /// Office the contract itself was booked under
    pub fn booked_office_name(&self) -> String {
        self.office_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(constants::NO_OFFICE_LABEL)
            .to_string()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// USD contract by `creator` with the creator relation expanded
    pub fn contract(id: &str, creator: &str, net: Option<f64>, gross: Option<f64>) -> Contract {
        Contract {
            id: id.to_string(),
            office_id: "office-1".to_string(),
            office_name: Some("Bishkek".to_string()),
            creator_id: creator.to_string(),
            creator: Some(Creator {
                name: format!("Manager {}", creator),
                office_name: Some("Bishkek".to_string()),
            }),
            creator_office_name: None,
            gross_price: gross,
            net_price: net,
            currency: "USD".to_string(),
            is_deleted: false,
            created_at: "2025-03-05 10:00:00.000Z".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::contract;
    use super::*;

    #[test]
    fn test_commission_is_gross_minus_net() {
        assert_eq!(contract("c1", "A", Some(100.0), Some(150.0)).commission(), Some(50.0));
    }

    #[test]
    fn test_missing_gross_counts_as_zero() {
        assert_eq!(contract("c1", "A", Some(100.0), None).commission(), Some(-100.0));
    }

    #[test]
    fn test_non_positive_or_missing_net_excluded() {
        assert_eq!(contract("c1", "A", Some(0.0), Some(50.0)).commission(), None);
        assert_eq!(contract("c1", "A", Some(-10.0), Some(50.0)).commission(), None);
        assert_eq!(contract("c1", "A", None, Some(50.0)).commission(), None);
    }

    #[test]
    fn test_deleted_contract_excluded() {
        let mut c = contract("c1", "A", Some(100.0), Some(150.0));
        c.is_deleted = true;
        assert_eq!(c.commission(), None);
    }

    #[test]
    fn test_manager_office_resolution_order() {
        let mut c = contract("c1", "A", Some(100.0), Some(150.0));
        c.creator_office_name = Some("Almaty".to_string());
        assert_eq!(c.manager_office_name(), "Almaty");

        c.creator_office_name = Some(String::new());
        assert_eq!(c.manager_office_name(), "Bishkek");

        c.creator_office_name = None;
        assert_eq!(c.manager_office_name(), "Bishkek");

        c.creator = Some(Creator {
            name: "A".to_string(),
            office_name: None,
        });
        assert_eq!(c.manager_office_name(), "No office");
    }

    #[test]
    fn test_booked_office_falls_back_to_label() {
        let mut c = contract("c1", "A", Some(100.0), Some(150.0));
        assert_eq!(c.booked_office_name(), "Bishkek");
        c.office_name = None;
        assert_eq!(c.booked_office_name(), "No office");
    }
}
