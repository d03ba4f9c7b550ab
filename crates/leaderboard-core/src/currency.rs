//! Commission conversion into the display currencies
//!
//! The provider quotes each pair in its own direction: the EUR figure is the
//! USD amount divided by the EUR rate, while RUB, KGS and KZT are the USD
//! amount multiplied by theirs. Native amounts in any other currency are
//! divided by that currency's rate to reach USD first.

use serde::{Deserialize, Serialize};

use crate::rates::ExchangeRateTable;

/// Currencies a commission is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Rub,
    Kgs,
    Kzt,
}

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Rub,
        Currency::Kgs,
        Currency::Kzt,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Rub => "RUB",
            Currency::Kgs => "KGS",
            Currency::Kzt => "KZT",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One contract's commission expressed in every display currency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionInCurrencies {
    pub usd: f64,
    pub eur: f64,
    pub rub: f64,
    pub kgs: f64,
    pub kzt: f64,
}

impl CommissionInCurrencies {
    pub fn get(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => self.usd,
            Currency::Eur => self.eur,
            Currency::Rub => self.rub,
            Currency::Kgs => self.kgs,
            Currency::Kzt => self.kzt,
        }
    }
}

/// Convert a raw commission in `native_currency` into every display currency.
///
/// Never fails: unknown or malformed rates resolve to 1.
pub fn normalize(
    raw_commission: f64,
    native_currency: &str,
    rates: &ExchangeRateTable,
) -> CommissionInCurrencies {
    let usd = if native_currency == Currency::Usd.code() {
        raw_commission
    } else {
        raw_commission / rates.rate(native_currency)
    };

    CommissionInCurrencies {
        usd,
        eur: usd / rates.rate(Currency::Eur.code()),
        rub: usd * rates.rate(Currency::Rub.code()),
        kgs: usd * rates.rate(Currency::Kgs.code()),
        kzt: usd * rates.rate(Currency::Kzt.code()),
    }
}
