//! Exchange-rate table and rate resolution
//!
//! The rate provider returns a JSON object keyed by currency code. Each value
//! is either a plain number or an object with `buy`/`sell` quotes (and
//! occasionally other fields). Resolution never fails: anything that cannot
//! be read as a usable rate resolves to 1, which turns the conversion into a
//! no-op instead of aborting the whole leaderboard.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Rate used when a currency is missing or its value is unreadable
pub const FALLBACK_RATE: f64 = 1.0;

/// A single entry of the rate table as the provider sends it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RateValue {
    /// Plain numeric rate
    Plain(f64),
    /// Structured quote, e.g. `{"buy": 89.5, "sell": 91.0}`. Key order is
    /// preserved so "first value" means first in the document.
    Quote(Map<String, Value>),
    /// Anything else (strings, nulls, arrays)
    Unsupported(Value),
}

impl RateValue {
    /// Resolve to a number.
    ///
    /// Plain numbers are used as-is. Quotes prefer a non-zero `buy`, then a
    /// non-zero `sell`, then the first non-zero numeric value, then 1.
    pub fn resolve(&self) -> f64 {
        match self {
            RateValue::Plain(rate) => *rate,
            RateValue::Quote(fields) => usable(fields.get("buy"))
                .or_else(|| usable(fields.get("sell")))
                .or_else(|| usable(fields.values().next()))
                .unwrap_or(FALLBACK_RATE),
            RateValue::Unsupported(_) => FALLBACK_RATE,
        }
    }
}

/// A quote field counts only when it is a non-zero number
fn usable(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|rate| *rate != 0.0 && !rate.is_nan())
}

/// Currency code -> rate, as returned by the rate provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRateTable {
    rates: HashMap<String, RateValue>,
}

impl ExchangeRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, currency: impl Into<String>, value: RateValue) {
        self.rates.insert(currency.into(), value);
    }

    pub fn get(&self, currency: &str) -> Option<&RateValue> {
        self.rates.get(currency)
    }

    /// Resolved rate for a currency code. Total: missing codes resolve to 1.
    pub fn rate(&self, currency: &str) -> f64 {
        self.rates
            .get(currency)
            .map(RateValue::resolve)
            .unwrap_or(FALLBACK_RATE)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Currency codes in alphabetical order
    pub fn currencies(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.rates.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ExchangeRateTable {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            rates: iter
                .into_iter()
                .map(|(code, rate)| (code.into(), RateValue::Plain(rate)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(value: Value) -> ExchangeRateTable {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_number_used_as_is() {
        let rates = table(json!({ "RUB": 90.5 }));
        assert_eq!(rates.rate("RUB"), 90.5);
    }

    #[test]
    fn test_quote_prefers_buy() {
        let rates = table(json!({ "KZT": { "sell": 455.0, "buy": 450.0 } }));
        assert_eq!(rates.rate("KZT"), 450.0);
    }

    #[test]
    fn test_quote_falls_back_to_sell() {
        let rates = table(json!({ "KGS": { "sell": 87.4 } }));
        assert_eq!(rates.rate("KGS"), 87.4);

        // Zero buy is not a usable quote
        let rates = table(json!({ "KGS": { "buy": 0, "sell": 87.4 } }));
        assert_eq!(rates.rate("KGS"), 87.4);
    }

    #[test]
    fn test_quote_falls_back_to_first_value_in_document_order() {
        let rates = table(json!({ "EUR": { "mid": 0.92, "close": 0.95 } }));
        assert_eq!(rates.rate("EUR"), 0.92);
    }

    #[test]
    fn test_unreadable_rates_resolve_to_one() {
        let rates = table(json!({
            "EUR": {},
            "RUB": "ninety",
            "KGS": null,
            "KZT": { "note": "stale" },
        }));
        assert_eq!(rates.rate("EUR"), 1.0);
        assert_eq!(rates.rate("RUB"), 1.0);
        assert_eq!(rates.rate("KGS"), 1.0);
        assert_eq!(rates.rate("KZT"), 1.0);
        assert_eq!(rates.rate("CNY"), 1.0);
    }

    #[test]
    fn test_from_iter_and_currencies() {
        let rates: ExchangeRateTable = [("RUB", 90.0), ("EUR", 0.9)].into_iter().collect();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates.currencies(), vec!["EUR", "RUB"]);
    }

    #[test]
    fn test_round_trips_through_json_for_caching() {
        let rates = table(json!({ "EUR": 0.9, "RUB": { "buy": 89.0, "sell": 91.0 } }));
        let text = serde_json::to_string(&rates).unwrap();
        let restored: ExchangeRateTable = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, rates);
    }
}
