//! Jurisdiction Rule Sets
//!
//! Fiscal parameters per supported jurisdiction: holding-period
//! threshold, rate schedule, loss carryforward, permitted accounting
//! methods, fee treatment, and reportable-transaction criteria.

use crate::error::ComplianceError;
use crate::types::{AccountingMethod, TxType};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported jurisdictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Jurisdiction {
    Es,
    De,
    Fr,
    It,
    Gb,
    Nl,
    Be,
    At,
    Ch,
    Us,
}

impl std::fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Jurisdiction::Es => "ES",
            Jurisdiction::De => "DE",
            Jurisdiction::Fr => "FR",
            Jurisdiction::It => "IT",
            Jurisdiction::Gb => "GB",
            Jurisdiction::Nl => "NL",
            Jurisdiction::Be => "BE",
            Jurisdiction::At => "AT",
            Jurisdiction::Ch => "CH",
            Jurisdiction::Us => "US",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Jurisdiction {
    type Err = ComplianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ES" => Ok(Jurisdiction::Es),
            "DE" => Ok(Jurisdiction::De),
            "FR" => Ok(Jurisdiction::Fr),
            "IT" => Ok(Jurisdiction::It),
            "GB" | "UK" => Ok(Jurisdiction::Gb),
            "NL" => Ok(Jurisdiction::Nl),
            "BE" => Ok(Jurisdiction::Be),
            "AT" => Ok(Jurisdiction::At),
            "CH" => Ok(Jurisdiction::Ch),
            "US" => Ok(Jurisdiction::Us),
            other => Err(ComplianceError::InvalidJurisdiction(other.to_string())),
        }
    }
}

/// How transaction fees interact with cost basis. Jurisdiction-
/// configurable; never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeePolicy {
    /// Disposal fees are allocated pro-rata across the gain events the
    /// disposal produces, reducing proceeds
    #[default]
    ReduceProceedsAtDisposal,
    /// Acquisition fees raise the lot's unit cost; disposal fees do not
    /// reduce gains
    CapitalizeIntoBasis,
}

/// What to do when a disposal exceeds recorded inventory. Explicit
/// engine configuration; the core never silently fabricates cost basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsufficientInventoryPolicy {
    /// Surface `InsufficientInventory` and abort the computation
    #[default]
    Reject,
    /// Cover the deficit with a zero-cost synthetic lot, flag the
    /// resulting events, and record a warning on the report
    SyntheticZeroBasis,
}

/// Replay-time configuration for the lot inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReplayPolicy {
    pub fee_policy: FeePolicy,
    pub insufficient_inventory: InsufficientInventoryPolicy,
}

/// Fiscal rules for one jurisdiction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionRuleSet {
    pub jurisdiction: Jurisdiction,
    /// Days a lot must be held, strictly exceeded, for long-term
    /// treatment
    pub long_term_threshold_days: i64,
    pub short_term_rate: Decimal,
    pub long_term_rate: Decimal,
    /// Whether a negative short-term aggregate may offset the long-term
    /// bucket before tax
    pub loss_carryforward: bool,
    pub allowed_methods: Vec<AccountingMethod>,
    pub fee_policy: FeePolicy,
    /// Transaction types subject to cross-border regulatory reporting
    pub reportable_types: Vec<TxType>,
    /// Minimum fiat notional for a transaction to be reportable
    pub reportable_threshold: Decimal,
    /// Exchange ids considered domestic for cross-border classification
    pub domestic_exchange_ids: Vec<String>,
}

impl JurisdictionRuleSet {
    /// Spain: flat savings-income rate, no holding-period distinction,
    /// FIFO mandated
    pub fn es() -> Self {
        Self {
            jurisdiction: Jurisdiction::Es,
            long_term_threshold_days: 0,
            short_term_rate: dec!(0.19),
            long_term_rate: dec!(0.19),
            loss_carryforward: true,
            allowed_methods: vec![AccountingMethod::Fifo],
            fee_policy: FeePolicy::ReduceProceedsAtDisposal,
            reportable_types: vec![TxType::Sell, TxType::Transfer, TxType::Reward],
            reportable_threshold: Decimal::ZERO,
            domestic_exchange_ids: vec!["bit2me".to_string(), "criptan".to_string()],
        }
    }

    /// Germany: private-sale exemption after one year, per-source FIFO
    /// accepted
    pub fn de() -> Self {
        Self {
            jurisdiction: Jurisdiction::De,
            long_term_threshold_days: 365,
            short_term_rate: dec!(0.42),
            long_term_rate: Decimal::ZERO,
            loss_carryforward: true,
            allowed_methods: vec![AccountingMethod::Fifo, AccountingMethod::SpecificSource],
            fee_policy: FeePolicy::ReduceProceedsAtDisposal,
            reportable_types: vec![TxType::Sell, TxType::Transfer, TxType::Reward],
            reportable_threshold: Decimal::ZERO,
            domestic_exchange_ids: vec!["bison".to_string(), "bitpanda-de".to_string()],
        }
    }

    /// France: flat PFU rate, no holding-period distinction
    pub fn fr() -> Self {
        Self {
            jurisdiction: Jurisdiction::Fr,
            long_term_threshold_days: 0,
            short_term_rate: dec!(0.30),
            long_term_rate: dec!(0.30),
            loss_carryforward: false,
            allowed_methods: vec![AccountingMethod::Fifo],
            fee_policy: FeePolicy::CapitalizeIntoBasis,
            reportable_types: vec![TxType::Sell, TxType::Transfer, TxType::Reward],
            reportable_threshold: Decimal::ZERO,
            domestic_exchange_ids: vec!["paymium".to_string(), "coinhouse".to_string()],
        }
    }

    /// United Kingdom: flat CGT rate, no holding-period distinction
    pub fn gb() -> Self {
        Self {
            jurisdiction: Jurisdiction::Gb,
            long_term_threshold_days: 0,
            short_term_rate: dec!(0.20),
            long_term_rate: dec!(0.20),
            loss_carryforward: true,
            allowed_methods: vec![AccountingMethod::Fifo],
            fee_policy: FeePolicy::ReduceProceedsAtDisposal,
            reportable_types: vec![TxType::Sell, TxType::Transfer],
            reportable_threshold: Decimal::ZERO,
            domestic_exchange_ids: vec!["coinfloor".to_string()],
        }
    }

    /// United States: one-year threshold, every method including
    /// specific identification; no DAC8-style reporting
    pub fn us() -> Self {
        Self {
            jurisdiction: Jurisdiction::Us,
            long_term_threshold_days: 365,
            short_term_rate: dec!(0.37),
            long_term_rate: dec!(0.20),
            loss_carryforward: true,
            allowed_methods: AccountingMethod::ALL.to_vec(),
            fee_policy: FeePolicy::ReduceProceedsAtDisposal,
            reportable_types: Vec::new(),
            reportable_threshold: Decimal::ZERO,
            domestic_exchange_ids: vec!["coinbase".to_string(), "kraken".to_string()],
        }
    }

    /// Get rules for any supported jurisdiction. Codes without a bespoke
    /// preset share the EU default schedule.
    pub fn for_jurisdiction(jurisdiction: Jurisdiction) -> Self {
        match jurisdiction {
            Jurisdiction::Es => Self::es(),
            Jurisdiction::De => Self::de(),
            Jurisdiction::Fr => Self::fr(),
            Jurisdiction::Gb => Self::gb(),
            Jurisdiction::Us => Self::us(),
            Jurisdiction::It
            | Jurisdiction::Nl
            | Jurisdiction::Be
            | Jurisdiction::At
            | Jurisdiction::Ch => Self::eu_default(jurisdiction),
        }
    }

    fn eu_default(jurisdiction: Jurisdiction) -> Self {
        Self {
            jurisdiction,
            long_term_threshold_days: 365,
            short_term_rate: dec!(0.26),
            long_term_rate: dec!(0.26),
            loss_carryforward: true,
            allowed_methods: vec![AccountingMethod::Fifo],
            fee_policy: FeePolicy::ReduceProceedsAtDisposal,
            reportable_types: vec![TxType::Sell, TxType::Transfer, TxType::Reward],
            reportable_threshold: Decimal::ZERO,
            domestic_exchange_ids: Vec::new(),
        }
    }

    /// Whether the given accounting method is permitted here
    pub fn allows_method(&self, method: AccountingMethod) -> bool {
        self.allowed_methods.contains(&method)
    }

    /// Default replay policy for this jurisdiction. Insufficient
    /// inventory handling stays `Reject` unless the caller opts in to
    /// synthetic basis.
    pub fn replay_policy(&self) -> ReplayPolicy {
        ReplayPolicy {
            fee_policy: self.fee_policy,
            insufficient_inventory: InsufficientInventoryPolicy::Reject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jurisdiction_parsing() {
        assert_eq!("es".parse::<Jurisdiction>().unwrap(), Jurisdiction::Es);
        assert_eq!("UK".parse::<Jurisdiction>().unwrap(), Jurisdiction::Gb);
        assert!(matches!(
            "XX".parse::<Jurisdiction>(),
            Err(ComplianceError::InvalidJurisdiction(_))
        ));
    }

    #[test]
    fn test_spain_mandates_fifo() {
        let rules = JurisdictionRuleSet::es();
        assert!(rules.allows_method(AccountingMethod::Fifo));
        assert!(!rules.allows_method(AccountingMethod::Hifo));
    }

    #[test]
    fn test_every_jurisdiction_has_rules() {
        for j in [
            Jurisdiction::Es,
            Jurisdiction::De,
            Jurisdiction::Fr,
            Jurisdiction::It,
            Jurisdiction::Gb,
            Jurisdiction::Nl,
            Jurisdiction::Be,
            Jurisdiction::At,
            Jurisdiction::Ch,
            Jurisdiction::Us,
        ] {
            let rules = JurisdictionRuleSet::for_jurisdiction(j);
            assert_eq!(rules.jurisdiction, j);
            assert!(!rules.allowed_methods.is_empty());
        }
    }

    #[test]
    fn test_germany_long_term_exemption() {
        let rules = JurisdictionRuleSet::de();
        assert_eq!(rules.long_term_threshold_days, 365);
        assert_eq!(rules.long_term_rate, Decimal::ZERO);
    }
}
