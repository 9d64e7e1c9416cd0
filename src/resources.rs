use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Gold,
    Food,
    Wood,
    Stone,
    Iron,
    Tools,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::Gold,
        Resource::Food,
        Resource::Wood,
        Resource::Stone,
        Resource::Iron,
        Resource::Tools,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Gold => "gold",
            Resource::Food => "food",
            Resource::Wood => "wood",
            Resource::Stone => "stone",
            Resource::Iron => "iron",
            Resource::Tools => "tools",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ResourceMap = BTreeMap<Resource, f64>;

/// Multiplies every entry of `amounts` by `factor`.
pub fn scale(amounts: &ResourceMap, factor: f64) -> ResourceMap {
    amounts
        .iter()
        .map(|(kind, amount)| (*kind, amount * factor))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("insufficient {resource}: need {needed:.2}, have {held:.2}")]
    Insufficient {
        resource: Resource,
        needed: f64,
        held: f64,
    },
    #[error("invalid {resource} amount {amount}")]
    NonFinite { resource: Resource, amount: f64 },
}

/// Authoritative store of settlement stockpiles.
///
/// Only kinds registered at construction are tracked. Quantities never go
/// negative: debits are checked up front and credits clamp at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLedger {
    stock: ResourceMap,
    rates: ResourceMap,
}

impl ResourceLedger {
    pub fn new(kinds: impl IntoIterator<Item = Resource>) -> Self {
        let stock: ResourceMap = kinds.into_iter().map(|kind| (kind, 0.0)).collect();
        Self {
            rates: stock.clone(),
            stock,
        }
    }

    pub fn with_all_kinds() -> Self {
        Self::new(Resource::ALL)
    }

    pub fn is_known(&self, kind: Resource) -> bool {
        self.stock.contains_key(&kind)
    }

    pub fn amount(&self, kind: Resource) -> f64 {
        self.stock.get(&kind).copied().unwrap_or(0.0)
    }

    /// Adds every known kind in `amounts`. Negative amounts drain the entry down
    /// to zero at most; unknown kinds are skipped.
    pub fn credit(&mut self, amounts: &ResourceMap) {
        for (kind, amount) in amounts {
            if !amount.is_finite() {
                tracing::warn!(resource = %kind, amount, "ignoring non-finite credit");
                continue;
            }
            match self.stock.get_mut(kind) {
                Some(held) => *held = (*held + amount).max(0.0),
                None => {
                    tracing::warn!(resource = %kind, amount, "credit for untracked resource skipped")
                }
            }
        }
    }

    pub fn can_afford(&self, amounts: &ResourceMap) -> Result<(), LedgerError> {
        for (kind, needed) in amounts {
            if !needed.is_finite() {
                return Err(LedgerError::NonFinite {
                    resource: *kind,
                    amount: *needed,
                });
            }
            if *needed <= 0.0 {
                continue;
            }
            let held = self.amount(*kind);
            if held + EPS < *needed {
                return Err(LedgerError::Insufficient {
                    resource: *kind,
                    needed: *needed,
                    held,
                });
            }
        }
        Ok(())
    }

    /// All-or-nothing withdrawal.
    pub fn debit(&mut self, amounts: &ResourceMap) -> Result<(), LedgerError> {
        self.can_afford(amounts)?;
        for (kind, needed) in amounts {
            if *needed <= 0.0 {
                continue;
            }
            if let Some(held) = self.stock.get_mut(kind) {
                *held = (*held - needed).max(0.0);
            }
        }
        Ok(())
    }

    pub fn query(&self) -> ResourceMap {
        self.stock.clone()
    }

    pub fn set_production_rate(&mut self, kind: Resource, rate: f64) {
        if let Some(entry) = self.rates.get_mut(&kind) {
            *entry = rate;
        }
    }

    pub fn production_rates(&self) -> ResourceMap {
        self.rates.clone()
    }
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self::with_all_kinds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(Resource, f64)]) -> ResourceMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn debit_is_all_or_nothing() {
        let mut ledger = ResourceLedger::with_all_kinds();
        ledger.credit(&map(&[(Resource::Wood, 50.0), (Resource::Stone, 5.0)]));

        let err = ledger
            .debit(&map(&[(Resource::Wood, 20.0), (Resource::Stone, 10.0)]))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Insufficient {
                resource: Resource::Stone,
                ..
            }
        ));
        assert_eq!(ledger.amount(Resource::Wood), 50.0);
        assert_eq!(ledger.amount(Resource::Stone), 5.0);

        ledger
            .debit(&map(&[(Resource::Wood, 20.0), (Resource::Stone, 5.0)]))
            .unwrap();
        assert_eq!(ledger.amount(Resource::Wood), 30.0);
        assert_eq!(ledger.amount(Resource::Stone), 0.0);
    }

    #[test]
    fn non_finite_debit_is_rejected() {
        let mut ledger = ResourceLedger::with_all_kinds();
        ledger.credit(&map(&[(Resource::Wood, 100.0)]));
        for bad in [f64::NAN, f64::INFINITY] {
            let err = ledger.debit(&map(&[(Resource::Wood, bad)])).unwrap_err();
            assert!(matches!(
                err,
                LedgerError::NonFinite {
                    resource: Resource::Wood,
                    ..
                }
            ));
        }
        assert_eq!(ledger.amount(Resource::Wood), 100.0);
    }

    #[test]
    fn negative_credit_clamps_at_zero() {
        let mut ledger = ResourceLedger::with_all_kinds();
        ledger.credit(&map(&[(Resource::Food, 3.0)]));
        ledger.credit(&map(&[(Resource::Food, -10.0)]));
        assert_eq!(ledger.amount(Resource::Food), 0.0);
    }

    #[test]
    fn untracked_kinds_are_skipped() {
        let mut ledger = ResourceLedger::new([Resource::Food]);
        ledger.credit(&map(&[(Resource::Food, 4.0), (Resource::Iron, 9.0)]));
        assert_eq!(ledger.amount(Resource::Food), 4.0);
        assert!(!ledger.query().contains_key(&Resource::Iron));
        assert!(ledger.debit(&map(&[(Resource::Iron, 1.0)])).is_err());
    }

    #[test]
    fn entries_never_observed_negative() {
        let mut ledger = ResourceLedger::with_all_kinds();
        let steps = [
            (Resource::Gold, 10.0),
            (Resource::Gold, -3.3),
            (Resource::Wood, 0.1),
            (Resource::Gold, -7.0000001),
            (Resource::Wood, -0.3),
        ];
        for (kind, amount) in steps {
            ledger.credit(&map(&[(kind, amount)]));
            let _ = ledger.debit(&map(&[(kind, amount.abs() / 2.0)]));
            assert!(ledger.query().values().all(|v| *v >= 0.0));
        }
    }

    #[test]
    fn query_returns_a_copy() {
        let mut ledger = ResourceLedger::with_all_kinds();
        let mut view = ledger.query();
        view.insert(Resource::Gold, 1_000.0);
        assert_eq!(ledger.amount(Resource::Gold), 0.0);
        ledger.set_production_rate(Resource::Gold, 2.5);
        assert_eq!(ledger.production_rates()[&Resource::Gold], 2.5);
        assert_eq!(ledger.amount(Resource::Gold), 0.0);
    }
}
