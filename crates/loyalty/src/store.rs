//! In-memory account store. Each map entry holds the account together with
//! its ledger, so a balance mutation and its ledger append commit under one
//! entry guard — the per-account atomic unit the engine relies on.
//! Operations on different accounts never contend beyond shard locking.

use dashmap::DashMap;
use voyage_core::loyalty::{LedgerEntry, LoyaltyAccount};

/// An account and its append-only ledger, locked as one unit.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub account: LoyaltyAccount,
    pub ledger: Vec<LedgerEntry>,
}

impl AccountRecord {
    fn new(owner_id: &str) -> Self {
        Self {
            account: LoyaltyAccount::new(owner_id),
            ledger: Vec::new(),
        }
    }
}

/// Keyed store of loyalty accounts. Accounts are created lazily on first
/// touch; enrollment is implicit.
#[derive(Default)]
pub struct AccountStore {
    records: DashMap<String, AccountRecord>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Run `f` against the owner's record under its entry guard, creating a
    /// fresh zero-balance record if absent. The guard is held for the whole
    /// closure, so the read-modify-write is serialized per account.
    pub fn with<R>(&self, owner_id: &str, f: impl FnOnce(&mut AccountRecord) -> R) -> R {
        let mut entry = self
            .records
            .entry(owner_id.to_string())
            .or_insert_with(|| AccountRecord::new(owner_id));
        f(entry.value_mut())
    }

    /// Snapshot of an account, if one has been created.
    pub fn account(&self, owner_id: &str) -> Option<LoyaltyAccount> {
        self.records.get(owner_id).map(|r| r.account.clone())
    }

    /// Ledger snapshot, newest entry first.
    pub fn ledger(&self, owner_id: &str) -> Vec<LedgerEntry> {
        let mut entries = self
            .records
            .get(owner_id)
            .map(|r| r.ledger.clone())
            .unwrap_or_default();
        entries.reverse();
        entries
    }

    pub fn contains(&self, owner_id: &str) -> bool {
        self.records.contains_key(owner_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_core::loyalty::TransactionKind;

    #[test]
    fn test_lazy_creation_on_first_touch() {
        let store = AccountStore::new();
        assert!(!store.contains("u1"));

        let balance = store.with("u1", |rec| rec.account.balance);
        assert_eq!(balance, 0);
        assert!(store.contains("u1"));
    }

    #[test]
    fn test_mutation_and_append_commit_together() {
        let store = AccountStore::new();
        store.with("u1", |rec| {
            rec.account.balance += 100;
            rec.account.lifetime_earned += 100;
            rec.ledger.push(LedgerEntry::new(
                "u1",
                TransactionKind::Earn,
                100,
                Some("r1".into()),
                "earn",
            ));
        });

        let account = store.account("u1").unwrap();
        assert_eq!(account.balance, 100);
        assert_eq!(store.ledger("u1").len(), 1);
    }

    #[test]
    fn test_ledger_newest_first() {
        let store = AccountStore::new();
        store.with("u1", |rec| {
            rec.ledger.push(LedgerEntry::new(
                "u1",
                TransactionKind::Earn,
                100,
                None,
                "first",
            ));
            rec.ledger.push(LedgerEntry::new(
                "u1",
                TransactionKind::Redeem,
                -50,
                None,
                "second",
            ));
        });

        let ledger = store.ledger("u1");
        assert_eq!(ledger[0].description, "second");
        assert_eq!(ledger[1].description, "first");
    }
}
