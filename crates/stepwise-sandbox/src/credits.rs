//! Per-principal credit balances.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
struct Account {
    balance: u64,
    /// Credits held by in-flight reservations.
    reserved: u64,
}

impl Account {
    fn available(&self) -> u64 {
        self.balance.saturating_sub(self.reserved)
    }
}

/// Credit balances keyed by principal. A principal is materialized with
/// `default_credits` the first time it is seen.
pub struct CreditLedger {
    default_credits: u64,
    accounts: Mutex<HashMap<String, Account>>,
}

impl CreditLedger {
    pub fn new(default_credits: u64) -> Self {
        Self {
            default_credits,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    fn with_account<R>(&self, principal: &str, f: impl FnOnce(&mut Account) -> R) -> R {
        let mut accounts = self.accounts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let account = accounts.entry(principal.to_string()).or_insert(Account {
            balance: self.default_credits,
            reserved: 0,
        });
        f(account)
    }

    /// Current balance, including credits held by in-flight reservations.
    pub fn balance(&self, principal: &str) -> u64 {
        self.with_account(principal, |a| a.balance)
    }

    /// Add `amount` credits and return the new balance.
    pub fn top_up(&self, principal: &str, amount: u64) -> u64 {
        self.with_account(principal, |a| {
            a.balance = a.balance.saturating_add(amount);
            a.balance
        })
    }

    pub fn set_balance(&self, principal: &str, amount: u64) {
        self.with_account(principal, |a| a.balance = amount);
    }

    /// Hold `cost` credits if the unreserved balance covers it.
    ///
    /// The held credits are deducted when the returned reservation is
    /// settled or dropped.
    pub fn reserve(&self, principal: &str, cost: u64) -> Option<Reservation<'_>> {
        let held = self.with_account(principal, |a| {
            if a.available() < cost {
                return false;
            }
            a.reserved += cost;
            true
        });
        held.then(|| Reservation {
            ledger: self,
            principal: principal.to_string(),
            cost,
        })
    }

    fn commit(&self, principal: &str, cost: u64) {
        let balance = self.with_account(principal, |a| {
            a.reserved = a.reserved.saturating_sub(cost);
            a.balance = a.balance.saturating_sub(cost);
            a.balance
        });
        debug!(principal_id = %principal, cost, balance, "credits deducted");
    }
}

/// Credits held for one tool attempt. Deducted exactly once, on drop.
#[must_use = "dropping a reservation deducts its credits immediately"]
pub struct Reservation<'a> {
    ledger: &'a CreditLedger,
    principal: String,
    cost: u64,
}

impl Reservation<'_> {
    /// Deduct the held credits and return the amount charged.
    pub fn settle(self) -> u64 {
        self.cost
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.ledger.commit(&self.principal, self.cost);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn balances_materialize_lazily() {
        let ledger = CreditLedger::new(100);
        assert_eq!(ledger.balance("alice"), 100);
        assert_eq!(ledger.top_up("alice", 5), 105);
        ledger.set_balance("bob", 3);
        assert_eq!(ledger.balance("bob"), 3);
    }

    #[test]
    fn reserve_then_settle_deducts_exactly_once() {
        let ledger = CreditLedger::new(10);
        let reservation = ledger.reserve("alice", 4).unwrap();
        assert_eq!(ledger.balance("alice"), 10);

        assert_eq!(reservation.settle(), 4);
        assert_eq!(ledger.balance("alice"), 6);
    }

    #[test]
    fn insufficient_credits_leave_balance_untouched() {
        let ledger = CreditLedger::new(2);
        assert!(ledger.reserve("alice", 5).is_none());
        assert_eq!(ledger.balance("alice"), 2);
    }

    /// Held credits are not available to a second caller.
    #[test]
    fn reservations_prevent_overspend() {
        let ledger = Arc::new(CreditLedger::new(10));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.reserve("alice", 3).map(|r| r.settle()))
            })
            .collect();

        let charged: u64 = handles.into_iter().filter_map(|h| h.join().unwrap()).sum();
        assert!(charged <= 10);
        assert_eq!(ledger.balance("alice"), 10 - charged);

        let held: Vec<_> = (0..4).filter_map(|_| ledger.reserve("bob", 3)).collect();
        assert_eq!(held.len(), 3);
        drop(held);
        assert_eq!(ledger.balance("bob"), 1);
    }
}
