//! Read-only financial reporting over the append-only ledger.
//!
//! Revenue enters the ledger exclusively through
//! [`crate::scheduler::Scheduler::complete_appointment`]; expenses are
//! entered by the surrounding application. This module only aggregates
//! what is there.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::SchedulingResult;
use crate::records::{LedgerCategory, TransactionType};
use crate::store::{LedgerFilter, RecordStore};
use crate::types::{Money, Timestamp};

/// Revenue, expenses, and net result over a date range, with a
/// per-category expense breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    /// Total revenue in the range.
    pub revenue: Money,
    /// Total expenses in the range.
    pub expenses: Money,
    /// Revenue minus expenses, in cents; negative when the books are in
    /// the red.
    pub net_cents: i128,
    /// Expense totals per category.
    pub expense_breakdown: HashMap<LedgerCategory, Money>,
    /// Inclusive lower bound of the range, if any.
    pub from: Option<Timestamp>,
    /// Inclusive upper bound of the range, if any.
    pub to: Option<Timestamp>,
}

impl FinancialSummary {
    /// Whether the range closed at or above break-even.
    pub const fn is_profitable(&self) -> bool {
        self.net_cents >= 0
    }
}

/// Reporting facade over a record store's ledger entries.
pub struct LedgerReport<'a, S> {
    store: &'a S,
}

impl<'a, S: RecordStore> LedgerReport<'a, S> {
    /// Creates a report bound to a store.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn total(
        &self,
        transaction_type: TransactionType,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> SchedulingResult<Money> {
        let entries = self
            .store
            .ledger_entries(
                LedgerFilter::any()
                    .with_type(transaction_type)
                    .between(from, to),
            )
            .await?;
        Ok(entries
            .iter()
            .fold(Money::zero(), |acc, e| acc.saturating_add(e.amount)))
    }

    /// Total revenue in the inclusive range.
    pub async fn revenue_total(
        &self,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> SchedulingResult<Money> {
        self.total(TransactionType::Revenue, from, to).await
    }

    /// Total expenses in the inclusive range.
    pub async fn expense_total(
        &self,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> SchedulingResult<Money> {
        self.total(TransactionType::Expense, from, to).await
    }

    /// Expense totals per category in the inclusive range.
    pub async fn expense_breakdown(
        &self,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> SchedulingResult<HashMap<LedgerCategory, Money>> {
        let entries = self
            .store
            .ledger_entries(
                LedgerFilter::any()
                    .with_type(TransactionType::Expense)
                    .between(from, to),
            )
            .await?;
        let mut breakdown: HashMap<LedgerCategory, Money> = HashMap::new();
        for entry in entries {
            let slot = breakdown.entry(entry.category).or_insert_with(Money::zero);
            *slot = slot.saturating_add(entry.amount);
        }
        Ok(breakdown)
    }

    /// Complete summary: revenue, expenses, net result, and breakdown.
    pub async fn summary(
        &self,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> SchedulingResult<FinancialSummary> {
        let revenue = self.revenue_total(from, to).await?;
        let expenses = self.expense_total(from, to).await?;
        let expense_breakdown = self.expense_breakdown(from, to).await?;
        Ok(FinancialSummary {
            revenue,
            expenses,
            net_cents: i128::from(revenue.cents()) - i128::from(expenses.cents()),
            expense_breakdown,
            from,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_profitability_sign() {
        let black = FinancialSummary {
            revenue: Money::from_cents(10_000),
            expenses: Money::from_cents(4_000),
            net_cents: 6_000,
            expense_breakdown: HashMap::new(),
            from: None,
            to: None,
        };
        assert!(black.is_profitable());

        let red = FinancialSummary {
            net_cents: -1,
            ..black
        };
        assert!(!red.is_profitable());
    }
}
