//! Borrowing transaction model

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::timestamp;
use crate::config::PolicyConfig;

/// One loan of one copy of a book to one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "transaction_id")]
    pub id: String,
    pub member_id: String,
    pub book_id: String,
    #[serde(with = "timestamp")]
    pub borrow_date: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub due_date: DateTime<Utc>,
    /// Set once on return, never cleared
    #[serde(with = "timestamp::option", default)]
    pub return_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fine: Decimal,
}

impl Transaction {
    pub fn open(
        id: String,
        member_id: String,
        book_id: String,
        now: DateTime<Utc>,
        policy: &PolicyConfig,
    ) -> Self {
        Self {
            id,
            member_id,
            book_id,
            borrow_date: now,
            due_date: now + Duration::days(policy.loan_period_days),
            return_date: None,
            fine: Decimal::ZERO,
        }
    }

    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && now > self.due_date
    }

    /// Stamp the return and compute the fine. Callers check `is_open` first.
    pub(crate) fn close(&mut self, now: DateTime<Utc>, policy: &PolicyConfig) -> Decimal {
        debug_assert!(self.is_open());
        self.return_date = Some(now);
        self.fine = overdue_fine(self.due_date, now, policy.fine_per_day);
        self.fine
    }
}

/// Whole days late times the daily rate. Partial days are dropped.
pub fn overdue_fine(due: DateTime<Utc>, returned: DateTime<Utc>, per_day: Decimal) -> Decimal {
    if returned <= due {
        return Decimal::ZERO;
    }
    let days = (returned - due).num_days();
    per_day * Decimal::from(days)
}
