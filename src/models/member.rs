//! Member model, membership fee status and related types

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::timestamp;
use crate::config::PolicyConfig;

/// Library member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MemberRecord")]
pub struct Member {
    #[serde(rename = "member_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Ids of this member's open transactions, in borrow order
    pub borrowed_books: Vec<String>,
    #[serde(with = "timestamp")]
    pub membership_date: DateTime<Utc>,
    pub is_active: bool,
    pub annual_membership_fee: Decimal,
    #[serde(with = "timestamp")]
    pub membership_expiry_date: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub last_fee_payment_date: DateTime<Utc>,
    #[serde(skip)]
    missing: MissingFeeFields,
}

/// Fee fields absent from the loaded record, still holding placeholders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MissingFeeFields {
    annual_fee: bool,
    expiry_date: bool,
    last_payment: bool,
}

impl MissingFeeFields {
    fn any(&self) -> bool {
        self.annual_fee || self.expiry_date || self.last_payment
    }
}

/// Snapshot shape of a member. Records written before membership fees
/// existed lack the fee fields.
#[derive(Deserialize)]
struct MemberRecord {
    member_id: String,
    name: String,
    email: String,
    phone: String,
    #[serde(default)]
    borrowed_books: Vec<String>,
    #[serde(with = "timestamp")]
    membership_date: DateTime<Utc>,
    is_active: bool,
    #[serde(default)]
    annual_membership_fee: Option<Decimal>,
    #[serde(with = "timestamp::option", default)]
    membership_expiry_date: Option<DateTime<Utc>>,
    #[serde(with = "timestamp::option", default)]
    last_fee_payment_date: Option<DateTime<Utc>>,
}

impl From<MemberRecord> for Member {
    fn from(r: MemberRecord) -> Self {
        let missing = MissingFeeFields {
            annual_fee: r.annual_membership_fee.is_none(),
            expiry_date: r.membership_expiry_date.is_none(),
            last_payment: r.last_fee_payment_date.is_none(),
        };
        Self {
            id: r.member_id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            borrowed_books: r.borrowed_books,
            membership_date: r.membership_date,
            is_active: r.is_active,
            annual_membership_fee: r.annual_membership_fee.unwrap_or_default(),
            membership_expiry_date: r.membership_expiry_date.unwrap_or(r.membership_date),
            last_fee_payment_date: r.last_fee_payment_date.unwrap_or(r.membership_date),
            missing,
        }
    }
}

impl Member {
    pub fn new(id: String, data: CreateMember, now: DateTime<Utc>, policy: &PolicyConfig) -> Self {
        Self {
            id,
            name: data.name,
            email: data.email,
            phone: data.phone,
            borrowed_books: Vec::new(),
            membership_date: now,
            is_active: true,
            annual_membership_fee: policy.default_annual_fee,
            membership_expiry_date: now + Duration::days(policy.membership_period_days),
            last_fee_payment_date: now,
            missing: MissingFeeFields::default(),
        }
    }

    /// True for a member loaded from an older snapshot until its fee
    /// fields are filled
    pub fn has_missing_fee_fields(&self) -> bool {
        self.missing.any()
    }

    /// Give missing fee fields the values a registration at `now` would get
    pub(crate) fn fill_missing_fee_fields(&mut self, now: DateTime<Utc>, policy: &PolicyConfig) {
        let missing = std::mem::take(&mut self.missing);
        if missing.annual_fee {
            self.annual_membership_fee = policy.default_annual_fee;
        }
        if missing.expiry_date {
            self.membership_expiry_date = now + Duration::days(policy.membership_period_days);
        }
        if missing.last_payment {
            self.last_fee_payment_date = now;
        }
    }

    pub fn open_loan_count(&self) -> usize {
        self.borrowed_books.len()
    }

    pub fn membership_status(&self, now: DateTime<Utc>) -> MembershipStatus {
        if now <= self.membership_expiry_date {
            MembershipStatus::Active
        } else {
            MembershipStatus::Expired
        }
    }

    /// Restart the membership period from `now`. Unused time is not carried over.
    pub(crate) fn record_fee_payment(&mut self, now: DateTime<Utc>, policy: &PolicyConfig) {
        self.membership_expiry_date = now + Duration::days(policy.membership_period_days);
        self.last_fee_payment_date = now;
    }

    pub(crate) fn release_loan(&mut self, transaction_id: &str) {
        self.borrowed_books.retain(|id| id != transaction_id);
    }

    pub(crate) fn apply(&mut self, update: UpdateMember) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(phone) = update.phone {
            self.phone = phone;
        }
    }
}

/// Create member request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMember {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub phone: String,
}

/// Update member request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMember {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Fee-based membership standing. Independent of `Member::is_active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Expired,
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MembershipStatus::Active => write!(f, "Active"),
            MembershipStatus::Expired => write!(f, "Membership expired"),
        }
    }
}

/// One row of the fee overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberFeeStatus {
    pub member_id: String,
    pub name: String,
    pub annual_fee: Decimal,
    #[serde(with = "timestamp")]
    pub expiry_date: DateTime<Utc>,
    pub status: MembershipStatus,
}
