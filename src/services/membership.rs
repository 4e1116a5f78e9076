//! Membership fee service: expiry, renewal and fee amounts

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    config::PolicyConfig,
    error::{AppError, AppResult},
    models::member::{Member, MemberFeeStatus, MembershipStatus},
    repository::Repository,
    services::clock::Clock,
};

#[derive(Clone)]
pub struct MembershipService {
    repository: Repository,
    policy: Arc<PolicyConfig>,
    clock: Arc<dyn Clock>,
}

impl MembershipService {
    pub fn new(repository: Repository, policy: Arc<PolicyConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            policy,
            clock,
        }
    }

    /// Active while now is on or before the expiry date
    pub async fn check_status(&self, member_id: &str) -> AppResult<MembershipStatus> {
        let now = self.clock.now();
        Ok(self.repository.read().await.member(member_id)?.membership_status(now))
    }

    /// Record a fee payment. The new period always starts now.
    pub async fn pay_fee(&self, member_id: &str) -> AppResult<Member> {
        let policy = &self.policy;
        self.repository
            .write(|store| {
                let member = store.member_mut(member_id)?;
                member.record_fee_payment(self.clock.now(), policy);
                Ok(member.clone())
            })
            .await
    }

    /// Change a member's annual fee. Expiry is untouched.
    pub async fn update_fee(&self, member_id: &str, amount: Decimal) -> AppResult<Member> {
        if amount < Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "Annual fee cannot be negative: {}",
                amount
            )));
        }
        self.repository
            .write(|store| {
                let member = store.member_mut(member_id)?;
                member.annual_membership_fee = amount;
                Ok(member.clone())
            })
            .await
    }

    /// Fee standing of every member, in registration order
    pub async fn fee_overview(&self) -> Vec<MemberFeeStatus> {
        let now = self.clock.now();
        self.repository
            .read()
            .await
            .members()
            .map(|m| MemberFeeStatus {
                member_id: m.id.clone(),
                name: m.name.clone(),
                annual_fee: m.annual_membership_fee,
                expiry_date: m.membership_expiry_date,
                status: m.membership_status(now),
            })
            .collect()
    }
}
