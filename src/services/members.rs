//! Member registration and maintenance service

use std::sync::Arc;

use validator::Validate;

use crate::{
    config::PolicyConfig,
    error::AppResult,
    models::member::{CreateMember, Member, UpdateMember},
    repository::Repository,
    services::clock::Clock,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
    policy: Arc<PolicyConfig>,
    clock: Arc<dyn Clock>,
}

impl MembersService {
    pub fn new(repository: Repository, policy: Arc<PolicyConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            policy,
            clock,
        }
    }

    /// Register a member; the first membership period starts now
    pub async fn register_member(&self, member: CreateMember) -> AppResult<Member> {
        member.validate()?;
        self.repository
            .write(|store| {
                let now = self.clock.now();
                Ok(store
                    .add_member(|id| Member::new(id, member, now, &self.policy))
                    .clone())
            })
            .await
    }

    /// Get member by ID
    pub async fn get_member(&self, id: &str) -> AppResult<Member> {
        self.repository.read().await.member(id).cloned()
    }

    /// All members in registration order
    pub async fn list_members(&self) -> Vec<Member> {
        self.repository.read().await.members().cloned().collect()
    }

    /// Update contact details
    pub async fn update_member(&self, id: &str, update: UpdateMember) -> AppResult<Member> {
        update.validate()?;
        self.repository
            .write(|store| {
                let member = store.member_mut(id)?;
                member.apply(update);
                Ok(member.clone())
            })
            .await
    }

    /// Enable or suspend borrowing for a member. Open loans are unaffected.
    pub async fn set_active(&self, id: &str, active: bool) -> AppResult<Member> {
        self.repository
            .write(|store| {
                let member = store.member_mut(id)?;
                member.is_active = active;
                Ok(member.clone())
            })
            .await
    }
}
