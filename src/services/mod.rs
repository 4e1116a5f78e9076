//! Business logic services

pub mod catalog;
pub mod clock;
pub mod loans;
pub mod members;
pub mod membership;
pub mod stats;

use std::sync::Arc;

use crate::{config::PolicyConfig, repository::Repository};

use clock::Clock;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub loans: loans::LoansService,
    pub membership: membership::MembershipService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(repository: Repository, policy: PolicyConfig, clock: Arc<dyn Clock>) -> Self {
        let policy = Arc::new(policy);
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            members: members::MembersService::new(repository.clone(), policy.clone(), clock.clone()),
            loans: loans::LoansService::new(repository.clone(), policy.clone(), clock.clone()),
            membership: membership::MembershipService::new(repository.clone(), policy, clock.clone()),
            stats: stats::StatsService::new(repository, clock),
        }
    }
}
