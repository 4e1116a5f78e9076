//! Statistics service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::{
    models::stats::{LibraryStats, TopBorrower},
    repository::{LibraryStore, Repository},
    services::clock::Clock,
};

const TOP_BORROWERS: usize = 5;

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn statistics(&self) -> LibraryStats {
        let now = self.clock.now();
        let store = self.repository.read().await;
        compute(&store, now)
    }
}

fn compute(store: &LibraryStore, now: DateTime<Utc>) -> LibraryStats {
    let mut borrowed_books = 0;
    let mut overdue_transactions = 0;
    let mut total_fines = Decimal::ZERO;
    // Insertion order = order of first transaction, which breaks count ties.
    let mut per_member: IndexMap<&str, usize> = IndexMap::new();

    for t in store.transactions() {
        if t.is_open() {
            borrowed_books += 1;
        }
        if t.is_overdue(now) {
            overdue_transactions += 1;
        }
        total_fines += t.fine;
        *per_member.entry(t.member_id.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = per_member.into_iter().collect();
    // Stable: equal counts keep first-encountered order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top_borrowers = ranked
        .into_iter()
        .take(TOP_BORROWERS)
        .map(|(member_id, transaction_count)| TopBorrower {
            member_id: member_id.to_string(),
            name: store
                .member(member_id)
                .map(|m| m.name.clone())
                .unwrap_or_default(),
            transaction_count,
        })
        .collect();

    LibraryStats {
        total_books: store.book_count(),
        total_members: store.member_count(),
        total_transactions: store.transaction_count(),
        borrowed_books,
        available_books: store.books().map(|b| u64::from(b.available_copies)).sum(),
        overdue_transactions,
        total_fines,
        top_borrowers,
    }
}
