//! Loan management service: borrowing, returns and fines

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    config::PolicyConfig,
    error::{AppError, AppResult},
    models::transaction::Transaction,
    repository::{LibraryStore, Repository},
    services::clock::Clock,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    policy: Arc<PolicyConfig>,
    clock: Arc<dyn Clock>,
}

impl LoansService {
    pub fn new(repository: Repository, policy: Arc<PolicyConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            policy,
            clock,
        }
    }

    /// Lend one copy of `book_id` to `member_id`. Returns the transaction id.
    ///
    /// On `AppError::Unsaved` the loan exists in memory; its transaction is
    /// in the error and the borrow must not be repeated.
    pub async fn borrow(&self, member_id: &str, book_id: &str) -> AppResult<String> {
        let policy = &self.policy;
        self.repository
            .write(|store| {
                check_can_borrow(store, member_id, book_id, policy)?;

                // Read under the lock so dates follow id order.
                let now = self.clock.now();
                let id = store.next_transaction_id();
                let transaction = Transaction::open(
                    id.clone(),
                    member_id.to_string(),
                    book_id.to_string(),
                    now,
                    policy,
                );
                store.insert_transaction(transaction.clone());
                store.book_mut(book_id)?.check_out();
                store.member_mut(member_id)?.borrowed_books.push(id);
                Ok(transaction)
            })
            .await
            .map(|t| t.id)
    }

    /// Close a transaction. Returns the fine charged (zero when on time).
    pub async fn return_book(&self, transaction_id: &str) -> AppResult<Decimal> {
        let policy = &self.policy;
        self.repository
            .write(|store| {
                let now = self.clock.now();
                let transaction = store.transaction(transaction_id)?;
                if !transaction.is_open() {
                    return Err(AppError::AlreadyReturned(transaction_id.to_string()));
                }
                let book_id = transaction.book_id.clone();
                let member_id = transaction.member_id.clone();
                // Both must resolve before anything changes.
                store.book(&book_id)?;
                store.member(&member_id)?;

                let transaction = store.transaction_mut(transaction_id)?;
                transaction.close(now, policy);
                let closed = transaction.clone();
                store.book_mut(&book_id)?.check_in();
                store.member_mut(&member_id)?.release_loan(transaction_id);
                Ok(closed)
            })
            .await
            .map(|t| t.fine)
    }

    /// Get transaction by ID
    pub async fn get_transaction(&self, id: &str) -> AppResult<Transaction> {
        self.repository.read().await.transaction(id).cloned()
    }

    /// All transactions in creation order
    pub async fn list_transactions(&self) -> Vec<Transaction> {
        self.repository.read().await.transactions().cloned().collect()
    }

    pub async fn open_transactions(&self) -> Vec<Transaction> {
        self.repository
            .read()
            .await
            .transactions()
            .filter(|t| t.is_open())
            .cloned()
            .collect()
    }

    /// Open transactions past their due date
    pub async fn overdue_transactions(&self) -> Vec<Transaction> {
        let now = self.clock.now();
        self.repository
            .read()
            .await
            .transactions()
            .filter(|t| t.is_overdue(now))
            .cloned()
            .collect()
    }

    /// Every transaction of a member, most recent borrow first
    pub async fn member_history(&self, member_id: &str) -> AppResult<Vec<Transaction>> {
        let store = self.repository.read().await;
        store.member(member_id)?;
        let mut history: Vec<Transaction> = store
            .transactions()
            .filter(|t| t.member_id == member_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.borrow_date.cmp(&a.borrow_date));
        Ok(history)
    }
}

/// Borrowing preconditions, in the order they are reported
fn check_can_borrow(
    store: &LibraryStore,
    member_id: &str,
    book_id: &str,
    policy: &PolicyConfig,
) -> AppResult<()> {
    let member = store.member(member_id)?;
    let book = store.book(book_id)?;

    if !member.is_active {
        return Err(AppError::MemberInactive(member_id.to_string()));
    }
    if book.available_copies == 0 {
        return Err(AppError::BookUnavailable(book_id.to_string()));
    }
    if member.open_loan_count() >= policy.max_borrowed_books {
        return Err(AppError::BorrowLimitExceeded {
            member_id: member_id.to_string(),
            limit: policy.max_borrowed_books,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Entity;
    use crate::models::{Book, CreateBook, CreateMember, Member};
    use chrono::Utc;

    fn seeded() -> (LibraryStore, String, String) {
        let mut store = LibraryStore::new();
        let policy = PolicyConfig::default();
        let book_id = store
            .add_book(|id| {
                Book::new(
                    id,
                    CreateBook {
                        title: "Ulysses".into(),
                        author: "James Joyce".into(),
                        isbn: "978-0679722762".into(),
                        genre: "Novel".into(),
                        total_copies: 0,
                    },
                )
            })
            .id
            .clone();
        let member_id = store
            .add_member(|id| {
                Member::new(
                    id,
                    CreateMember {
                        name: "Leopold".into(),
                        email: "leopold@example.org".into(),
                        phone: "1904".into(),
                    },
                    Utc::now(),
                    &policy,
                )
            })
            .id
            .clone();
        (store, member_id, book_id)
    }

    #[test]
    fn test_member_is_checked_before_book() {
        let (store, _, _) = seeded();
        let err = check_can_borrow(&store, "M999", "B999", &PolicyConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: Entity::Member, .. }));
    }

    #[test]
    fn test_inactive_is_reported_before_unavailable() {
        let (mut store, member_id, book_id) = seeded();
        store.member_mut(&member_id).unwrap().is_active = false;
        let err = check_can_borrow(&store, &member_id, &book_id, &PolicyConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::MemberInactive(_)));
    }

    #[test]
    fn test_unavailable_is_reported_before_limit() {
        let (store, member_id, book_id) = seeded();
        let policy = PolicyConfig {
            max_borrowed_books: 0,
            ..PolicyConfig::default()
        };
        let err = check_can_borrow(&store, &member_id, &book_id, &policy).unwrap_err();
        assert!(matches!(err, AppError::BookUnavailable(_)));
    }

    mod unsaved {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        use super::*;
        use crate::error::Committed;
        use crate::repository::{snapshot::MockSnapshotStorage, SaveRetry};
        use crate::services::clock::ManualClock;

        /// Saves fail while `counter` is inside `failing`
        fn flaky_storage(failing: std::ops::Range<usize>) -> (MockSnapshotStorage, Arc<AtomicUsize>) {
            let saves = Arc::new(AtomicUsize::new(0));
            let counter = saves.clone();
            let mut storage = MockSnapshotStorage::new();
            storage.expect_load().returning(|| Ok(None));
            storage.expect_save().returning(move |_| {
                if failing.contains(&counter.fetch_add(1, Ordering::SeqCst)) {
                    Err(AppError::Persistence("disk full".into()))
                } else {
                    Ok(())
                }
            });
            (storage, saves)
        }

        async fn seeded_service(storage: MockSnapshotStorage) -> (LoansService, Repository, String, String) {
            let retry = SaveRetry {
                max_attempts: 2,
                base_delay: Duration::ZERO,
            };
            let repository = Repository::open(Arc::new(storage), retry).await.unwrap();
            let policy = Arc::new(PolicyConfig::default());
            let now = Utc::now();
            let book_id = repository
                .write(|s| {
                    Ok(s.add_book(|id| {
                        Book::new(
                            id,
                            CreateBook {
                                title: "Ulysses".into(),
                                author: "James Joyce".into(),
                                isbn: "978-0679722762".into(),
                                genre: "Novel".into(),
                                total_copies: 2,
                            },
                        )
                    })
                    .clone())
                })
                .await
                .unwrap()
                .id;
            let member_id = repository
                .write(|s| {
                    Ok(s.add_member(|id| {
                        Member::new(
                            id,
                            CreateMember {
                                name: "Molly".into(),
                                email: "molly@example.org".into(),
                                phone: "1904".into(),
                            },
                            now,
                            &policy,
                        )
                    })
                    .clone())
                })
                .await
                .unwrap()
                .id;
            let service = LoansService::new(
                repository.clone(),
                policy,
                Arc::new(ManualClock::new(now)),
            );
            (service, repository, member_id, book_id)
        }

        #[tokio::test]
        async fn test_unsaved_borrow_reports_its_transaction() {
            // Saves 0 and 1 seed the store; both attempts for the borrow fail.
            let (storage, saves) = flaky_storage(2..4);
            let (loans, repository, member_id, book_id) = seeded_service(storage).await;

            let err = loans.borrow(&member_id, &book_id).await.unwrap_err();
            let committed = match err.committed() {
                Some(Committed::Transaction(t)) => t.clone(),
                other => panic!("expected a committed transaction, got {:?}", other),
            };
            assert_eq!(committed.id, "T10000");
            assert_eq!(saves.load(Ordering::SeqCst), 4);

            // The caller has the id and flushes instead of borrowing again.
            repository.flush().await.unwrap();
            let store = repository.read().await;
            assert_eq!(store.transaction_count(), 1);
            assert_eq!(store.member(&member_id).unwrap().borrowed_books, vec!["T10000"]);
            assert_eq!(store.book(&book_id).unwrap().available_copies, 1);
            assert!(store.integrity_report().is_empty());
        }

        #[tokio::test]
        async fn test_borrow_survives_one_failed_save() {
            let (storage, saves) = flaky_storage(2..3);
            let (loans, repository, member_id, book_id) = seeded_service(storage).await;

            let id = loans.borrow(&member_id, &book_id).await.unwrap();
            assert_eq!(id, "T10000");
            assert_eq!(saves.load(Ordering::SeqCst), 4);
            let store = repository.read().await;
            assert_eq!(store.transaction_count(), 1);
            assert_eq!(store.member(&member_id).unwrap().borrowed_books, vec![id]);
        }

        #[tokio::test]
        async fn test_unsaved_return_reports_its_fine() {
            // The borrow is save 2; both attempts for the return fail.
            let (storage, _) = flaky_storage(3..5);
            let (loans, _repository, member_id, book_id) = seeded_service(storage).await;
            let tx = loans.borrow(&member_id, &book_id).await.unwrap();

            let err = loans.return_book(&tx).await.unwrap_err();
            assert!(matches!(
                err.committed(),
                Some(Committed::Transaction(t)) if t.id == tx && !t.is_open() && t.fine == Decimal::ZERO
            ));
            assert!(matches!(
                loans.return_book(&tx).await,
                Err(AppError::AlreadyReturned(_))
            ));
        }
    }
}
