//! In-memory catalog, membership and transaction collections.
//!
//! `LibraryStore` is also the snapshot document: serializing it produces the
//! persisted JSON, keyed collections in insertion order.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    config::PolicyConfig,
    error::{AppError, AppResult, Entity},
    models::{Book, Member, Transaction},
};

const FIRST_BOOK_NUMBER: u64 = 1000;
const FIRST_MEMBER_NUMBER: u64 = 100;
const FIRST_TRANSACTION_NUMBER: u64 = 10000;

fn first_book_number() -> u64 {
    FIRST_BOOK_NUMBER
}

fn first_member_number() -> u64 {
    FIRST_MEMBER_NUMBER
}

fn first_transaction_number() -> u64 {
    FIRST_TRANSACTION_NUMBER
}

/// Books, members and transactions keyed by id.
///
/// Outside the crate the store is read-only; entities are created and
/// removed through the services:
///
/// ```compile_fail
/// use library_circulation::models::{Book, CreateBook};
/// use library_circulation::repository::LibraryStore;
///
/// let mut store = LibraryStore::new();
/// store.add_book(|id| {
///     Book::new(id, CreateBook {
///         title: "Dune".into(),
///         author: "Frank Herbert".into(),
///         isbn: String::new(),
///         genre: String::new(),
///         total_copies: 1,
///     })
/// });
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryStore {
    #[serde(default)]
    books: IndexMap<String, Book>,
    #[serde(default)]
    members: IndexMap<String, Member>,
    #[serde(default)]
    transactions: IndexMap<String, Transaction>,
    /// Next number handed out for each id kind. Never decremented.
    #[serde(default = "first_book_number")]
    book_counter: u64,
    #[serde(default = "first_member_number")]
    member_counter: u64,
    #[serde(default = "first_transaction_number")]
    transaction_counter: u64,
}

impl Default for LibraryStore {
    fn default() -> Self {
        Self {
            books: IndexMap::new(),
            members: IndexMap::new(),
            transactions: IndexMap::new(),
            book_counter: FIRST_BOOK_NUMBER,
            member_counter: FIRST_MEMBER_NUMBER,
            transaction_counter: FIRST_TRANSACTION_NUMBER,
        }
    }
}

/// Hand out `{prefix}{counter}`, skipping numbers already taken by
/// existing keys.
fn next_id<V>(prefix: char, counter: &mut u64, taken: &IndexMap<String, V>) -> String {
    loop {
        let id = format!("{}{}", prefix, *counter);
        *counter += 1;
        if !taken.contains_key(&id) {
            return id;
        }
    }
}

/// A broken invariant found in a loaded snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    CopyCountMismatch {
        book_id: String,
        total: u32,
        available: u32,
        open: usize,
    },
    AvailabilityFlagMismatch { book_id: String },
    UnknownBook { transaction_id: String, book_id: String },
    UnknownMember { transaction_id: String, member_id: String },
    BorrowedListMismatch { member_id: String },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::CopyCountMismatch { book_id, total, available, open } => write!(
                f,
                "book {}: {} available + {} on loan != {} total copies",
                book_id, available, open, total
            ),
            IntegrityIssue::AvailabilityFlagMismatch { book_id } => {
                write!(f, "book {}: is_available disagrees with available_copies", book_id)
            }
            IntegrityIssue::UnknownBook { transaction_id, book_id } => {
                write!(f, "transaction {} references unknown book {}", transaction_id, book_id)
            }
            IntegrityIssue::UnknownMember { transaction_id, member_id } => {
                write!(f, "transaction {} references unknown member {}", transaction_id, member_id)
            }
            IntegrityIssue::BorrowedListMismatch { member_id } => write!(
                f,
                "member {}: borrowed_books does not match open transactions",
                member_id
            ),
        }
    }
}

impl LibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Books

    pub(crate) fn add_book(&mut self, build: impl FnOnce(String) -> Book) -> &Book {
        let id = next_id('B', &mut self.book_counter, &self.books);
        let book = build(id.clone());
        self.books.entry(id).or_insert(book)
    }

    pub fn book(&self, id: &str) -> AppResult<&Book> {
        self.books
            .get(id)
            .ok_or_else(|| AppError::not_found(Entity::Book, id))
    }

    pub(crate) fn book_mut(&mut self, id: &str) -> AppResult<&mut Book> {
        self.books
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(Entity::Book, id))
    }

    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn open_transaction_count_for_book(&self, book_id: &str) -> usize {
        self.transactions
            .values()
            .filter(|t| t.book_id == book_id && t.is_open())
            .count()
    }

    /// Remove a book. Refused while any copy is on loan.
    pub(crate) fn delete_book(&mut self, id: &str) -> AppResult<Book> {
        self.book(id)?;
        let open = self.open_transaction_count_for_book(id);
        if open > 0 {
            return Err(AppError::Conflict(format!(
                "Book {} has {} open transaction(s)",
                id, open
            )));
        }
        self.books
            .shift_remove(id)
            .ok_or_else(|| AppError::not_found(Entity::Book, id))
    }

    // Members

    pub(crate) fn add_member(&mut self, build: impl FnOnce(String) -> Member) -> &Member {
        let id = next_id('M', &mut self.member_counter, &self.members);
        let member = build(id.clone());
        self.members.entry(id).or_insert(member)
    }

    pub fn member(&self, id: &str) -> AppResult<&Member> {
        self.members
            .get(id)
            .ok_or_else(|| AppError::not_found(Entity::Member, id))
    }

    pub(crate) fn member_mut(&mut self, id: &str) -> AppResult<&mut Member> {
        self.members
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(Entity::Member, id))
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Fill fee fields missing from older snapshots. Returns how many
    /// members were touched.
    pub(crate) fn fill_missing_fee_fields(
        &mut self,
        now: DateTime<Utc>,
        policy: &PolicyConfig,
    ) -> usize {
        let mut filled = 0;
        for member in self.members.values_mut().filter(|m| m.has_missing_fee_fields()) {
            member.fill_missing_fee_fields(now, policy);
            filled += 1;
        }
        filled
    }

    // Transactions

    pub(crate) fn next_transaction_id(&mut self) -> String {
        next_id('T', &mut self.transaction_counter, &self.transactions)
    }

    pub(crate) fn insert_transaction(&mut self, transaction: Transaction) {
        self.transactions.insert(transaction.id.clone(), transaction);
    }

    pub fn transaction(&self, id: &str) -> AppResult<&Transaction> {
        self.transactions
            .get(id)
            .ok_or_else(|| AppError::not_found(Entity::Transaction, id))
    }

    pub(crate) fn transaction_mut(&mut self, id: &str) -> AppResult<&mut Transaction> {
        self.transactions
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(Entity::Transaction, id))
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Check every cross-collection invariant. Reports, never repairs.
    pub fn integrity_report(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for book in self.books.values() {
            let open = self.open_transaction_count_for_book(&book.id);
            if book.available_copies as usize + open != book.total_copies as usize {
                issues.push(IntegrityIssue::CopyCountMismatch {
                    book_id: book.id.clone(),
                    total: book.total_copies,
                    available: book.available_copies,
                    open,
                });
            }
            if book.is_available != (book.available_copies > 0) {
                issues.push(IntegrityIssue::AvailabilityFlagMismatch {
                    book_id: book.id.clone(),
                });
            }
        }

        for t in self.transactions.values() {
            if !self.books.contains_key(&t.book_id) {
                issues.push(IntegrityIssue::UnknownBook {
                    transaction_id: t.id.clone(),
                    book_id: t.book_id.clone(),
                });
            }
            if !self.members.contains_key(&t.member_id) {
                issues.push(IntegrityIssue::UnknownMember {
                    transaction_id: t.id.clone(),
                    member_id: t.member_id.clone(),
                });
            }
        }

        for member in self.members.values() {
            let mut listed: Vec<&str> = member.borrowed_books.iter().map(String::as_str).collect();
            let mut open: Vec<&str> = self
                .transactions
                .values()
                .filter(|t| t.member_id == member.id && t.is_open())
                .map(|t| t.id.as_str())
                .collect();
            listed.sort_unstable();
            open.sort_unstable();
            if listed != open {
                issues.push(IntegrityIssue::BorrowedListMismatch {
                    member_id: member.id.clone(),
                });
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::models::{CreateBook, CreateMember};
    use chrono::Utc;

    fn book_data(title: &str, copies: u32) -> CreateBook {
        CreateBook {
            title: title.into(),
            author: "Anon".into(),
            isbn: "0".into(),
            genre: "Misc".into(),
            total_copies: copies,
        }
    }

    fn member_data(name: &str) -> CreateMember {
        CreateMember {
            name: name.into(),
            email: format!("{}@example.org", name.to_lowercase()),
            phone: "555".into(),
        }
    }

    #[test]
    fn test_ids_follow_per_kind_counters() {
        let mut store = LibraryStore::new();
        let b1 = store.add_book(|id| Book::new(id, book_data("A", 1))).id.clone();
        let b2 = store.add_book(|id| Book::new(id, book_data("B", 1))).id.clone();
        let policy = PolicyConfig::default();
        let m1 = store
            .add_member(|id| Member::new(id, member_data("Ann"), Utc::now(), &policy))
            .id
            .clone();
        assert_eq!(b1, "B1000");
        assert_eq!(b2, "B1001");
        assert_eq!(m1, "M100");
        assert_eq!(store.next_transaction_id(), "T10000");
    }

    #[test]
    fn test_deleted_ids_are_not_reused() {
        let mut store = LibraryStore::new();
        let first = store.add_book(|id| Book::new(id, book_data("A", 1))).id.clone();
        store.delete_book(&first).unwrap();
        let second = store.add_book(|id| Book::new(id, book_data("B", 1))).id.clone();
        assert_ne!(first, second);
    }

    #[test]
    fn test_counter_skips_ids_already_present() {
        let mut store: LibraryStore = serde_json::from_str(
            r#"{"books":{"B1000":{"book_id":"B1000","title":"Old","author":"X","isbn":"1",
                "genre":"G","total_copies":1,"available_copies":1,"is_available":true}},
                "members":{},"transactions":{}}"#,
        )
        .unwrap();
        let id = store.add_book(|id| Book::new(id, book_data("New", 1))).id.clone();
        assert_eq!(id, "B1001");
    }

    #[test]
    fn test_fee_defaults_come_from_policy_and_given_time() {
        let mut store: LibraryStore = serde_json::from_str(
            r#"{"members":{
                "M100":{"member_id":"M100","name":"Old","email":"old@example.org","phone":"1",
                    "membership_date":"2023-01-05T09:30:00","is_active":true},
                "M101":{"member_id":"M101","name":"New","email":"new@example.org","phone":"2",
                    "membership_date":"2023-01-05T09:30:00","is_active":true,
                    "annual_membership_fee":"30.00",
                    "membership_expiry_date":"2024-01-05T09:30:00Z",
                    "last_fee_payment_date":"2023-01-05T09:30:00Z"}}}"#,
        )
        .unwrap();
        let now = Utc::now() - chrono::Duration::days(1000);
        let policy = PolicyConfig {
            default_annual_fee: rust_decimal::Decimal::new(2000, 2),
            membership_period_days: 30,
            ..PolicyConfig::default()
        };

        assert_eq!(store.fill_missing_fee_fields(now, &policy), 1);
        let old = store.member("M100").unwrap();
        assert_eq!(old.annual_membership_fee.to_string(), "20.00");
        assert_eq!(old.membership_expiry_date, now + chrono::Duration::days(30));
        assert_eq!(old.last_fee_payment_date, now);
        assert_eq!(store.member("M101").unwrap().annual_membership_fee.to_string(), "30.00");
        assert_eq!(store.fill_missing_fee_fields(now, &policy), 0);
    }

    #[test]
    fn test_lookup_of_unknown_ids_fails() {
        let store = LibraryStore::new();
        assert!(matches!(
            store.book("B9"),
            Err(AppError::NotFound { entity: Entity::Book, .. })
        ));
        assert!(matches!(
            store.member("M9"),
            Err(AppError::NotFound { entity: Entity::Member, .. })
        ));
        assert!(matches!(
            store.transaction("T9"),
            Err(AppError::NotFound { entity: Entity::Transaction, .. })
        ));
    }

    #[test]
    fn test_integrity_report_flags_copy_mismatch() {
        let mut store = LibraryStore::new();
        let id = store.add_book(|id| Book::new(id, book_data("A", 2))).id.clone();
        assert!(store.integrity_report().is_empty());

        store.book_mut(&id).unwrap().available_copies = 1;
        let issues = store.integrity_report();
        assert_eq!(
            issues,
            vec![IntegrityIssue::CopyCountMismatch {
                book_id: id,
                total: 2,
                available: 1,
                open: 0,
            }]
        );
    }
}
