//! Error types for the circulation core

use thiserror::Error;

use crate::models::{Book, Member, Transaction};

/// Stable numeric codes for collaborators that cannot match on the enum
/// (text menus, request handlers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    NoSuchBook = 1,
    NoSuchMember = 2,
    NoSuchTransaction = 3,
    MemberInactive = 4,
    BookNotAvailable = 5,
    MaxBorrowsReached = 6,
    AlreadyReturned = 7,
    BookHasOpenLoans = 8,
    BadValue = 9,
    StorageFailure = 10,
    CorruptSnapshot = 11,
}

/// Kind of entity a lookup failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Book,
    Member,
    Transaction,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Entity::Book => "Book",
            Entity::Member => "Member",
            Entity::Transaction => "Transaction",
        };
        write!(f, "{}", label)
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("Member account {0} is inactive")]
    MemberInactive(String),

    #[error("Book {0} has no available copies")]
    BookUnavailable(String),

    #[error("Member {member_id} has reached the maximum borrowing limit ({limit} books)")]
    BorrowLimitExceeded { member_id: String, limit: usize },

    #[error("Transaction {0} is already returned")]
    AlreadyReturned(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Snapshot write failed: {0}")]
    Persistence(String),

    /// The change is applied in memory but every snapshot write failed.
    /// `committed` is the operation's result; repeating the operation
    /// would apply it a second time.
    #[error("Change applied but not saved, it may not survive a restart: {reason}")]
    Unsaved {
        reason: String,
        committed: Box<Committed>,
    },

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

/// Entity state left behind by a mutation whose snapshot was not written
#[derive(Debug, Clone, PartialEq)]
pub enum Committed {
    Book(Book),
    Member(Member),
    Transaction(Transaction),
}

impl From<Book> for Committed {
    fn from(book: Book) -> Self {
        Committed::Book(book)
    }
}

impl From<Member> for Committed {
    fn from(member: Member) -> Self {
        Committed::Member(member)
    }
}

impl From<Transaction> for Committed {
    fn from(transaction: Transaction) -> Self {
        Committed::Transaction(transaction)
    }
}

impl AppError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        AppError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound { entity, .. } => match entity {
                Entity::Book => ErrorCode::NoSuchBook,
                Entity::Member => ErrorCode::NoSuchMember,
                Entity::Transaction => ErrorCode::NoSuchTransaction,
            },
            AppError::MemberInactive(_) => ErrorCode::MemberInactive,
            AppError::BookUnavailable(_) => ErrorCode::BookNotAvailable,
            AppError::BorrowLimitExceeded { .. } => ErrorCode::MaxBorrowsReached,
            AppError::AlreadyReturned(_) => ErrorCode::AlreadyReturned,
            AppError::Conflict(_) => ErrorCode::BookHasOpenLoans,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Persistence(_) | AppError::Unsaved { .. } | AppError::Io(_) => {
                ErrorCode::StorageFailure
            }
            AppError::CorruptSnapshot(_) => ErrorCode::CorruptSnapshot,
        }
    }

    /// True for rule violations reported before anything was mutated;
    /// false for storage failures.
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            AppError::Persistence(_)
                | AppError::Unsaved { .. }
                | AppError::Io(_)
                | AppError::CorruptSnapshot(_)
        )
    }

    /// Result of an operation that took effect in memory without being saved
    pub fn committed(&self) -> Option<&Committed> {
        match self {
            AppError::Unsaved { committed, .. } => Some(&**committed),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
