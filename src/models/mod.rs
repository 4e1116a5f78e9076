//! Data models for the circulation core

pub mod book;
pub mod member;
pub mod stats;
pub mod timestamp;
pub mod transaction;

// Re-export commonly used types
pub use book::{Book, BookSearchField, CreateBook, UpdateBook};
pub use member::{CreateMember, Member, MemberFeeStatus, MembershipStatus, UpdateMember};
pub use stats::{LibraryStats, TopBorrower};
pub use transaction::Transaction;
