//! Statistics report types

use rust_decimal::Decimal;
use serde::Serialize;

/// Member ranked by number of transactions (open and closed)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopBorrower {
    pub member_id: String,
    pub name: String,
    pub transaction_count: usize,
}

/// Library-wide counters, computed on demand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryStats {
    pub total_books: usize,
    pub total_members: usize,
    pub total_transactions: usize,
    /// Open transactions
    pub borrowed_books: usize,
    /// Sum of available copies over the catalog
    pub available_books: u64,
    pub overdue_transactions: usize,
    pub total_fines: Decimal,
    pub top_borrowers: Vec<TopBorrower>,
}
