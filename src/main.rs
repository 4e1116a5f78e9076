//! Library circulation - snapshot check
//!
//! Opens the configured snapshot, reports what it holds and warns about any
//! broken invariant. Front ends embed the library crate directly.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_circulation::{config::AppConfig, Library};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("library_circulation={}", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting library-circulation v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Snapshot: {}", config.storage.data_file.display());

    let library = Library::open(config).await?;

    let stats = library.services.stats.statistics().await;
    tracing::info!(
        "{} books ({} copies on the shelf), {} members, {} transactions",
        stats.total_books,
        stats.available_books,
        stats.total_members,
        stats.total_transactions
    );
    tracing::info!(
        "{} books on loan, {} overdue, {} in fines recorded",
        stats.borrowed_books,
        stats.overdue_transactions,
        stats.total_fines
    );
    for borrower in &stats.top_borrowers {
        tracing::info!(
            "Top borrower {} ({}): {} transactions",
            borrower.name,
            borrower.member_id,
            borrower.transaction_count
        );
    }

    let issues = library.repository.read().await.integrity_report();
    if issues.is_empty() {
        tracing::info!("Snapshot is consistent");
    } else {
        for issue in &issues {
            tracing::warn!("Integrity: {}", issue);
        }
        anyhow::bail!("{} integrity issue(s) found", issues.len());
    }

    Ok(())
}
