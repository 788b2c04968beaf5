//! Clean command: forget every recorded timestamp

use super::{CommandError, Session};
use convenient_rebuild::FsTimestampStore;

/// Remove all timestamp documents; the next build rebuilds everything
pub async fn execute(session: &Session) -> Result<usize, CommandError> {
    if !tokio::fs::try_exists(&session.store_dir).await? {
        println!("Nothing to clean in {}", session.store_dir.display());
        return Ok(0);
    }

    let store = FsTimestampStore::open(&session.store_dir).await?;
    let removed = store.clear().await?;
    println!(
        "🗑️  Removed {} timestamp records from {}",
        removed,
        session.store_dir.display()
    );
    Ok(removed)
}
