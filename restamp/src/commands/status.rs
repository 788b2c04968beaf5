//! Status command: report staleness without rebuilding

use super::{CommandError, Session};
use convenient_rebuild::{ArtifactStatus, NormalizedPath};
use std::collections::HashSet;

/// Print every recorded artifact with its status, then manifest artifacts
/// that were never built
pub async fn execute(session: &Session) -> Result<(), CommandError> {
    if !session.config.mode.performs_checks() {
        println!("Trusted mode keeps no timestamps; every build rebuilds");
        return Ok(());
    }

    let engine = session.engine().await?;
    let records = engine.entries().await;
    let mut recorded = HashSet::new();

    println!("📋 {} recorded artifacts in {}", records.len(), session.store_dir.display());
    for record in &records {
        let _ = recorded.insert(record.artifact.clone());
        match engine.status(&record.artifact).await {
            Ok(Some(ArtifactStatus::UpToDate)) => println!("  ✓ {} up to date", record.artifact),
            Ok(Some(ArtifactStatus::ArtifactMissing)) => println!("  ✗ {} missing", record.artifact),
            Ok(Some(ArtifactStatus::Stale { changed })) => {
                println!("  ✗ {} stale", record.artifact);
                for path in changed {
                    println!("      changed: {}", path);
                }
            }
            Ok(None) => {}
            Err(e) => println!("  ? {}: {}", record.artifact, e),
        }
    }

    for spec in &session.manifest.artifacts {
        let id = NormalizedPath::new(&spec.output)?;
        if !recorded.contains(&id) {
            println!("  - {} never built", id);
        }
    }
    Ok(())
}
