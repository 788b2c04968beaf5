//! Check command: re-validate one recorded artifact

use super::{CommandError, Session};
use crate::producer::command_action;
use convenient_rebuild::RebuildOutcome;

/// Rebuild `name` with its manifest command if its recorded inputs moved or
/// the output is gone
pub async fn execute(session: &Session, name: &str) -> Result<RebuildOutcome, CommandError> {
    let spec = session.manifest.artifact(name)?;
    let engine = session.engine().await?;

    // Nothing is recorded in trusted mode, the manifest command always runs
    if !engine.mode().performs_checks() {
        let outcome = engine
            .register(&spec.output, spec.inputs.paths(), command_action(spec))
            .await?;
        println!("{}: {}", spec.output.display(), outcome);
        return Ok(outcome);
    }

    if !engine.attach_action(&spec.output, command_action(spec)).await? {
        println!(
            "{} has no recorded timestamps, run `restamp build` first",
            spec.output.display()
        );
        return Ok(RebuildOutcome::NotRegistered);
    }

    let outcome = engine.check_and_rebuild_if_stale(&spec.output).await?;
    println!("{}: {}", spec.output.display(), outcome);
    Ok(outcome)
}
