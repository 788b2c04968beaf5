//! Build command: register artifacts and rebuild the stale ones
//!
//! An artifact whose inputs include another selected artifact's output is
//! registered only after that artifact settled. Artifacts in the same wave
//! share no such edge and run concurrently.

use super::{CommandError, Session};
use crate::manifest::ArtifactSpec;
use crate::producer::command_action;
use convenient_rebuild::{EngineError, NormalizedPath, RebuildEngine, RebuildOutcome};
use futures::future::join_all;
use std::path::PathBuf;

enum Report {
    Done(Result<RebuildOutcome, EngineError>),
    Skipped { upstream: PathBuf },
}

/// Register the named artifacts (or all of them), wave by wave
pub async fn execute(session: &Session, names: &[String]) -> Result<(), CommandError> {
    let specs = session.manifest.select(names)?;
    if specs.is_empty() {
        println!("No artifacts declared in the manifest");
        return Ok(());
    }

    let upstream = upstream_of(&specs)?;
    let waves = plan_waves(&upstream).map_err(|stuck| {
        let outputs: Vec<String> = stuck
            .iter()
            .map(|&index| specs[index].output.display().to_string())
            .collect();
        format!("dependency cycle among {}", outputs.join(", "))
    })?;

    let engine = session.engine().await?;
    tracing::info!(
        "Building {} artifacts in {} waves in {} mode",
        specs.len(),
        waves.len(),
        engine.mode()
    );

    let mut reports: Vec<Option<Report>> = specs.iter().map(|_| None).collect();
    for wave in waves {
        let mut runnable = Vec::new();
        for index in wave {
            let failed_upstream = upstream[index].iter().find(|&&up| {
                !matches!(reports[up], Some(Report::Done(Ok(_))))
            });
            match failed_upstream {
                Some(&up) => {
                    reports[index] = Some(Report::Skipped {
                        upstream: specs[up].output.clone(),
                    });
                }
                None => runnable.push(index),
            }
        }

        let settled = join_all(runnable.into_iter().map(|index| {
            let engine: &RebuildEngine = &engine;
            let spec = specs[index];
            async move {
                let outcome = engine
                    .register(&spec.output, spec.inputs.paths(), command_action(spec))
                    .await;
                (index, outcome)
            }
        }))
        .await;
        for (index, outcome) in settled {
            reports[index] = Some(Report::Done(outcome));
        }
    }

    let mut failed = 0;
    for (spec, report) in specs.iter().zip(&reports) {
        match report {
            Some(Report::Done(Ok(RebuildOutcome::UpToDate))) => {
                println!("  ✓ {} (up to date)", spec.output.display());
            }
            Some(Report::Done(Ok(outcome))) => println!("  ✓ {} ({})", spec.output.display(), outcome),
            Some(Report::Done(Err(e))) => {
                failed += 1;
                println!("  ✗ {}: {}", spec.output.display(), e);
            }
            Some(Report::Skipped { upstream }) => {
                failed += 1;
                println!("  ✗ {}: skipped, {} failed", spec.output.display(), upstream.display());
            }
            None => failed += 1,
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} artifacts failed", failed, specs.len()).into());
    }
    Ok(())
}

/// For each spec, the indices of selected specs whose output it reads
fn upstream_of(specs: &[&ArtifactSpec]) -> Result<Vec<Vec<usize>>, CommandError> {
    let outputs = specs
        .iter()
        .map(|spec| NormalizedPath::new(&spec.output))
        .collect::<Result<Vec<_>, _>>()?;

    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let mut upstream = Vec::new();
            for input in spec.inputs.paths() {
                let input = NormalizedPath::new(input)?;
                upstream.extend(
                    outputs
                        .iter()
                        .enumerate()
                        .filter(|&(other, output)| other != index && *output == input)
                        .map(|(other, _)| other),
                );
            }
            Ok::<_, CommandError>(upstream)
        })
        .collect()
}

/// Group spec indices into waves; every upstream lands in an earlier wave
///
/// Fails with the indices that cannot be placed when they form a cycle.
fn plan_waves(upstream: &[Vec<usize>]) -> Result<Vec<Vec<usize>>, Vec<usize>> {
    let mut wave_of: Vec<Option<usize>> = vec![None; upstream.len()];
    let mut waves: Vec<Vec<usize>> = Vec::new();

    while wave_of.iter().any(Option::is_none) {
        let ready: Vec<usize> = (0..upstream.len())
            .filter(|&index| wave_of[index].is_none())
            .filter(|&index| {
                upstream[index]
                    .iter()
                    .all(|&up| wave_of[up].is_some())
            })
            .collect();

        if ready.is_empty() {
            return Err((0..upstream.len())
                .filter(|&index| wave_of[index].is_none())
                .collect());
        }
        for &index in &ready {
            wave_of[index] = Some(waves.len());
        }
        waves.push(ready);
    }
    Ok(waves)
}
