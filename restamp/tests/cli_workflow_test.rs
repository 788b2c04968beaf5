//! End-to-end tests for the restamp commands against a scratch project

use clap::Parser;
use convenient_rebuild::{Mode, RebuildOutcome, RebuildReason};
use filetime::FileTime;
use restamp::commands::{self, Cli, Session};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MANIFEST: &str = r#"
mode: checked
artifacts:
  - output: dist/notes.txt
    inputs: [src/notes.md, src/footer.md]
    command: "cat src/notes.md src/footer.md > dist/notes.txt && echo run >> runs.log"
  - output: dist/copy.txt
    inputs: src/notes.md
    command: "cp src/notes.md dist/copy.txt"
"#;

struct Project {
    tmp: TempDir,
}

impl Project {
    fn new(manifest: &str) -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("restamp.yml"), manifest).unwrap();
        for name in ["notes.md", "footer.md"] {
            let path = tmp.path().join("src").join(name);
            std::fs::write(&path, format!("{name}\n")).unwrap();
            filetime::set_file_mtime(&path, FileTime::from_unix_time(1_000, 0)).unwrap();
        }
        Self { tmp }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.tmp.path().join(rel)
    }

    fn manifest(&self) -> String {
        self.path("restamp.yml").display().to_string()
    }

    async fn session(&self, extra: &[&str]) -> Session {
        let mut args = vec!["restamp".to_string(), "-m".to_string(), self.manifest()];
        args.extend(extra.iter().map(|s| (*s).to_string()));
        args.push("status".to_string());
        let cli = Cli::parse_from(args);
        Session::load(&cli).await.unwrap()
    }

    fn runs(&self) -> usize {
        std::fs::read_to_string(self.path("runs.log"))
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }
}

fn touch(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

#[tokio::test]
async fn test_second_build_is_a_noop() {
    let project = Project::new(MANIFEST);
    let session = project.session(&[]).await;

    commands::build::execute(&session, &[]).await.unwrap();
    assert_eq!(project.runs(), 1);
    assert_eq!(
        std::fs::read_to_string(project.path("dist/notes.txt")).unwrap(),
        "notes.md\nfooter.md\n"
    );
    assert!(project.path("dist/copy.txt").exists());
    assert!(project.path(".restamp").is_dir());

    commands::build::execute(&session, &[]).await.unwrap();
    assert_eq!(project.runs(), 1);
}

#[tokio::test]
async fn test_edited_input_rebuilds_only_dependents() {
    let project = Project::new(MANIFEST);
    let session = project.session(&[]).await;
    commands::build::execute(&session, &[]).await.unwrap();

    std::fs::write(project.path("src/footer.md"), "new footer\n").unwrap();
    touch(&project.path("src/footer.md"), 2_000);
    let copy_before = std::fs::metadata(project.path("dist/copy.txt"))
        .unwrap()
        .modified()
        .unwrap();

    // A fresh session bootstraps from the store written by the first build
    let session = project.session(&[]).await;
    commands::build::execute(&session, &[]).await.unwrap();

    assert_eq!(project.runs(), 2);
    assert!(
        std::fs::read_to_string(project.path("dist/notes.txt"))
            .unwrap()
            .ends_with("new footer\n")
    );
    let copy_after = std::fs::metadata(project.path("dist/copy.txt"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(copy_before, copy_after);
}

#[tokio::test]
async fn test_build_named_artifact() {
    let project = Project::new(MANIFEST);
    let session = project.session(&[]).await;

    commands::build::execute(&session, &["dist/copy.txt".to_string()])
        .await
        .unwrap();

    assert!(project.path("dist/copy.txt").exists());
    assert!(!project.path("dist/notes.txt").exists());
    assert!(
        commands::build::execute(&session, &["dist/unknown.txt".to_string()])
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_failing_command_fails_build() {
    let project = Project::new(
        r#"
artifacts:
  - output: dist/broken.txt
    inputs: src/notes.md
    command: "echo boom >&2; exit 3"
  - output: dist/lazy.txt
    inputs: src/notes.md
    command: "true"
"#,
    );
    let session = project.session(&[]).await;

    let err = commands::build::execute(&session, &[]).await.unwrap_err();
    assert_eq!(err.to_string(), "2 of 2 artifacts failed");
}

const CHAINED: &str = r#"
artifacts:
  - output: dist/page.txt
    inputs: build/notes.txt
    command: "cp build/notes.txt dist/page.txt"
  - output: build/notes.txt
    inputs: src/notes.md
    command: "cp src/notes.md build/notes.txt"
"#;

#[tokio::test]
async fn test_chained_artifact_builds_after_its_input() {
    let project = Project::new(CHAINED);
    let session = project.session(&[]).await;

    commands::build::execute(&session, &[]).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(project.path("dist/page.txt")).unwrap(),
        "notes.md\n"
    );

    commands::build::execute(&session, &[]).await.unwrap();
    std::fs::write(project.path("src/notes.md"), "edited\n").unwrap();
    touch(&project.path("src/notes.md"), 2_000);
    commands::build::execute(&session, &[]).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(project.path("dist/page.txt")).unwrap(),
        "edited\n"
    );
}

#[tokio::test]
async fn test_failed_input_artifact_skips_dependents() {
    let project = Project::new(
        r#"
artifacts:
  - output: dist/page.txt
    inputs: build/notes.txt
    command: "cp build/notes.txt dist/page.txt && echo run >> runs.log"
  - output: build/notes.txt
    inputs: src/notes.md
    command: "exit 1"
"#,
    );
    let session = project.session(&[]).await;

    let err = commands::build::execute(&session, &[]).await.unwrap_err();
    assert_eq!(err.to_string(), "2 of 2 artifacts failed");
    assert_eq!(project.runs(), 0);
}

#[tokio::test]
async fn test_cyclic_artifacts_rejected() {
    let project = Project::new(
        r#"
artifacts:
  - output: a.txt
    inputs: b.txt
    command: "cp b.txt a.txt"
  - output: b.txt
    inputs: a.txt
    command: "cp a.txt b.txt"
"#,
    );
    let session = project.session(&[]).await;

    let err = commands::build::execute(&session, &[]).await.unwrap_err();
    assert!(err.to_string().contains("dependency cycle"));
}

#[tokio::test]
async fn test_check_rebuilds_missing_output() {
    let project = Project::new(MANIFEST);
    let session = project.session(&[]).await;

    let outcome = commands::check::execute(&session, "dist/notes.txt").await.unwrap();
    assert_eq!(outcome, RebuildOutcome::NotRegistered);

    commands::build::execute(&session, &[]).await.unwrap();
    std::fs::remove_file(project.path("dist/notes.txt")).unwrap();

    let outcome = commands::check::execute(&session, "dist/notes.txt").await.unwrap();
    assert_eq!(outcome, RebuildOutcome::Rebuilt(RebuildReason::ArtifactMissing));
    assert!(project.path("dist/notes.txt").exists());
    assert_eq!(project.runs(), 2);
}

#[tokio::test]
async fn test_clean_forgets_timestamps() {
    let project = Project::new(MANIFEST);
    let session = project.session(&[]).await;
    commands::build::execute(&session, &[]).await.unwrap();

    let removed = commands::clean::execute(&session).await.unwrap();
    assert_eq!(removed, 2);

    commands::build::execute(&session, &[]).await.unwrap();
    assert_eq!(project.runs(), 2);
}

#[tokio::test]
async fn test_trusted_mode_always_runs_and_keeps_no_store() {
    let project = Project::new(MANIFEST);
    let session = project.session(&["--mode", "production"]).await;
    assert_eq!(session.config.mode, Mode::Trusted);

    commands::build::execute(&session, &[]).await.unwrap();
    commands::build::execute(&session, &[]).await.unwrap();

    assert_eq!(project.runs(), 2);
    assert!(!project.path(".restamp").exists());
}

#[tokio::test]
async fn test_store_override() {
    let project = Project::new(MANIFEST);
    let store = project.path("cache/stamps");
    let session = project
        .session(&["--store", &store.display().to_string()])
        .await;

    commands::build::execute(&session, &[]).await.unwrap();

    assert_eq!(std::fs::read_dir(&store).unwrap().count(), 2);
    assert!(!project.path(".restamp").exists());
}
