// tests/commands.rs
mod common;
use crate::common::{init_tracing, lanes, TestResult};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use monorun::cli::Command;
use monorun::commands::{execute, list::render_unit_lines, Workspace};
use monorun::config::{ConfigFile, RawConfigFile};
use monorun::engine::{BatchRunner, ExecutionResult, MemorySink, RunMode};
use monorun::errors::MonorunError;
use monorun::exec::{ScriptExecutor, ScriptRequest};
use monorun::fs::mock::MockFileSystem;
use monorun::fs::FileSystem;
use monorun::registry::{DiscoveryOptions, Selection, UnitRegistry};
use monorun_test_utils::builders::{ManifestBuilder, WorkspaceBuilder};
use monorun_test_utils::fake_executor::FakeExecutor;

struct Options {
    filters: Vec<String>,
    mode: RunMode,
    dry_run: bool,
    config: ConfigFile,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            mode: RunMode::Parallel,
            dry_run: false,
            config: ConfigFile::default(),
        }
    }
}

fn workspace(
    fs: MockFileSystem,
    executor: Arc<dyn ScriptExecutor>,
    options: Options,
) -> Result<Workspace, MonorunError> {
    let registry = UnitRegistry::discover(
        &fs,
        Path::new("."),
        &DiscoveryOptions::from(&options.config.config),
    )?;
    let mut selection = Selection::from_filters(&registry, &options.filters)?;
    selection.propagate_to_dependencies(&registry);

    Ok(Workspace {
        root: PathBuf::from("."),
        config: options.config,
        fs: Arc::new(fs),
        registry,
        selection,
        runner: BatchRunner::with_sink(lanes(3), Arc::new(MemorySink::new())),
        executor,
        mode: options.mode,
        dry_run: options.dry_run,
    })
}

fn config_with_shared(name: &str) -> ConfigFile {
    let mut raw = RawConfigFile::default();
    raw.config.shared_config = Some(name.to_string());
    raw.commands.install = "pnpm install".to_string();
    ConfigFile::try_from(raw).expect("valid config")
}

/// app -> ui -> core; docs has no build script.
fn monorepo() -> WorkspaceBuilder {
    WorkspaceBuilder::new()
        .unit(
            "apps/app",
            ManifestBuilder::new("app")
                .script("build", "vite build")
                .script("test", "vitest run")
                .dependency("ui", "^1.0.0"),
        )
        .unit(
            "apps/docs",
            ManifestBuilder::new("docs").script("test", "vitest run"),
        )
        .unit(
            "packages/core",
            ManifestBuilder::new("core")
                .version("2.1.0")
                .script("build", "tsc")
                .script("clean", "rm -rf dist"),
        )
        .unit(
            "packages/ui",
            ManifestBuilder::new("ui")
                .version("1.4.0")
                .script("build", "tsc")
                .dependency("core", "^1.0.0")
                .dependency("react", "^18.2.0")
                .dev_dependency("app", "workspace:*"),
        )
}

/// Records, for each request, whether the shared config file was present in
/// the unit directory when the command started.
#[derive(Debug)]
struct ProbeExecutor {
    fs: MockFileSystem,
    file: &'static str,
    seen: Mutex<Vec<(String, bool)>>,
}

impl ScriptExecutor for ProbeExecutor {
    fn execute(
        &self,
        request: ScriptRequest,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + '_>> {
        Box::pin(async move {
            let present = self.fs.is_file(&request.cwd.join(self.file));
            self.seen.lock().unwrap().push((request.unit.clone(), present));
            ExecutionResult::success(&request.unit, Duration::ZERO)
        })
    }
}

fn manifest_json(fs: &MockFileSystem, dir: &str) -> Value {
    let path = WorkspaceBuilder::path(dir).join("package.json");
    let text = fs.read_to_string(&path).expect("manifest exists");
    serde_json::from_str(&text).expect("manifest is valid json")
}

#[tokio::test]
async fn run_executes_the_script_in_matched_units_that_declare_it() -> TestResult {
    init_tracing();

    let fake = FakeExecutor::new().into_arc();
    let ws = workspace(monorepo().build(), fake.clone(), Options::default())?;

    let ok = execute(&ws, &Command::Run { script: "test".into() }).await?;
    assert!(ok);

    let mut executed = fake.executed_units();
    executed.sort();
    assert_eq!(executed, vec!["app", "docs"]);

    let calls = fake.calls();
    assert!(calls.iter().all(|c| c.command == "vitest run"));
    Ok(())
}

#[tokio::test]
async fn run_fails_when_no_selected_unit_declares_the_script() -> TestResult {
    init_tracing();

    let fake = FakeExecutor::new().into_arc();
    let ws = workspace(monorepo().build(), fake.clone(), Options::default())?;

    let err = execute(&ws, &Command::Run { script: "deploy".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, MonorunError::UnknownScript(ref s) if s == "deploy"), "{err:?}");
    assert!(fake.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn a_failing_unit_makes_the_verdict_false() -> TestResult {
    init_tracing();

    let fake = FakeExecutor::new().failing("docs", 2).into_arc();
    let ws = workspace(monorepo().build(), fake.clone(), Options::default())?;

    let ok = execute(&ws, &Command::Run { script: "test".into() }).await?;
    assert!(!ok);
    assert_eq!(fake.calls().len(), 2);
    Ok(())
}

#[tokio::test]
async fn build_covers_the_local_dependency_closure_of_the_filter() -> TestResult {
    init_tracing();

    let fake = FakeExecutor::new().into_arc();
    let options = Options {
        filters: vec!["app".to_string()],
        ..Options::default()
    };
    let ws = workspace(monorepo().build(), fake.clone(), options)?;

    assert!(execute(&ws, &Command::Build).await?);

    let mut built = fake.executed_units();
    built.sort();
    assert_eq!(built, vec!["app", "core", "ui"]);
    Ok(())
}

#[tokio::test]
async fn clean_only_uses_matched_units_not_their_dependencies() -> TestResult {
    init_tracing();

    let fake = FakeExecutor::new().into_arc();
    let options = Options {
        filters: vec!["ui".to_string()],
        ..Options::default()
    };
    let ws = workspace(monorepo().build(), fake.clone(), options)?;

    // `ui` has no clean script and `core` is only marked for build.
    assert!(execute(&ws, &Command::Clean).await?);
    assert!(fake.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn sequential_mode_runs_in_discovery_order() -> TestResult {
    init_tracing();

    let fake = FakeExecutor::new()
        .with_delay("app", Duration::from_millis(30))
        .into_arc();
    let options = Options {
        mode: RunMode::Sequential,
        ..Options::default()
    };
    let ws = workspace(monorepo().build(), fake.clone(), options)?;

    assert!(execute(&ws, &Command::Build).await?);
    assert_eq!(fake.executed_units(), vec!["app", "core", "ui"]);
    assert_eq!(fake.max_in_flight(), 1);
    Ok(())
}

#[tokio::test]
async fn dry_run_executes_nothing() -> TestResult {
    init_tracing();

    let fake = FakeExecutor::new().into_arc();
    let fs = monorepo().file(".npmrc", "registry=x").build();
    let options = Options {
        dry_run: true,
        config: config_with_shared(".npmrc"),
        ..Options::default()
    };
    let before = fs.file_paths();
    let ws = workspace(fs.clone(), fake.clone(), options)?;

    for command in [
        Command::Build,
        Command::Run { script: "test".into() },
        Command::Install,
        Command::Sync,
    ] {
        assert!(execute(&ws, &command).await?, "{command:?}");
    }

    assert!(fake.calls().is_empty());
    assert_eq!(fs.file_paths(), before);
    assert_eq!(manifest_json(&fs, "packages/ui")["dependencies"]["core"], "^1.0.0");
    Ok(())
}

#[tokio::test]
async fn install_copies_shared_config_and_removes_it_afterwards() -> TestResult {
    init_tracing();

    let fs = monorepo()
        .file(".npmrc", "registry=https://npm.example.com")
        .file("apps/docs/.npmrc", "registry=https://docs.example.com")
        .build();
    let probe = Arc::new(ProbeExecutor {
        fs: fs.clone(),
        file: ".npmrc",
        seen: Mutex::new(Vec::new()),
    });
    let options = Options {
        config: config_with_shared(".npmrc"),
        ..Options::default()
    };
    let ws = workspace(fs.clone(), probe.clone(), options)?;

    assert!(execute(&ws, &Command::Install).await?);

    let mut seen = probe.seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("app".to_string(), true),
            ("core".to_string(), true),
            ("docs".to_string(), true),
            ("ui".to_string(), true),
        ]
    );

    // Copies are gone; the unit's own file and the source are untouched.
    assert!(!fs.exists(Path::new("./apps/app/.npmrc")));
    assert!(!fs.exists(Path::new("./packages/core/.npmrc")));
    assert!(!fs.exists(Path::new("./packages/ui/.npmrc")));
    assert_eq!(
        fs.read_to_string(Path::new("./apps/docs/.npmrc"))?,
        "registry=https://docs.example.com"
    );
    assert!(fs.exists(Path::new("./.npmrc")));
    Ok(())
}

#[tokio::test]
async fn install_cleans_up_even_when_a_unit_fails() -> TestResult {
    init_tracing();

    let fs = monorepo().file(".npmrc", "registry=x").build();
    let before = fs.file_paths();
    let fake = FakeExecutor::new().failing("core", 1).into_arc();
    let options = Options {
        config: config_with_shared(".npmrc"),
        ..Options::default()
    };
    let ws = workspace(fs.clone(), fake.clone(), options)?;

    assert!(!execute(&ws, &Command::Install).await?);
    assert_eq!(fake.calls().len(), 4);
    assert!(fake.calls().iter().all(|c| c.command == "pnpm install"));
    assert_eq!(fs.file_paths(), before);
    Ok(())
}

#[tokio::test]
async fn install_without_shared_config_just_runs_the_command() -> TestResult {
    init_tracing();

    let fs = monorepo().build();
    let before = fs.file_paths();
    let fake = FakeExecutor::new().into_arc();
    let ws = workspace(fs.clone(), fake.clone(), Options::default())?;

    assert!(execute(&ws, &Command::Install).await?);
    assert!(fake.calls().iter().all(|c| c.command == "npm install"));
    assert_eq!(fake.calls().len(), 4);
    assert_eq!(fs.file_paths(), before);
    Ok(())
}

#[tokio::test]
async fn sync_pins_local_dependencies_to_current_versions() -> TestResult {
    init_tracing();

    let fs = monorepo().build();
    let fake = FakeExecutor::new().into_arc();
    let ws = workspace(fs.clone(), fake.clone(), Options::default())?;

    assert!(execute(&ws, &Command::Sync).await?);

    let ui = manifest_json(&fs, "packages/ui");
    assert_eq!(ui["dependencies"]["core"], "^2.1.0");
    assert_eq!(ui["dependencies"]["react"], "^18.2.0");
    assert_eq!(ui["devDependencies"]["app"], "workspace:*");
    // Unknown keys survive the rewrite.
    assert_eq!(ui["private"], true);

    let app = manifest_json(&fs, "apps/app");
    assert_eq!(app["dependencies"]["ui"], "^1.4.0");

    assert!(fake.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn sync_leaves_up_to_date_manifests_byte_for_byte() -> TestResult {
    init_tracing();

    let fs = WorkspaceBuilder::new()
        .unit("a", ManifestBuilder::new("a").version("1.0.0"))
        .unit("b", ManifestBuilder::new("b").dependency("a", "~1.0.0"))
        .build();
    let path = WorkspaceBuilder::path("b/package.json");
    let original = fs.read_to_string(&path)?;

    let ws = workspace(fs.clone(), FakeExecutor::new().into_arc(), Options::default())?;
    assert!(execute(&ws, &Command::Sync).await?);

    assert_eq!(fs.read_to_string(&path)?, original);
    Ok(())
}

#[tokio::test]
async fn list_marks_matched_and_build_only_units() -> TestResult {
    init_tracing();
    monorun::color::disable_colors();

    let options = Options {
        filters: vec!["app".to_string()],
        ..Options::default()
    };
    let ws = workspace(monorepo().build(), FakeExecutor::new().into_arc(), options)?;

    let lines = render_unit_lines(&ws);
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("* app 1.0.0 "), "{}", lines[0]);
    assert!(lines[1].starts_with("  docs "), "{}", lines[1]);
    assert!(lines[2].starts_with("+ core 2.1.0 "), "{}", lines[2]);
    assert!(lines[3].starts_with("+ ui 1.4.0 "), "{}", lines[3]);
    assert!(lines[0].ends_with("[build, test]"), "{}", lines[0]);
    assert!(execute(&ws, &Command::List).await?);
    Ok(())
}
