//! # Built-in release workflow
//!
//! The task set the `anvil` binary ships with, for a Cargo project:
//!
//! | Task | Prerequisites | Does |
//! |------|---------------|------|
//! | `doc` | | `cargo doc --no-deps` |
//! | `lint` | | `cargo fmt --check`, `cargo clippy --all-targets` |
//! | `test` (default) | `lint` | `cargo test <args>` |
//! | `check-uncommitted` | | fails if `git status --porcelain` prints anything |
//! | `bump-version [base]` | | increments the manifest version and commits it |
//! | `generate-rst` | | converts markdown docs to `.rst` with pandoc, commits changes |
//! | `tag` | | `git tag -a` with the manifest version |
//! | `push` | | pushes commits, then tags |
//! | `release [base]` | `test` | calls check-uncommitted, bump-version, generate-rst, tag, push |
//! | `publish` | `test` | `cargo publish`, or `--dry-run` outside tagged builds |
//!
//! Program names and release settings come from [`Config`].

mod tools;
pub mod version;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Result};
use tracing::debug;

use crate::config::{Config, PublishConfig, ReleaseConfig};
use crate::domain::{EngineError, Registry, TaskContext};

pub use tools::Tool;

/// Shared state captured by the workflow task bodies
struct Workflow {
    cargo: Tool,
    git: Tool,
    pandoc: Tool,
    root: PathBuf,
    manifest: PathBuf,
    release: ReleaseConfig,
    publish: PublishConfig,
}

/// Builds the registry holding the built-in workflow
pub fn registry(config: &Config) -> Result<Registry, EngineError> {
    let wf = Rc::new(Workflow {
        cargo: Tool::new(&config.project.tools.cargo, &config.project_root),
        git: Tool::new(&config.project.tools.git, &config.project_root),
        pandoc: Tool::new(&config.project.tools.pandoc, &config.project_root),
        root: config.project_root.clone(),
        manifest: config.manifest_path(),
        release: config.project.release.clone(),
        publish: config.project.publish.clone(),
    });

    let mut registry = Registry::new();

    registry
        .task("doc")
        .describe("Generate API documentation")
        .run(with(&wf, |wf, _| wf.cargo.run(&["doc", "--no-deps"])))?;

    let lint = registry
        .task("lint")
        .describe("Check formatting and run clippy")
        .run(with(&wf, |wf, _| {
            wf.cargo.run(&["fmt", "--check"])?;
            wf.cargo.run(&["clippy", "--all-targets"])
        }))?;

    let test = registry
        .task("test")
        .describe("Run the test suite; arguments are passed to cargo test")
        .depends_on(&lint)
        .run(with(&wf, |wf, ctx| {
            let mut args = vec!["test".to_string()];
            args.extend(ctx.args().iter().cloned());
            wf.cargo.run(&args)
        }))?;

    registry
        .task("check-uncommitted")
        .describe("Fail if the working tree has uncommitted changes")
        .run(with(&wf, |wf, _| {
            let status = wf.git.output(&["status", "--porcelain"])?;
            if !status.trim().is_empty() {
                bail!("There are uncommitted files");
            }
            Ok(())
        }))?;

    registry
        .task("bump-version")
        .describe("Increment the manifest version and commit it")
        .run(with(&wf, |wf, ctx| bump_version(wf, ctx.arg(0))))?;

    registry
        .task("generate-rst")
        .describe("Convert markdown docs to reStructuredText and commit them")
        .run(with(&wf, |wf, _| generate_rst(wf)))?;

    registry
        .task("tag")
        .describe("Tag the current manifest version")
        .run(with(&wf, |wf, _| {
            let version = version::read(&wf.manifest)?;
            let tag = format!("{}{}", wf.release.tag_prefix, version);
            let message = format!("Tagging version {}", version);
            wf.git.run(&["tag", "-a", "-m", message.as_str(), tag.as_str()])
        }))?;

    registry
        .task("push")
        .describe("Push commits and tags")
        .run(with(&wf, |wf, _| {
            let remote = wf.release.remote.as_str();
            wf.git.run(&["push", "--verbose", remote])?;
            wf.git.run(&["push", "--tags", "--verbose", remote])
        }))?;

    registry
        .task("release")
        .describe("Bump, tag and push a new version")
        .depends_on(&test)
        .run(|ctx| {
            let base: Vec<String> = ctx.args().iter().take(1).cloned().collect();
            ctx.call::<&str>("check-uncommitted", &[])?;
            ctx.call("bump-version", &base)?;
            ctx.call::<&str>("generate-rst", &[])?;
            ctx.call::<&str>("tag", &[])?;
            ctx.call::<&str>("push", &[])?;
            Ok(())
        })?;

    registry
        .task("publish")
        .describe("Publish the crate (dry run unless building a tag)")
        .depends_on(&test)
        .run(with(&wf, |wf, _| {
            if wf.publish.is_release_build() {
                wf.cargo.run(&["publish"])
            } else {
                wf.cargo.run(&["publish", "--dry-run"])
            }
        }))?;

    registry.set_default(&test)?;

    Ok(registry)
}

/// Adapts a body taking the shared workflow state into a task body
fn with<F>(wf: &Rc<Workflow>, body: F) -> impl Fn(&mut TaskContext<'_>) -> Result<()> + 'static
where
    F: Fn(&Workflow, &mut TaskContext<'_>) -> Result<()> + 'static,
{
    let wf = Rc::clone(wf);
    move |ctx| body(&wf, ctx)
}

fn bump_version(wf: &Workflow, base: Option<&str>) -> Result<()> {
    let current = match base {
        Some(v) => v.to_string(),
        None => version::read(&wf.manifest)?,
    };

    let next = version::bump(&current)?;
    version::write(&wf.manifest, &next)?;
    println!("Version updated to {}", next);

    let manifest = wf.manifest.display().to_string();
    let message = format!("Version updated to {}", next);
    wf.git
        .run(&["commit", manifest.as_str(), "-m", message.as_str()])
}

fn generate_rst(wf: &Workflow) -> Result<()> {
    let mut generated = Vec::new();

    for source in &wf.release.markdown {
        if !wf.root.join(source).is_file() {
            debug!(file = %source.display(), "no such markdown file, skipping");
            continue;
        }

        let target = source.with_extension("rst");
        let (from, to) = (source.display().to_string(), target.display().to_string());
        wf.pandoc
            .run(&["-f", "markdown", "-t", "rst", "-o", to.as_str(), from.as_str()])?;
        generated.push(to);
    }

    if generated.is_empty() {
        return Ok(());
    }

    // The project root may sit below the repository root
    let mut diff_args = vec!["diff", "--name-only", "--relative", "--"];
    diff_args.extend(generated.iter().map(String::as_str));
    let diff = wf.git.output(&diff_args)?;
    let changed: Vec<&str> = diff.lines().map(str::trim).collect();

    let mut args = vec!["commit".to_string()];
    args.extend(generated.into_iter().filter(|f| changed.contains(&f.as_str())));
    if args.len() == 1 {
        return Ok(());
    }

    args.push("-m".to_string());
    args.push("Autogenerated from markdown files".to_string());
    wf.git.run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dispatcher, Invocation};

    fn task_names(registry: &Registry) -> Vec<&str> {
        registry.iter().map(|t| t.name().as_str()).collect()
    }

    #[test]
    fn registers_workflow() {
        let registry = registry(&Config::defaults(".")).unwrap();

        assert_eq!(
            task_names(&registry),
            vec![
                "doc",
                "lint",
                "test",
                "check-uncommitted",
                "bump-version",
                "generate-rst",
                "tag",
                "push",
                "release",
                "publish",
            ]
        );
        assert_eq!(registry.default_task().unwrap().name().as_str(), "test");
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn every_task_is_described() {
        let registry = registry(&Config::defaults(".")).unwrap();
        assert!(registry.iter().all(|t| t.description().is_some()));
    }

    #[test]
    fn release_plan_runs_tests_first() {
        let registry = registry(&Config::defaults(".")).unwrap();
        let plan = Dispatcher::new(&registry)
            .plan(&Invocation::new(Some("release".into()), vec![]))
            .unwrap();

        let names: Vec<_> = plan.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["lint", "test", "release"]);
    }
}
