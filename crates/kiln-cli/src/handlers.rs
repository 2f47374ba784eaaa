//! Command handlers.

use crate::commands::OutputFormat;
use crate::config::CliContext;
use console::style;
use kiln_core::ports::{BuildBackend, CommandRunner, ReleaseSink, SecretProvider};
use kiln_core::run::{CheckResult, PipelineReport, ReleaseAsset};
use kiln_core::{EventKind, Platform, TAG_REF_PREFIX, TriggerEvent};
use kiln_package::{ArtifactPackager, Shrinker};
use kiln_publish::{DryRunSink, GithubReleaseSink, Publisher, asset_from_file};
use kiln_runner::{CargoBackend, OutputLine, OutputStream, RunnerConfig, ShellRunner};
use kiln_scheduler::{
    CheckStage, JobGraph, PipelineScheduler, ReleaseMatrix, ReleaseStage, TriggerGate,
};
use kiln_secrets::{ChainProvider, EnvProvider, FileProvider};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Run the full pipeline.
pub async fn run(
    ctx: &CliContext,
    event: Option<EventKind>,
    git_ref: Option<String>,
    dry_run: bool,
    format: OutputFormat,
) -> CliResult {
    let event = resolve_event(event, git_ref)?;
    let backend = backend(ctx);
    let scheduler = PipelineScheduler::new(
        &ctx.config,
        backend,
        packager(ctx),
        publisher(ctx, dry_run).await?,
        ctx.bench_archive(),
    )?;

    if format == OutputFormat::Table {
        println!(
            "\n{} Running pipeline for {} {}\n",
            style("▶").cyan().bold(),
            event.kind,
            style(&event.git_ref).bold()
        );
    }

    let report = scheduler.run(&event).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_report(&report),
    }

    if report.is_success() {
        Ok(())
    } else {
        Err("pipeline failed".into())
    }
}

/// Print the stages an event would activate.
pub fn gate(ctx: &CliContext, event: Option<EventKind>, git_ref: Option<String>) -> CliResult {
    let event = resolve_event(event, git_ref)?;
    let gate = TriggerGate::with_pattern(&ctx.config.tag_pattern);
    let decision = gate.decide(&event);

    println!("{} {} {}", style("Event:").bold(), event.kind, event.git_ref);
    println!("  pattern: {}", gate.pattern());
    println!("  check:   {}", yes_no(decision.run_check));
    println!("  release: {}", yes_no(decision.run_release));
    if let Some(tag) = event.tag_name().filter(|_| decision.run_release) {
        println!("  tag:     {}", tag);
    }
    Ok(())
}

/// Print the release matrix.
pub fn matrix(ctx: &CliContext, format: OutputFormat) -> CliResult {
    let matrix = ReleaseMatrix::from_config(&ctx.config);
    matrix.validate()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(matrix.entries())?);
        return Ok(());
    }

    println!(
        "{:<9} {:<8} {:<45} {:<18} {:<14} {:<6} {}",
        style("PLATFORM").bold(),
        style("BINARY").bold(),
        style("SOURCE").bold(),
        style("ARCHIVE").bold(),
        style("UPX ARGS").bold(),
        style("STRIP").bold(),
        style("FORMAT").bold()
    );
    for entry in matrix.entries() {
        println!(
            "{:<9} {:<8} {:<45} {:<18} {:<14} {:<6} {}",
            entry.platform.to_string(),
            entry.binary_file_name,
            entry.source_binary_path.display().to_string(),
            entry.archive_name,
            entry.compression_args,
            yes_no(entry.strip_symbols),
            entry.archive_format.extension()
        );
    }
    Ok(())
}

/// Print the job graph in execution order.
pub fn plan() -> CliResult {
    let graph = JobGraph::build(&Platform::ALL)?;

    for job in graph.topological_order()? {
        let after: Vec<String> = graph
            .predecessors(&job.name)
            .iter()
            .map(|p| p.name.clone())
            .collect();
        if after.is_empty() {
            println!("{}", style(&job.name).bold());
        } else {
            println!(
                "{} {} {}",
                style(&job.name).bold(),
                style("after").dim(),
                after.join(", ")
            );
        }
    }
    Ok(())
}

/// Run one platform's check job.
pub async fn check(ctx: &CliContext, platform: Platform) -> CliResult {
    let stage = CheckStage::new(backend(ctx), ctx.config.lint_platform);
    let result = stage.run_platform(platform).await;
    print_check(&result);

    if result.passed() {
        Ok(())
    } else {
        Err(format!("checks failed on {}", platform).into())
    }
}

/// Build and package one platform's release archive.
pub async fn release(ctx: &CliContext, platform: Platform) -> CliResult {
    let matrix = ReleaseMatrix::from_config(&ctx.config);
    matrix.validate()?;
    let entry = matrix
        .get(platform)
        .ok_or_else(|| format!("no release entry for {}", platform))?;

    info!(%platform, archive = %entry.archive_name, "Building release archive");
    let stage = ReleaseStage::new(backend(ctx), packager(ctx));
    let asset = stage.run_entry(entry).await?;
    print_asset(&asset);
    Ok(())
}

/// Publish the archives already present in the output directory.
pub async fn publish(ctx: &CliContext, tag: &str, dry_run: bool) -> CliResult {
    let tag = tag.strip_prefix(TAG_REF_PREFIX).unwrap_or(tag);
    let matrix = ReleaseMatrix::from_config(&ctx.config);
    matrix.validate()?;

    let output_dir = ctx.output_dir();
    let missing: Vec<&str> = matrix
        .archive_names()
        .into_iter()
        .filter(|name| !output_dir.join(name).is_file())
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "archives missing from {}: {}",
            output_dir.display(),
            missing.join(", ")
        )
        .into());
    }

    let mut archives = Vec::new();
    for name in matrix.archive_names() {
        archives.push(asset_from_file(&output_dir.join(name)).await?);
    }

    info!(tag, archives = archives.len(), dry_run, "Publishing release assets");
    let attached = publisher(ctx, dry_run)
        .await?
        .publish(tag, &archives, &ctx.bench_archive())
        .await?;

    println!(
        "{} Attached {} assets to {}",
        style("✓").green(),
        attached.len(),
        style(tag).bold()
    );
    for name in attached {
        println!("  {}", name);
    }
    Ok(())
}

fn resolve_event(event: Option<EventKind>, git_ref: Option<String>) -> CliResult<TriggerEvent> {
    match (event, git_ref) {
        (Some(kind), Some(git_ref)) => Ok(TriggerEvent::new(kind, git_ref)),
        (None, Some(git_ref)) if git_ref.starts_with(TAG_REF_PREFIX) => {
            Ok(TriggerEvent::new(EventKind::TagPush, git_ref))
        }
        (None, Some(git_ref)) => Ok(TriggerEvent::push(git_ref)),
        (Some(_), None) => Err("--event needs --ref".into()),
        (None, None) => TriggerEvent::from_env()
            .ok_or_else(|| "no trigger event: pass --ref or run inside a CI job".into()),
    }
}

fn runner(ctx: &CliContext) -> Arc<dyn CommandRunner> {
    let runner = ShellRunner::new(RunnerConfig::default());
    if !ctx.verbose {
        return Arc::new(runner);
    }

    let (tx, mut rx) = mpsc::channel::<OutputLine>(256);
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            match line.stream {
                OutputStream::Stdout => println!("  {}", style(&line.content).dim()),
                OutputStream::Stderr => eprintln!("  {}", style(&line.content).dim()),
            }
        }
    });
    Arc::new(runner.with_output(tx))
}

fn backend(ctx: &CliContext) -> Arc<dyn BuildBackend> {
    debug!(host = ?Platform::host(), "Using cargo backend");
    Arc::new(CargoBackend::new(
        runner(ctx),
        ctx.workspace.clone(),
        &ctx.config,
    ))
}

fn packager(ctx: &CliContext) -> Arc<ArtifactPackager> {
    Arc::new(ArtifactPackager::new(
        Shrinker::new(runner(ctx), &ctx.config),
        ctx.workspace.clone(),
        ctx.output_dir(),
    ))
}

async fn publisher(ctx: &CliContext, dry_run: bool) -> CliResult<Publisher> {
    let mut secrets = ChainProvider::new().with(Arc::new(EnvProvider));
    if let Some(path) = &ctx.secrets_file {
        secrets = secrets.with(Arc::new(FileProvider::load_from_file(path).await?));
    }
    let secrets: Arc<dyn SecretProvider> = Arc::new(secrets);
    debug!(secrets_file = ?ctx.secrets_file, dry_run, "Publisher wired");

    let sink: Arc<dyn ReleaseSink> = if dry_run {
        Arc::new(DryRunSink)
    } else {
        Arc::new(GithubReleaseSink::new(&ctx.config)?)
    };

    Ok(Publisher::new(
        sink,
        secrets,
        ctx.config.credential_secret.clone(),
    ))
}

fn print_report(report: &PipelineReport) {
    println!("{}", style("Checks").bold());
    for result in &report.checks.results {
        print_check(result);
    }

    let gate = if report.release_gate {
        style("open").green()
    } else {
        style("closed").dim()
    };
    println!("\n{} {}", style("Release gate:").bold(), gate);

    if !report.releases.is_empty() {
        println!("\n{}", style("Releases").bold());
        for release in &report.releases {
            match (&release.asset, &release.error) {
                (Some(asset), _) => print_asset(asset),
                (None, error) => println!(
                    "  {} {:<8} {}",
                    style("✗").red(),
                    release.platform.to_string(),
                    error.as_deref().unwrap_or("failed")
                ),
            }
        }
    }

    if let Some(publish) = &report.publish {
        println!("\n{}", style("Publish").bold());
        if publish.status.is_success() {
            println!(
                "  {} {}: {}",
                style("✓").green(),
                publish.tag,
                publish.assets.join(", ")
            );
        } else {
            println!(
                "  {} {}: {}",
                style("✗").red(),
                publish.tag,
                publish.error.as_deref().unwrap_or("not published")
            );
        }
    }

    let status = if report.is_success() {
        style("success").green().bold()
    } else {
        style("failure").red().bold()
    };
    println!(
        "\n{} {} in {}ms ({})",
        style("Pipeline").bold(),
        status,
        report.duration_ms,
        report.run_id
    );
}

fn print_check(result: &CheckResult) {
    let mark = if result.passed() {
        style("✓").green()
    } else {
        style("✗").red()
    };
    let mut steps = vec![
        step("compile", Some(result.compiled)),
        step("test", Some(result.tested)),
    ];
    if result.linted.is_some() {
        steps.push(step("lint", result.linted));
    }
    println!(
        "  {} {:<8} {}",
        mark,
        result.platform.to_string(),
        steps.join(" ")
    );
    if let Some(error) = &result.error {
        println!("    {}", style(error).red());
    }
}

fn step(name: &str, ok: Option<bool>) -> String {
    match ok {
        Some(true) => style(name).green().to_string(),
        Some(false) => style(name).red().to_string(),
        None => style(name).dim().to_string(),
    }
}

fn print_asset(asset: &ReleaseAsset) {
    println!(
        "  {} {:<18} {:>10} bytes  {}",
        style("✓").green(),
        asset.name,
        asset.size,
        style(&asset.sha256[..12.min(asset.sha256.len())]).dim()
    );
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_only_infers_event_kind() {
        let tag = resolve_event(None, Some("refs/tags/v1.2.0".to_string())).unwrap();
        assert_eq!(tag.kind, EventKind::TagPush);

        let branch = resolve_event(None, Some("refs/heads/main".to_string())).unwrap();
        assert_eq!(branch.kind, EventKind::Push);
    }

    #[test]
    fn test_explicit_event_kept() {
        let event = resolve_event(
            Some(EventKind::PullRequest),
            Some("refs/pull/7/merge".to_string()),
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::PullRequest);
    }

    #[test]
    fn test_event_without_ref_rejected() {
        assert!(resolve_event(Some(EventKind::Push), None).is_err());
    }
}
