use anyhow::{Context, Result};
use batch_replace::config::{load_from_path, stage_plan};
use batch_replace::{CommitReport, FsAccess, ReplaceError, Session};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "batch-replace")]
#[command(about = "Stage find-and-replace edits across files and commit them at once", long_about = None)]
#[command(version)]
struct Cli {
    /// Log staging and commit details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a replacement plan
    Apply {
        /// Replacement plan (TOML)
        #[arg(short, long)]
        plan: PathBuf,

        /// Directory file patterns resolve against (default: current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Dry run - compute results without writing files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Print the commit report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the files a plan resolves to
    Files {
        /// Replacement plan (TOML)
        #[arg(short, long)]
        plan: PathBuf,

        /// Directory file patterns resolve against (default: current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Validate a plan without touching any file
    Check {
        /// Replacement plan (TOML)
        #[arg(short, long)]
        plan: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides; --verbose => debug; else warn
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Commands::Apply {
            plan,
            root,
            dry_run,
            json,
        } => cmd_apply(&plan, root, dry_run, json),

        Commands::Files { plan, root } => cmd_files(&plan, root),

        Commands::Check { plan } => cmd_check(&plan),
    }
}

/// Resolve the root directory
///
/// Priority order:
/// 1. Explicit --root flag
/// 2. BATCH_REPLACE_ROOT environment variable
/// 3. Current directory
fn resolve_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_root {
        return path
            .canonicalize()
            .with_context(|| format!("root directory not found: {}", path.display()));
    }

    if let Ok(env_root) = env::var("BATCH_REPLACE_ROOT") {
        let path = PathBuf::from(&env_root);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: BATCH_REPLACE_ROOT is set but path doesn't exist: {}",
                env_root
            )
            .yellow()
        );
    }

    Ok(env::current_dir()?)
}

fn display_path<'a>(root: &Path, file: &'a Path) -> std::path::Display<'a> {
    file.strip_prefix(root).unwrap_or(file).display()
}

fn cmd_apply(plan_path: &Path, root: Option<PathBuf>, dry_run: bool, json: bool) -> Result<()> {
    let root = resolve_root(root)?;
    let plan = load_from_path(plan_path)?;
    let access = FsAccess::new(&root)?;
    let root = access.root().to_path_buf();

    let staged = stage_plan(&plan, access)?;

    if !json {
        println!("Root: {}", root.display());
        println!("Plan: {}", plan_path.display());
        println!("Files: {}", staged.session.files().len());
        println!();
        for (id, count) in &staged.rule_counts {
            let marker = if *count > 0 { "✓".green() } else { "⊘".cyan() };
            println!("{} {}: {} edits staged", marker, id, count);
        }
        println!();
    }

    let report = if dry_run {
        if !json {
            println!("{}", "[DRY RUN - nothing will be written]".cyan());
        }
        staged.session.preview()
    } else {
        staged.session.commit()
    };

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            report_failure(&root, &e, dry_run);
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&root, &report, dry_run);
    Ok(())
}

fn report_failure(root: &Path, error: &ReplaceError, dry_run: bool) {
    eprintln!("{} {}", "✗".red(), error);
    if let ReplaceError::MixedGranularity { file } = error {
        eprintln!("  File: {}", display_path(root, file));
        eprintln!("  A file can receive file-scope or line-scope rules, not both.");
        if !dry_run {
            eprintln!("  Files before it in the list have already been written.");
        }
    }
}

fn print_report(root: &Path, report: &CommitReport, dry_run: bool) {
    for outcome in &report.files {
        let file = display_path(root, &outcome.file);
        if outcome.changed {
            let verb = if dry_run { "Would change" } else { "Changed" };
            println!("{} {} {} ({} edits)", "✓".green(), verb, file, outcome.edits);
        } else {
            println!("{} Unchanged {}", "⊙".yellow(), file);
        }
    }

    let changed = report.changed_files().count();
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} changed", format!("{}", changed).green());
    println!(
        "  {} unchanged",
        format!("{}", report.files.len() - changed).yellow()
    );
    println!("  {} edits replayed", report.total_edits());
}

fn cmd_files(plan_path: &Path, root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;
    let plan = load_from_path(plan_path)?;
    let access = FsAccess::new(&root)?;
    let root = access.root().to_path_buf();

    let session = Session::open(access, &plan.files)?;
    for file in session.files() {
        println!("{}", display_path(&root, file));
    }
    Ok(())
}

fn cmd_check(plan_path: &Path) -> Result<()> {
    let plan = load_from_path(plan_path)?;
    println!(
        "{} {}: {} rules over {} patterns",
        "✓".green(),
        plan_path.display(),
        plan.rules.len(),
        plan.files.len()
    );
    Ok(())
}
