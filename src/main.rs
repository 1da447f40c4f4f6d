//! treemerge - consolidate scattered directory trees into one.
//!
//! Usage:
//!   tmg -d TARGET SOURCE...    Move every source file into TARGET, dropping duplicates
//!   tmg -a TARGET SOURCE...    Clean junk, names and permissions, then consolidate
//!   tmg -e -t TARGET           Only delete empty and temporary files
//!   tmg --help                 Show help

mod logging;
mod prompt;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::warn;

use treemerge_core::{
    AutoConfirm, Confirm, ConsolidateConfig, DEFAULT_RULES_FILE, DeleteMode, NameConflictPolicy,
    RuleConfig,
};
use treemerge_engine::{ConsolidationEngine, ConsolidationReport};
use treemerge_ops::{
    ActionExecutor, JunkOptions, PassSummary, normalize_permissions, remove_junk,
    sanitize_names,
};

use crate::prompt::TerminalPrompt;

#[derive(Parser)]
#[command(
    name = "treemerge",
    version,
    about = "Consolidate scattered directory trees into one",
    long_about = "treemerge moves every file from the source directories into the target \
                  directory. Files whose content already exists in the target are removed, \
                  same-name files keep the newer version, everything else is moved in.\n\n\
                  Cleanup passes run first, in this order: junk removal (-e, -t), name \
                  sanitizing (-s), permission normalization (-p), then consolidation (-d)."
)]
struct Cli {
    /// Target directory everything is merged into
    target: PathBuf,

    /// Source directories, processed in the order given
    sources: Vec<PathBuf>,

    /// Consolidate sources into the target, removing duplicates
    #[arg(short = 'd', long)]
    duplicates: bool,

    /// Delete empty files
    #[arg(short = 'e', long)]
    empty: bool,

    /// Delete temporary files (suffixes from the rule file)
    #[arg(short = 't', long)]
    temporary: bool,

    /// Replace tricky characters in file names
    #[arg(short = 's', long)]
    sanitize: bool,

    /// Normalize file permissions to the rule file mode
    #[arg(short = 'p', long)]
    permissions: bool,

    /// All of the above
    #[arg(short = 'a', long)]
    all: bool,

    /// Rule file
    #[arg(short = 'c', long, default_value = DEFAULT_RULES_FILE)]
    config: PathBuf,

    /// Answer yes to every question
    #[arg(short = 'y', long)]
    yes: bool,

    /// Keep both files on a name conflict, renaming the incoming one
    #[arg(long)]
    rename_conflicts: bool,

    /// Move removed files to the trash instead of deleting them
    #[arg(long)]
    trash: bool,

    /// Glob pattern for names to leave alone during consolidation (repeatable)
    #[arg(short = 'i', long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Follow symbolic links while scanning
    #[arg(long)]
    follow_symlinks: bool,

    /// Output format of the consolidation report
    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Passes selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Actions {
    junk: JunkOptions,
    sanitize: bool,
    permissions: bool,
    consolidate: bool,
}

impl Cli {
    fn actions(&self) -> Actions {
        Actions {
            junk: JunkOptions {
                empty: self.all || self.empty,
                temporary: self.all || self.temporary,
            },
            sanitize: self.all || self.sanitize,
            permissions: self.all || self.permissions,
            consolidate: self.all || self.duplicates,
        }
    }

    fn roots(&self) -> Vec<PathBuf> {
        std::iter::once(self.target.clone())
            .chain(self.sources.iter().cloned())
            .collect()
    }

    fn delete_mode(&self) -> DeleteMode {
        if self.trash {
            DeleteMode::Trash
        } else {
            DeleteMode::Permanent
        }
    }

    fn consolidate_config(&self) -> Result<ConsolidateConfig> {
        let policy = if self.rename_conflicts {
            NameConflictPolicy::Rename
        } else {
            NameConflictPolicy::KeepNewest
        };

        ConsolidateConfig::builder()
            .target(self.target.clone())
            .sources(self.sources.clone())
            .name_conflicts(policy)
            .delete_mode(self.delete_mode())
            .follow_symlinks(self.follow_symlinks)
            .ignore_patterns(self.ignore.clone())
            .build()
            .wrap_err("Invalid consolidation settings")
    }
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let actions = cli.actions();
    if actions == Actions::default() {
        warn!("No action selected, nothing to do (see --help)");
        return Ok(ExitCode::SUCCESS);
    }

    let rules = match RuleConfig::load(&cli.config) {
        Ok(rules) => rules,
        Err(e) => {
            warn!(error = %e, "Falling back to built-in rules");
            RuleConfig::default()
        }
    };

    let mut confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(TerminalPrompt::new())
    };
    let executor = ActionExecutor::new().with_delete_mode(cli.delete_mode());
    let roots = cli.roots();
    let mut failed = false;

    if actions.junk != JunkOptions::default() {
        let summary = remove_junk(&roots, &rules, actions.junk, &executor, confirm.as_mut());
        failed |= print_summary("Junk removal", &summary);
    }
    if actions.sanitize {
        let summary = sanitize_names(&roots, &rules, &executor, confirm.as_mut());
        failed |= print_summary("Name sanitizing", &summary);
    }
    if actions.permissions {
        let summary = normalize_permissions(&roots, &rules, confirm.as_mut());
        failed |= print_summary("Permission fixes", &summary);
    }

    if actions.consolidate {
        if cli.sources.is_empty() {
            warn!("No source directories given, skipping consolidation");
        } else {
            let engine = ConsolidationEngine::new(cli.consolidate_config()?, confirm.as_mut())
                .with_cancel_flag(interrupt_flag());
            let report = engine
                .run()
                .wrap_err_with(|| format!("Cannot read target {}", cli.target.display()))?;

            match cli.format {
                OutputFormat::Text => print_report(&report),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
            failed |= report.has_errors();
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Flag set by the first Ctrl-C. A second Ctrl-C exits immediately.
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));

    #[cfg(unix)]
    {
        use signal_hook::consts::SIGINT;
        use signal_hook::flag;

        let registered = flag::register_conditional_shutdown(SIGINT, 130, Arc::clone(&flag))
            .and_then(|_| flag::register(SIGINT, Arc::clone(&flag)));
        if let Err(e) = registered {
            warn!(error = %e, "Cannot install Ctrl-C handler");
        }
    }

    flag
}

/// Print a cleanup pass summary to stderr. Returns whether it had errors.
fn print_summary(label: &str, summary: &PassSummary) -> bool {
    eprintln!(
        "{label}: {} done, {} declined, {} failed{}",
        summary.succeeded,
        summary.declined,
        summary.failed,
        if summary.bytes_processed > 0 {
            format!(" ({} freed)", format_size(summary.bytes_processed))
        } else {
            String::new()
        }
    );
    for error in &summary.errors {
        eprintln!("  {}: {}", error.path.display(), error.message);
    }
    summary.has_errors()
}

fn print_report(report: &ConsolidationReport) {
    let stats = &report.stats;

    println!();
    println!("{}", "─".repeat(60));
    println!(" Consolidated into {}", report.target.display());
    println!("{}", "─".repeat(60));
    println!(" {} files examined in {:.2}s", stats.files_seen, report.duration.as_secs_f64());
    println!("   moved in           {:>8}", stats.moved);
    println!("   renamed in         {:>8}", stats.renamed);
    println!("   overwrote older    {:>8}", stats.overwritten);
    println!("   duplicates removed {:>8}", stats.duplicates_skipped);
    println!("   older discarded    {:>8}", stats.older_discarded);
    println!("   declined           {:>8}", stats.denied);
    println!("   failed             {:>8}", stats.failed);
    println!(
        " {} moved, {} reclaimed",
        format_size(stats.bytes_moved),
        format_size(stats.bytes_reclaimed)
    );
    if report.cancelled {
        println!(" Run was interrupted; remaining files were left in place.");
    }

    if !report.warnings.is_empty() {
        println!();
        println!("{} warning(s):", report.warnings.len());
        for warning in &report.warnings {
            println!("  {warning}");
        }
    }
    if report.has_errors() {
        println!();
        println!("{} error(s):", report.errors.len());
        for error in &report.errors {
            println!("  {error}");
        }
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
