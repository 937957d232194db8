//! Breeze Engine CLI
//!
//! Offline inspection tool for candidate files and cheat scripts.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use breeze_engine::annotate::{self, NoteStyle, NullDisassembler};
use breeze_engine::cheat::{codec, CheatService, MemoryCheatService};
use breeze_engine::format::{self, display_value};
use breeze_engine::process::ProcessMetadata;
use breeze_engine::{index, summarize_candidate};
use clap::{Parser, Subcommand, ValueEnum};

/// Offline inspector for candidate files and cheat scripts.
///
/// Validates candidate headers, dumps recorded candidates, lists
/// candidate directories, and compiles or annotates cheat text.
#[derive(Parser, Debug)]
#[command(name = "breeze-inspect")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long, default_value = "human", global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate candidate files and print their header summaries
    Info {
        /// Candidate `.dat` file(s)
        files: Vec<PathBuf>,
    },
    /// Dump the candidate records of a file
    Records {
        /// Candidate `.dat` file
        file: PathBuf,
        /// Maximum records to print
        #[arg(short, long, default_value = "32")]
        limit: usize,
    },
    /// List candidate files across roots, deduplicated by stem
    List {
        /// Candidate directories; defaults to the conventional aliased
        /// roots
        roots: Vec<PathBuf>,
    },
    /// Compile a cheat file and print one note per instruction
    Annotate {
        /// Cheat text file
        file: PathBuf,
        /// Compact notes instead of verbose ones
        #[arg(short, long)]
        minimal: bool,
    },
    /// Compile a cheat file and re-emit it in canonical form
    Check {
        /// Cheat text file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("breeze_engine=debug,breeze_inspect=debug")
            .init();
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    match &args.command {
        Command::Info { files } => {
            for path in files {
                info(path, args.format)?;
            }
            Ok(())
        }
        Command::Records { file, limit } => records(file, *limit),
        Command::List { roots } => list(roots),
        Command::Annotate { file, minimal } => annotate_file(file, *minimal),
        Command::Check { file } => check(file),
    }
}

fn info(path: &PathBuf, format: OutputFormat) -> anyhow::Result<()> {
    let summary = summarize_candidate(path)
        .with_context(|| format!("invalid candidate file {}", path.display()))?;
    tracing::debug!(?path, "header validated");

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Human => {
            println!("{}:", path.display());
            println!("  Type:       {}", summary.file_type);
            println!(
                "  Condition:  {} {} (step {})",
                summary.ty, summary.mode, summary.step
            );
            if !summary.pre_filename.is_empty() {
                println!("  Refined:    {}", summary.pre_filename);
            }
            println!(
                "  Records:    {} ({} bytes, {}s)",
                summary.records, summary.data_size, summary.time_taken
            );
            println!("  Process:    TID {} BID {}", summary.title_id, summary.build_id);
            if summary.has_screenshot {
                println!("  Screenshot: attached");
            }
        }
    }
    Ok(())
}

fn records(path: &PathBuf, limit: usize) -> anyhow::Result<()> {
    let (header, records) = format::read_all_records(path)
        .with_context(|| format!("invalid candidate file {}", path.display()))?;
    let ty = header.condition.ty;

    for record in records.iter().take(limit) {
        println!(
            "0x{:010X}  0x{:X}",
            record.address,
            display_value(record.value, ty)
        );
    }
    if records.len() > limit {
        println!("... {} more", records.len() - limit);
    }
    Ok(())
}

fn list(roots: &[PathBuf]) -> anyhow::Result<()> {
    let defaults;
    let roots: &[PathBuf] = if roots.is_empty() {
        defaults = index::default_roots();
        defaults.as_slice()
    } else {
        roots
    };
    let files = index::list_candidates(roots);
    if files.is_empty() {
        println!("no candidate files found");
        return Ok(());
    }

    let latest = index::load_latest_condition(roots).ok();
    for file in &files {
        let marker = match &latest {
            Some((_, path)) if path == file => " (latest)",
            _ => "",
        };
        match summarize_candidate(file) {
            Ok(summary) => println!(
                "{}  {} {} {} records{}",
                file.display(),
                summary.ty,
                summary.mode,
                summary.records,
                marker
            ),
            Err(e) => println!("{}  invalid: {}", file.display(), e),
        }
    }
    Ok(())
}

fn compile(path: &PathBuf) -> anyhow::Result<MemoryCheatService> {
    let data =
        std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let mut service = MemoryCheatService::new();
    codec::parse_cheat_text(&data, &mut service)
        .with_context(|| format!("cheat file {} failed to compile", path.display()))?;
    Ok(service)
}

fn annotate_file(path: &PathBuf, minimal: bool) -> anyhow::Result<()> {
    let service = compile(path)?;
    let style = if minimal {
        NoteStyle::Minimal
    } else {
        NoteStyle::Verbose
    };

    for entry in service.cheats()? {
        let braces = if entry.is_master() { "{}" } else { "[]" };
        println!(
            "{}{}{}",
            &braces[..1],
            entry.definition.name,
            &braces[1..]
        );
        for note in annotate::notes(&entry.definition.opcodes, style, &NullDisassembler) {
            println!("  {note}");
        }
        println!();
    }
    Ok(())
}

fn check(path: &PathBuf) -> anyhow::Result<()> {
    let service = compile(path)?;
    let count = service.cheats()?.len();
    tracing::debug!(count, "cheat file compiled");
    print!(
        "{}",
        codec::render_cheat_list(&service, &ProcessMetadata::default())?
    );
    eprintln!("{count} cheats ok");
    Ok(())
}
