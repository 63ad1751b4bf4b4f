//! VocabMaster CLI
//!
//! Command-line interface for keeping a vocabulary list, filling it with
//! translations and examples, exporting Anki decks, and recovering from
//! backups.

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

mod config;
mod confirm;
mod llm;
mod tracing_setup;

use config::{resolve_pair, Config, ConfigPaths};
use confirm::TerminalDecider;
use tracing_setup::Verbosity;
use vocabmaster_llm_sync::{
    Decider, EnrichOutcome, EnrichReport, Enricher, FixedDecider, ReconciliationConfig,
    ResolutionPolicy, SyncEvent,
};
use vocabmaster_storage::backup::BackupManager;
use vocabmaster_storage::format::is_ai_response_file;
use vocabmaster_storage::migrate::{migrate_ai_response, migrate_vocabulary_backup};
use vocabmaster_storage::sanitize::sanitize_cell;
use vocabmaster_storage::{
    format_backup_timestamp, CsvRecordStore, DataLayout, DeckWriter, LanguagePair, PairMode,
    RestoreEngine, RestoreOutcome,
};

#[derive(Parser)]
#[command(name = "vocabmaster")]
#[command(author, version, about = "Vocabulary lists to Anki decks, with safe backups")]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output (also honors NO_COLOR)
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure a language pair and create its vocabulary file
    Setup {
        /// Language you are learning
        learn: String,
        /// Language translations are written in (same as LEARN for definitions)
        mother: String,
        /// Make this the default pair
        #[arg(long)]
        default: bool,
    },

    /// Add words to the vocabulary list
    Add {
        /// Language pair `learn:mother` (default pair if omitted)
        #[arg(short, long)]
        pair: Option<String>,
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Fill in translations and examples, then write the Anki deck
    #[command(group(ArgGroup::new("corrections").args(["yes", "no_corrections"])))]
    Translate {
        #[arg(short, long)]
        pair: Option<String>,
        /// Accept every unambiguous spelling correction
        #[arg(long)]
        yes: bool,
        /// Keep every original spelling
        #[arg(long)]
        no_corrections: bool,
        /// Use a saved generator response instead of calling the API
        #[arg(long, value_name = "FILE")]
        replay: Option<PathBuf>,
        /// Request timeout in seconds (0 disables)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Write the Anki deck from the current vocabulary list
    Anki {
        #[arg(short, long)]
        pair: Option<String>,
    },

    /// Show how many words are complete
    Stats {
        #[arg(short, long)]
        pair: Option<String>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configured language pairs
    Pairs {
        #[command(subcommand)]
        command: PairsCommands,
    },

    /// Inspect or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List, check and restore backups
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
}

#[derive(Subcommand)]
enum PairsCommands {
    /// List configured pairs
    List,
    /// Forget a pair (its files are kept)
    Remove { pair: String },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set the default pair
    #[command(name = "default")]
    SetDefault { pair: String },
    /// Set the data directory
    Dir { path: PathBuf },
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand)]
enum BackupCommands {
    /// List backups for a pair, oldest first
    List {
        #[arg(short, long)]
        pair: Option<String>,
    },

    /// Replace the vocabulary file with a backup
    #[command(group(ArgGroup::new("source").required(true).args(["file", "latest"])))]
    Restore {
        #[arg(short, long)]
        pair: Option<String>,
        /// Backup file (a bare filename is looked up in the pair's backup dir)
        file: Option<PathBuf>,
        /// Restore the newest vocabulary backup
        #[arg(long)]
        latest: bool,
        /// Don't ask before overwriting
        #[arg(long)]
        yes: bool,
    },

    /// Check that every vocabulary backup can be restored
    Validate {
        #[arg(short, long)]
        pair: Option<String>,
    },

    /// Upgrade a legacy backup to the current layout
    Migrate {
        file: PathBuf,
        /// Output path (default: FILE with `.migrated.bak`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

struct App {
    paths: ConfigPaths,
    config: Config,
}

impl App {
    fn load() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        let config = config::load(&paths)?;
        Ok(Self { paths, config })
    }

    fn save(&self) -> Result<()> {
        config::save(&self.paths, &self.config)
    }

    fn layout(&self) -> Result<DataLayout> {
        self.config.layout()
    }

    fn pair(&self, explicit: Option<&str>) -> Result<LanguagePair> {
        let pair = resolve_pair(explicit, &self.config)?;
        tracing::debug!(%pair, "resolved language pair");
        Ok(pair)
    }
}

fn main() {
    let cli = Cli::parse();
    let no_color = cli.no_color || tracing_setup::no_color_requested();
    if no_color {
        colored::control::set_override(false);
    }
    tracing_setup::init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet), no_color);

    if let Err(err) = run(cli.command) {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    let mut ctx = App::load()?;
    match command {
        Commands::Setup {
            learn,
            mother,
            default,
        } => cmd_setup(&mut ctx, &learn, &mother, default),
        Commands::Add { pair, words } => cmd_add(&ctx, pair.as_deref(), &words),
        Commands::Translate {
            pair,
            yes,
            no_corrections,
            replay,
            timeout,
        } => {
            let policy = if yes {
                ResolutionPolicy::AcceptAll
            } else if no_corrections {
                ResolutionPolicy::SkipAll
            } else {
                ResolutionPolicy::Prompt
            };
            cmd_translate(&ctx, pair.as_deref(), policy, replay.as_deref(), timeout)
        }
        Commands::Anki { pair } => cmd_anki(&ctx, pair.as_deref()),
        Commands::Stats { pair, json } => cmd_stats(&ctx, pair.as_deref(), json),
        Commands::Pairs { command } => match command {
            PairsCommands::List => cmd_pairs_list(&ctx),
            PairsCommands::Remove { pair } => cmd_pairs_remove(&mut ctx, &pair),
        },
        Commands::Config { command } => match command {
            ConfigCommands::SetDefault { pair } => cmd_config_default(&mut ctx, &pair),
            ConfigCommands::Dir { path } => cmd_config_dir(&mut ctx, &path),
            ConfigCommands::Show => cmd_config_show(&ctx),
        },
        Commands::Backup { command } => match command {
            BackupCommands::List { pair } => cmd_backup_list(&ctx, pair.as_deref()),
            BackupCommands::Restore {
                pair,
                file,
                latest,
                yes,
            } => cmd_backup_restore(&ctx, pair.as_deref(), file.as_deref(), latest, yes),
            BackupCommands::Validate { pair } => cmd_backup_validate(&ctx, pair.as_deref()),
            BackupCommands::Migrate { file, output } => {
                cmd_backup_migrate(&file, output.as_deref())
            }
        },
    }
}

// ============================================================================
// Vocabulary commands
// ============================================================================

fn cmd_setup(ctx: &mut App, learn: &str, mother: &str, make_default: bool) -> Result<()> {
    let pair = LanguagePair::new(learn, mother)?;
    let layout = ctx.layout()?;

    let store = CsvRecordStore::for_pair(&layout, &pair);
    store.ensure_header()?;
    let backup_dir = layout.backup_dir(&pair);
    std::fs::create_dir_all(&backup_dir)
        .with_context(|| format!("failed to create {}", backup_dir.display()))?;

    let added = ctx.config.add_pair(&pair, make_default);
    ctx.save()?;

    if added {
        println!("{} {}", "configured".green().bold(), pair.to_string().bold());
    } else {
        println!("{} is already configured", pair.to_string().bold());
    }
    if pair.mode() == PairMode::Definition {
        println!("  same-language pair: entries get definitions instead of translations");
    }
    println!("  vocabulary: {}", store.path().display());
    println!("  anki deck:  {}", layout.deck_path(&pair).display());
    println!("  backups:    {}", backup_dir.display());
    if ctx.config.default.as_ref() == Some(&pair) {
        println!("  {}", "default pair".cyan());
    }
    Ok(())
}

fn cmd_add(ctx: &App, pair: Option<&str>, words: &[String]) -> Result<()> {
    let pair = ctx.pair(pair)?;
    let store = CsvRecordStore::for_pair(&ctx.layout()?, &pair);

    for word in words {
        let candidate = sanitize_cell(word.trim());
        if candidate.is_empty() {
            eprintln!("{} skipping empty word", "warning:".yellow().bold());
            continue;
        }
        if store.word_exists(&candidate)? {
            println!("{} is already in the list", candidate.bold());
            continue;
        }
        let stored = store.append_word(word)?;
        println!("{} {}", "added".green().bold(), stored);
    }
    Ok(())
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::Requested { count } => {
            eprintln!("{} {count} word(s)...", "requesting".dimmed());
        }
        SyncEvent::ResponseCaptured {
            path,
            rejected_lines,
        } => {
            eprintln!("{} {}", "response saved to".dimmed(), path.display());
            if *rejected_lines > 0 {
                eprintln!(
                    "{} {rejected_lines} response line(s) could not be parsed",
                    "warning:".yellow().bold()
                );
            }
        }
        SyncEvent::Classified {
            mismatches,
            missing,
        } => {
            if *mismatches > 0 || *missing > 0 {
                eprintln!(
                    "{} {mismatches} spelling mismatch(es), {missing} word(s) missing from the response",
                    "review:".cyan().bold()
                );
            }
        }
        SyncEvent::Written { merged, path } => {
            eprintln!("{} {merged} row(s) to {}", "wrote".dimmed(), path.display());
        }
    }
}

fn print_enrich_report(report: &EnrichReport) {
    println!(
        "{} {} of {} word(s)",
        "filled".green().bold(),
        report.merged,
        report.requested.len()
    );
    for (from, to) in &report.renamed {
        println!("  corrected {from} -> {}", to.bold());
    }
    for word in &report.declined {
        println!("  kept {word} (correction declined)");
    }
    for word in &report.missing {
        println!("  {} {word} was not in the response", "missing:".yellow());
    }
}

fn cmd_translate(
    ctx: &App,
    pair: Option<&str>,
    policy: ResolutionPolicy,
    replay: Option<&Path>,
    timeout: Option<u64>,
) -> Result<()> {
    let pair = ctx.pair(pair)?;
    let layout = ctx.layout()?;

    let generator = llm::build_generator(replay, timeout)?;
    let mut enricher = Enricher::new(&layout, &pair, ReconciliationConfig { policy });
    enricher.on_event(Box::new(print_event));

    let mut decider = TerminalDecider::stdio();
    let enriched = enricher.run(generator.as_ref(), &mut decider);
    match &enriched {
        Ok(EnrichOutcome::NothingPending) => {
            println!("every word already has a translation and an example");
        }
        Ok(EnrichOutcome::Enriched(report)) => print_enrich_report(report),
        Err(_) => {
            eprintln!(
                "{} rebuilding the deck from the current list",
                "enrichment failed;".yellow().bold()
            );
        }
    }

    // The deck is rebuilt from whatever is on disk, even after a failed pass.
    cmd_anki_for(&layout, &pair)?;
    enriched.map(|_| ()).context("enrichment failed")
}

fn cmd_anki_for(layout: &DataLayout, pair: &LanguagePair) -> Result<()> {
    let summary = DeckWriter::new(layout).write(pair)?;
    println!(
        "{} {} card(s) to {}",
        "deck:".green().bold(),
        summary.cards,
        summary.path.display().to_string().bold()
    );
    Ok(())
}

fn cmd_anki(ctx: &App, pair: Option<&str>) -> Result<()> {
    let pair = ctx.pair(pair)?;
    cmd_anki_for(&ctx.layout()?, &pair)
}

fn cmd_stats(ctx: &App, pair: Option<&str>, json: bool) -> Result<()> {
    let pair = ctx.pair(pair)?;
    let store = CsvRecordStore::for_pair(&ctx.layout()?, &pair);
    if !store.exists() {
        return Err(anyhow!(
            "no vocabulary file for {pair} at {}",
            store.path().display()
        ));
    }
    let stats = store.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("{}", pair.to_string().bold());
    println!("  words:      {}", stats.total);
    println!("  translated: {}", stats.translated.to_string().green());
    println!("  pending:    {}", stats.pending.to_string().yellow());
    Ok(())
}

// ============================================================================
// Pairs and config
// ============================================================================

fn cmd_pairs_list(ctx: &App) -> Result<()> {
    if ctx.config.language_pairs.is_empty() {
        println!("no language pairs configured (run `vocabmaster setup <learn> <mother>`)");
        return Ok(());
    }
    for pair in &ctx.config.language_pairs {
        let marker = if ctx.config.default.as_ref() == Some(pair) {
            "*".green().bold().to_string()
        } else {
            " ".to_string()
        };
        let mode = match pair.mode() {
            PairMode::Translation => "translation",
            PairMode::Definition => "definition",
        };
        println!("{marker} {pair} ({mode})");
    }
    Ok(())
}

fn cmd_pairs_remove(ctx: &mut App, raw: &str) -> Result<()> {
    let pair: LanguagePair = raw
        .parse()
        .with_context(|| format!("invalid language pair {raw:?}"))?;
    if !ctx.config.remove_pair(&pair) {
        return Err(anyhow!("language pair {pair} is not configured"));
    }
    ctx.save()?;
    println!("{} {pair} (files left in place)", "removed".green().bold());
    Ok(())
}

fn cmd_config_default(ctx: &mut App, raw: &str) -> Result<()> {
    let pair: LanguagePair = raw
        .parse()
        .with_context(|| format!("invalid language pair {raw:?}"))?;
    ctx.config.set_default(&pair)?;
    ctx.save()?;
    println!("default pair is now {}", pair.to_string().bold());
    Ok(())
}

fn cmd_config_dir(ctx: &mut App, path: &Path) -> Result<()> {
    let dir = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    ctx.config.data_dir = Some(dir.clone());
    ctx.save()?;
    println!("data directory is now {}", dir.display().to_string().bold());
    Ok(())
}

fn cmd_config_show(ctx: &App) -> Result<()> {
    println!("config file:    {}", ctx.paths.config_file.display());
    println!("data directory: {}", ctx.config.data_dir()?.display());
    match &ctx.config.default {
        Some(pair) => println!("default pair:   {pair}"),
        None => println!("default pair:   (none)"),
    }
    println!("pairs:          {}", ctx.config.language_pairs.len());
    Ok(())
}

// ============================================================================
// Backup commands
// ============================================================================

fn cmd_backup_list(ctx: &App, pair: Option<&str>) -> Result<()> {
    let pair = ctx.pair(pair)?;
    let backups = BackupManager::for_pair(&ctx.layout()?, &pair);
    let entries = backups.list()?;
    if entries.is_empty() {
        println!("no backups in {}", backups.dir().display());
        return Ok(());
    }
    println!("backups in {}:", backups.dir().display());
    for entry in entries {
        let when = entry
            .timestamp
            .as_deref()
            .map(format_backup_timestamp)
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {:<19}  {:<16}  {:>8}  {}",
            when,
            entry.kind.label(),
            entry.size,
            entry.filename
        );
    }
    Ok(())
}

/// A bare name that doesn't exist relative to cwd is looked up in the
/// pair's backup directory.
fn locate_backup(backups: &BackupManager, file: &Path) -> PathBuf {
    if file.exists() || file.components().count() > 1 {
        return file.to_path_buf();
    }
    backups.dir().join(file)
}

fn cmd_backup_restore(
    ctx: &App,
    pair: Option<&str>,
    file: Option<&Path>,
    latest: bool,
    yes: bool,
) -> Result<()> {
    let pair = ctx.pair(pair)?;
    let engine = RestoreEngine::for_pair(&ctx.layout()?, &pair);

    let mut terminal;
    let mut fixed;
    let decider: &mut dyn Decider = if yes {
        fixed = FixedDecider::yes();
        &mut fixed
    } else {
        terminal = TerminalDecider::stdio();
        &mut terminal
    };

    let outcome = match file {
        Some(file) if !latest => {
            let path = locate_backup(engine.backups(), file);
            engine.restore(&path, decider)
        }
        _ => engine.restore_latest(decider),
    };

    match outcome {
        Ok(RestoreOutcome::Restored(restored)) => {
            println!(
                "{} {} row(s) into {}",
                "restored".green().bold(),
                restored.rows,
                restored.restored_path.display()
            );
            if let Some(format) = restored.migrated_from {
                println!("  converted from headerless {format} layout");
            }
            if let Some(snapshot) = restored.pre_restore_backup {
                println!("  previous file saved as {}", snapshot.display());
            }
            Ok(())
        }
        Ok(RestoreOutcome::Cancelled) => {
            println!("restore cancelled; nothing changed");
            Ok(())
        }
        Err(failure) => {
            if let Some(snapshot) = &failure.pre_restore_backup {
                eprintln!(
                    "{} the previous file was saved as {}",
                    "note:".cyan().bold(),
                    snapshot.display()
                );
            }
            Err(failure.into())
        }
    }
}

fn cmd_backup_validate(ctx: &App, pair: Option<&str>) -> Result<()> {
    let pair = ctx.pair(pair)?;
    let engine = RestoreEngine::for_pair(&ctx.layout()?, &pair);
    let audit = engine.validate_all()?;
    if audit.total == 0 {
        println!("no backups for {pair}");
        return Ok(());
    }
    for (entry, check) in &audit.results {
        if check.valid {
            println!(
                "  {} {} [{}] ({} rows)",
                "ok".green(),
                entry.filename,
                entry.kind,
                check.rows
            );
        } else {
            println!(
                "  {} {}: {}",
                "bad".red().bold(),
                entry.filename,
                check.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!(
        "{} valid, {} invalid, {} total",
        audit.valid, audit.invalid, audit.total
    );
    if audit.invalid > 0 {
        return Err(anyhow!("{} backup(s) failed validation", audit.invalid));
    }
    Ok(())
}

fn cmd_backup_migrate(file: &Path, output: Option<&Path>) -> Result<()> {
    let migration = if is_ai_response_file(file) {
        migrate_ai_response(file, output)?
    } else {
        migrate_vocabulary_backup(file, output)?
    };
    println!(
        "{} {} row(s) from {} layout to {}",
        "migrated".green().bold(),
        migration.rows_migrated,
        migration.original_format,
        migration.output_path.display()
    );
    Ok(())
}
