use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use std::path::{Path, PathBuf};
use tracing::info;
use declutter::cli::{self, Cli, Commands};
use declutter::{
    colors, logging, Archiver, Config, DuplicateResolver, DuplicateSet, GeminiClient,
    MoveOutcome, OrganizeOptions, OrganizeReport, Session,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    logging::init(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;
    info!(command = cli.command.name(), "starting");

    match cli.command {
        Commands::Scan(args) => handle_scan(&args),
        Commands::Archive(args) => handle_archive(&config, &args),
        Commands::Classify(args) => handle_classify(&config, &args),
        Commands::Organize(args) => handle_organize(&config, &args),
        Commands::Chat(args) => handle_chat(&config, &args),
        Commands::Config(args) => handle_config(&config, &args),
    }
}

fn folder(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn handle_scan(args: &cli::ScanArgs) -> Result<()> {
    let dir = folder(&args.path);
    println!("{} {}", "🔍 Scanning:".color(colors::HEADER), dir.display());

    let set = DuplicateResolver::new()
        .with_progress(true)
        .resolve(&dir)
        .context("Failed to scan directory")?;

    print_duplicates(&set, &dir);
    Ok(())
}

fn handle_archive(config: &Config, args: &cli::ArchiveArgs) -> Result<()> {
    let dir = folder(&args.path);
    let set = DuplicateResolver::new()
        .with_progress(true)
        .resolve(&dir)
        .context("Failed to scan directory")?;

    if !set.has_duplicates() {
        println!("{} No duplicates found ✨", "🎉".green());
        return Ok(());
    }

    let delete = config.delete_after_archive && !args.keep_originals;
    let outcome = Archiver::new(config.archive_name.clone())
        .with_progress(true)
        .archive(&set.duplicates, &dir, delete)
        .context("Failed to archive duplicates")?;

    println!("{} Zipped {} duplicate{} into: {}",
        "📦".green(),
        outcome.entries.len(),
        if outcome.entries.len() == 1 { "" } else { "s" },
        outcome.archive_path.display().to_string().color(colors::PATH));

    if !outcome.delete_failures.is_empty() {
        for (path, reason) in &outcome.delete_failures {
            println!("   {} could not remove {}: {}", "⚠️".yellow(), path.display(), reason.dimmed());
        }
        anyhow::bail!("{} archived duplicates could not be removed", outcome.delete_failures.len());
    }
    Ok(())
}

fn handle_classify(config: &Config, args: &cli::ClassifyArgs) -> Result<()> {
    let client = GeminiClient::from_config(config)?;
    let mut session = Session::open(folder(&args.path)).context("Failed to read folder")?;

    let options = OrganizeOptions {
        context: Some(args.context.clone()),
        dry_run: true,
        ..organize_options(config, false)
    };
    let report = session.organize(&client, &options).context("Classification failed")?;

    print_report(&report, session.dir());
    Ok(())
}

fn handle_organize(config: &Config, args: &cli::OrganizeArgs) -> Result<()> {
    let client = GeminiClient::from_config(config)?;
    let mut session = Session::open(folder(&args.path)).context("Failed to read folder")?;

    if session.records().is_empty() {
        println!("{} Nothing to sort in {}", "ℹ️".cyan(), session.dir().display());
        return Ok(());
    }

    if !args.dry_run && !args.yes {
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Sort {} files in {}?", session.records().len(), session.dir().display()))
            .default(false)
            .interact()?;
        if !proceed {
            println!("{} Cancelled", "✋".yellow());
            return Ok(());
        }
    }

    let options = OrganizeOptions {
        context: args.context.clone(),
        dry_run: args.dry_run,
        ..organize_options(config, args.keep_originals)
    };
    let report = session.organize(&client, &options).context("Organizing failed")?;

    print_report(&report, session.dir());
    finish(&report)
}

fn handle_chat(config: &Config, args: &cli::ChatArgs) -> Result<()> {
    let client = GeminiClient::from_config(config)?;
    let mut session = Session::open(folder(&args.path)).context("Failed to read folder")?;
    let theme = ColorfulTheme::default();

    println!("{} Hi! 👋 Ready to organize {} files in {}?",
        "AI:".color(colors::HEADER),
        session.records().len(),
        session.dir().display().to_string().color(colors::PATH));
    println!("{}", "Commands: /sort  /files  /reset  /quit".dimmed());

    loop {
        let message: String = Input::with_theme(&theme)
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;

        match message.trim() {
            "/quit" | "/exit" => return Ok(()),
            "/files" => {
                for record in session.records() {
                    println!("  {}", record.name.color(colors::PATH));
                }
            }
            "/reset" => {
                session.reset();
                session.refresh().context("Failed to read folder")?;
                println!("{} Hi again! 👋 Ready to sort?", "AI:".color(colors::HEADER));
            }
            "/sort" => {
                let options = organize_options(config, args.keep_originals);
                match session.organize(&client, &options) {
                    Ok(report) => {
                        print_report(&report, session.dir());
                        if report.is_complete() {
                            println!("{} 🎉 Files sorted! Want to do another folder?", "AI:".color(colors::HEADER));
                        }
                    }
                    Err(e) => println!("{} {}", "✖ Sort failed:".color(colors::ERROR), e),
                }
            }
            text => {
                if session.records().is_empty() {
                    println!("{} This folder has no files to talk about.", "AI:".color(colors::HEADER));
                    continue;
                }
                match session.send(&client, text) {
                    Ok(Some(reply)) => println!("{} {}", "AI:".color(colors::HEADER), reply),
                    Ok(None) => {}
                    Err(e) => println!("{} (Error: {})", "AI:".color(colors::HEADER), e),
                }
            }
        }
    }
}

fn handle_config(config: &Config, args: &cli::ConfigArgs) -> Result<()> {
    config.display();
    if args.save {
        let path = Config::config_path()?;
        config.save_to(&path).context("Failed to save configuration")?;
        println!("{} Saved to {}", "✅".green(), path.display());
    }
    Ok(())
}

fn organize_options(config: &Config, keep_originals: bool) -> OrganizeOptions {
    OrganizeOptions {
        delete_duplicates: config.delete_after_archive && !keep_originals,
        archive_name: config.archive_name.clone(),
        show_progress: true,
        ..OrganizeOptions::default()
    }
}

fn relative<'a>(path: &'a Path, dir: &Path) -> std::borrow::Cow<'a, str> {
    path.strip_prefix(dir).unwrap_or(path).to_string_lossy()
}

fn print_duplicates(set: &DuplicateSet, dir: &Path) {
    println!();
    println!("{}", "📊 DUPLICATES".bold().color(colors::HEADER));
    println!("{}", "─".repeat(50).color(colors::PATH));
    println!("📁 Files scanned: {}", set.total_files().to_string().color(colors::SUCCESS));
    println!("✅ Keepers: {}", set.keepers.len().to_string().color(colors::SUCCESS));
    println!("🔄 Duplicates: {}", set.duplicates.len().to_string().color(colors::WARNING));

    for dup in &set.duplicates {
        println!("   {}", relative(dup, dir).color(colors::PATH));
    }
}

fn print_report(report: &OrganizeReport, dir: &Path) {
    if report.duplicates.has_duplicates() {
        print_duplicates(&report.duplicates, dir);
    }

    if let Some(archive) = &report.archive {
        println!("{} Zipped duplicates into: {}",
            "📦".green(),
            archive.archive_path.display().to_string().color(colors::PATH));
        for (path, reason) in &archive.delete_failures {
            println!("   {} could not remove {}: {}", "⚠️".yellow(), relative(path, dir), reason.dimmed());
        }
    }

    println!();
    if report.classification.is_empty() {
        println!("{} No files to sort after duplicate cleanup.", "ℹ️".cyan());
        return;
    }

    println!("{}", "🗂️  PLAN".bold().color(colors::HEADER));
    println!("{}", "─".repeat(50).color(colors::PATH));
    for folder in report.classification.folders() {
        println!("{}/", folder.bold().color(colors::SUCCESS));
        for (name, _) in report.classification.iter().filter(|(_, f)| *f == folder) {
            println!("   {}", name.color(colors::PATH));
        }
    }

    let Some(moves) = &report.moves else {
        println!();
        println!("{} Dry run: nothing was moved", "🌵".yellow());
        return;
    };

    println!();
    let moved = moves.moved().count();
    println!("{} Moved {} file{}", "✔️".green(), moved, if moved == 1 { "" } else { "s" });
    for outcome in moves.failed() {
        if let MoveOutcome::Failed { file, folder, reason } = outcome {
            println!("   {} {} → {}/: {}", "✖".color(colors::ERROR), file, folder, reason.dimmed());
        }
    }
}

fn finish(report: &OrganizeReport) -> Result<()> {
    if report.is_complete() {
        if report.moves.is_some() {
            println!("{} Sorting complete", "🎉".green());
        }
        Ok(())
    } else {
        anyhow::bail!("some files could not be processed; see above")
    }
}
