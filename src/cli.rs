use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "declutter",
    about = "Deduplicate a folder and sort its files into AI-suggested subfolders",
    version,
    long_about = "Declutter finds byte-identical files in a folder, zips the extra\n\
                  copies into a backup, then asks a language model how the remaining\n\
                  files should be grouped and moves them into those subfolders.\n\n\
                  Only the top level of the folder is considered. Set GEMINI_API_KEY\n\
                  in your environment or in a .env file before classifying."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find duplicate files without changing anything
    Scan(ScanArgs),

    /// Zip duplicate files into a backup archive
    Archive(ArchiveArgs),

    /// Show how the model would sort the folder, without moving anything
    Classify(ClassifyArgs),

    /// Deduplicate, archive and sort the folder
    Organize(OrganizeArgs),

    /// Talk to the model about the folder, then sort with /sort
    Chat(ChatArgs),

    /// Show configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Folder to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Folder containing duplicates
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Leave duplicate files in place after archiving
    #[arg(long)]
    pub keep_originals: bool,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Folder to classify
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// How you would like the files grouped
    #[arg(short, long, default_value = "")]
    pub context: String,
}

#[derive(Args, Debug)]
pub struct OrganizeArgs {
    /// Folder to organize
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// How you would like the files grouped
    #[arg(short, long)]
    pub context: Option<String>,

    /// Leave duplicate files in place after archiving
    #[arg(long)]
    pub keep_originals: bool,

    /// Show the plan without archiving or moving
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Folder to talk about
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Leave duplicate files in place when sorting
    #[arg(long)]
    pub keep_originals: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the effective settings to the settings file
    #[arg(long)]
    pub save: bool,
}

impl Commands {
    /// Get the command name
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Scan(_) => "scan",
            Commands::Archive(_) => "archive",
            Commands::Classify(_) => "classify",
            Commands::Organize(_) => "organize",
            Commands::Chat(_) => "chat",
            Commands::Config(_) => "config",
        }
    }
}
