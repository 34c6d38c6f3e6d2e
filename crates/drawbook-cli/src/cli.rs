use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "drawbook")]
#[command(about = "Manage drawing pages and folders from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local draft cache
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for remote configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Work with drawing pages
    Page {
        #[command(subcommand)]
        command: PageCommands,
    },
    /// Work with folders
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },
    /// Inspect the local draft cache
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Search folder and page names
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum PageCommands {
    /// List pages
    List {
        /// Only pages in this folder
        #[arg(long, value_name = "FOLDER_ID", conflicts_with = "unfiled")]
        folder: Option<String>,
        /// Only pages without a folder
        #[arg(long)]
        unfiled: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which copy of a page would be loaded
    Show {
        /// Page ID
        id: String,
        /// Output as JSON, elements included
        #[arg(long)]
        json: bool,
    },
    /// Create a page
    #[command(alias = "add")]
    New {
        /// Page name
        name: Vec<String>,
        /// Folder to file the page under
        #[arg(long, value_name = "FOLDER_ID")]
        folder: Option<String>,
        /// Initial content: Excalidraw JSON (scene document or element array)
        #[arg(long, value_name = "PATH")]
        from: Option<PathBuf>,
    },
    /// Capture a scene file once and push it if it changed
    Save {
        /// Page ID
        id: String,
        /// Scene file to capture; `-` reads stdin
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
        /// New page name (keeps the current one when omitted)
        #[arg(long)]
        name: Option<String>,
    },
    /// Replace the local copy with the server copy
    Refresh {
        /// Page ID
        id: String,
        /// Discard a newer local draft without asking
        #[arg(long)]
        yes: bool,
        /// Write the refreshed elements to this file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Delete a page and its local draft
    Delete {
        /// Page ID
        id: String,
    },
    /// Export a page
    Export {
        /// Page ID
        id: String,
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Scene)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Write a Markdown index of folders and their pages
    Index {
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Autosave a scene file on an interval until interrupted
    Watch {
        /// Page ID
        id: String,
        /// Scene file standing in for the live canvas
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
        /// Page name to save with (defaults to the loaded name)
        #[arg(long)]
        name: Option<String>,
        /// Autosave interval in milliseconds
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum FolderCommands {
    /// List folders with page counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a folder
    New {
        /// Folder name
        name: Vec<String>,
        /// Emoji icon
        #[arg(long, default_value = "")]
        icon: String,
    },
    /// Rename a folder
    Rename {
        /// Folder ID
        id: String,
        /// New name
        name: Vec<String>,
    },
    /// Change a folder's icon
    Icon {
        /// Folder ID
        id: String,
        /// Emoji icon; empty clears it
        icon: String,
    },
    /// Delete a folder; its pages become unfiled
    Delete {
        /// Folder ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum DraftCommands {
    /// List cached drafts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop the cached draft of a page
    Discard {
        /// Page ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Owner of the pages and folders
        #[arg(long, value_name = "ID")]
        user_id: Option<String>,
        /// Autosave interval for `page watch`
        #[arg(long, value_name = "MS")]
        autosave_interval_ms: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Scene,
    Elements,
}

impl From<ExportFormat> for drawbook_core::export::ExportFormat {
    fn from(value: ExportFormat) -> Self {
        match value {
            ExportFormat::Scene => Self::Scene,
            ExportFormat::Elements => Self::Elements,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
