use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Clean up and redact the content streams of PDF pages.
#[derive(Debug, Parser)]
#[command(name = "pdfscrub", about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rewrite page content without redundant graphics state operators
    Clean {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Remove characters from page text, keeping the spacing of the rest
    Redact {
        #[command(flatten)]
        common: CommonArgs,

        /// Characters to remove (every glyph whose text is made only of these)
        #[arg(long, value_name = "CHARS")]
        remove: String,
    },
}

/// Arguments shared by every subcommand.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Path to the PDF file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Page range (e.g. '1,3-5'). Default: all pages
    #[arg(long)]
    pub pages: Option<String>,

    /// Output file. Default: FILE with a '-scrubbed' suffix
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Keep each page's resources instead of trimming them to what is used
    #[arg(long)]
    pub keep_resources: bool,

    /// Compress the rewritten streams
    #[arg(long)]
    pub compress: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Format of the per-page report written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One human-readable line per page
    Text,
    /// One JSON object per page (JSON Lines)
    Json,
}
