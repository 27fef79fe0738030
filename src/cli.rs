use crate::commands::compress::CompressionLevel;
use crate::pdf::render::ImageFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdfsuite")]
#[command(about = "PDF utilities: extract, split, merge, rotate, convert, with MCP server support")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "PDFSUITE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server over stdio
    Mcp,

    /// Display PDF metadata
    Info {
        /// PDF file to inspect
        path: PathBuf,

        /// Password for encrypted files
        #[arg(long)]
        password: Option<String>,
    },

    /// Extract selected pages into new PDFs
    #[command(alias = "cat")]
    Extract {
        /// PDF file to extract from
        path: PathBuf,

        /// Pages: "1-3, 5, 7-9", "all" or "every N pages"
        #[arg(short, long)]
        pages: Option<String>,

        /// Individual pages to pick, in any order (e.g. 4,1,3)
        #[arg(long, value_delimiter = ',', conflicts_with = "pages")]
        pick: Option<Vec<u32>>,

        /// Write one file per comma-separated range
        #[arg(long)]
        per_range: bool,

        /// Password for encrypted files
        #[arg(long)]
        password: Option<String>,

        /// Output directory (default: next to the input)
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,
    },

    /// Split a PDF by ranges or into chunks of N pages
    #[command(alias = "burst")]
    Split {
        /// PDF file to split
        path: PathBuf,

        /// One file per range (e.g. "1-3, 5, 7-9")
        #[arg(long, conflicts_with = "every")]
        ranges: Option<String>,

        /// One file per N pages (default: every page)
        #[arg(long)]
        every: Option<u32>,

        /// Password for encrypted files
        #[arg(long)]
        password: Option<String>,

        /// Output directory (default: next to the input)
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,
    },

    /// Combine multiple PDFs into one, in the given order
    Merge {
        /// PDF files to merge
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, default_value = "merged.pdf")]
        output: PathBuf,
    },

    /// Rotate pages by 90, 180 or 270 degrees
    Rotate {
        /// PDF file to rotate
        path: PathBuf,

        /// Clockwise rotation in degrees
        #[arg(long, default_value_t = 90)]
        degrees: i64,

        /// Pages to rotate (default: all)
        #[arg(short, long)]
        pages: Option<String>,

        /// Individual pages to rotate (e.g. 4,1,3)
        #[arg(long, value_delimiter = ',', conflicts_with = "pages")]
        pick: Option<Vec<u32>>,

        /// Password for encrypted files
        #[arg(long)]
        password: Option<String>,

        /// Output directory (default: next to the input)
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,
    },

    /// Re-serialize a PDF with compressed streams and report the estimated size
    Compress {
        /// PDF file to compress
        path: PathBuf,

        /// Compression level; only changes the size estimate
        #[arg(short, long, value_enum, default_value_t)]
        level: CompressionLevel,

        /// Password for encrypted files
        #[arg(long)]
        password: Option<String>,

        /// Output directory (default: next to the input)
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,
    },

    /// Add password protection (not supported; validates and refuses)
    Protect {
        /// PDF file to protect
        path: PathBuf,

        /// New password
        #[arg(long)]
        password: String,

        /// The same password again
        #[arg(long)]
        confirm: String,
    },

    /// Remove password protection
    Unlock {
        /// Encrypted PDF file
        path: PathBuf,

        /// Current password
        #[arg(long)]
        password: String,

        /// Output directory (default: next to the input)
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,
    },

    /// Extract text from pages
    #[command(alias = "read-pages")]
    Text {
        /// PDF file to read
        path: PathBuf,

        /// Pages to read (default: all)
        #[arg(short, long)]
        pages: Option<String>,

        /// Individual pages to read (e.g. 4,1,3)
        #[arg(long, value_delimiter = ',', conflicts_with = "pages")]
        pick: Option<Vec<u32>>,

        /// Password for encrypted files
        #[arg(long)]
        password: Option<String>,

        /// Write to a .txt file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render pages to image files
    Images {
        /// PDF file to render
        path: PathBuf,

        /// Pages to render (default: all)
        #[arg(short, long)]
        pages: Option<String>,

        /// Individual pages to render (e.g. 4,1,3)
        #[arg(long, value_delimiter = ',', conflicts_with = "pages")]
        pick: Option<Vec<u32>>,

        /// Image format (default from config: png)
        #[arg(short, long, value_enum)]
        format: Option<ImageFormat>,

        /// Resolution (default from config: 150)
        #[arg(long)]
        dpi: Option<u32>,

        /// Password for encrypted files
        #[arg(long)]
        password: Option<String>,

        /// Output directory (default: next to the input)
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,
    },

    /// Build a PDF from images and text files
    Create {
        /// PNG, JPG or TXT files, or directories of them
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, default_value = "created.pdf")]
        output: PathBuf,
    },

    /// Show or reset the operation counter
    Stats {
        /// Reset the counter to zero
        #[arg(long)]
        reset: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pick_is_comma_separated() {
        let cli = Cli::try_parse_from(["pdfsuite", "extract", "a.pdf", "--pick", "4,1,3"]).unwrap();
        match cli.command {
            Commands::Extract { pick, .. } => assert_eq!(pick, Some(vec![4, 1, 3])),
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_pages_and_pick_conflict() {
        assert!(Cli::try_parse_from([
            "pdfsuite", "extract", "a.pdf", "--pages", "1", "--pick", "2"
        ])
        .is_err());
    }

    #[test]
    fn test_compress_level_names() {
        let cli = Cli::try_parse_from(["pdfsuite", "compress", "a.pdf", "-l", "very-high"]).unwrap();
        match cli.command {
            Commands::Compress { level, .. } => assert_eq!(level, CompressionLevel::VeryHigh),
            _ => panic!("expected compress"),
        }
    }
}
