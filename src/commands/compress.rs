use super::{output_dir, prefixed_name, print_saved, Context};
use crate::delivery::Download;
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl CompressionLevel {
    /// Expected output size as a fraction of the input.
    pub fn ratio(self) -> f64 {
        match self {
            CompressionLevel::Low => 0.9,
            CompressionLevel::Medium => 0.7,
            CompressionLevel::High => 0.5,
            CompressionLevel::VeryHigh => 0.3,
        }
    }

    pub fn estimate(self, original_bytes: u64) -> u64 {
        (original_bytes as f64 * self.ratio()).round() as u64
    }
}

pub async fn run(
    ctx: &Context,
    input: &Path,
    level: CompressionLevel,
    password: Option<&str>,
    dir: Option<&Path>,
) -> Result<()> {
    let original = std::fs::metadata(input).map(|m| m.len()).unwrap_or(0);
    let mut doc = PdfDocument::open_with_password(input, password)?;
    let bytes = doc.recompress()?;
    let actual = bytes.len() as u64;

    let name = prefixed_name("compressed", input);
    let files = ctx
        .deliver(
            vec![Download::new(name, bytes)],
            &output_dir(dir, input),
            &ctx.operation(),
        )
        .await?;
    ctx.track_operation();
    print_saved(&files);

    println!("Original size: {}", format_size(original));
    println!(
        "Estimated size at {:?} level: {} (estimate only)",
        level,
        format_size(level.estimate(original))
    );
    println!("Re-serialized size: {}", format_size(actual));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.2} MB", b / (KB * KB))
    }
}
