use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use interstitial_compositor::{
    composition::CompositionEngine,
    config::Config,
};

#[derive(Parser)]
#[command(
    name = "interstitial-compositor",
    version,
    about = "Splice timed text cards into a video",
    long_about = "Interstitial-Compositor reads a list of `MM:SS message` annotations and produces a copy of the input video where, at each timestamp, a full-frame text card is shown for a few seconds before playback resumes."
)]
struct Cli {
    /// Input video file
    #[arg(short, long)]
    input: PathBuf,

    /// Annotation file, one `MM:SS message` entry per line
    #[arg(short, long)]
    annotations: PathBuf,

    /// Output video file path
    #[arg(short, long)]
    output: PathBuf,

    /// Card background color as hex (e.g. #1e1e1e)
    #[arg(short, long, default_value = "#000000", value_parser = parse_hex_color)]
    background: [u8; 3],

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Parse `#RRGGBB` or `RRGGBB` into an RGB triple
fn parse_hex_color(value: &str) -> std::result::Result<[u8; 3], String> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid background color '{}', expected #RRGGBB", value));
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase())),
        )
        .init();

    info!("Starting Interstitial-Compositor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    let engine = CompositionEngine::with_font_renderer(config)
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    match engine.process(&cli.input, &cli.annotations, &cli.output, cli.background) {
        Ok(report) => {
            info!("Inserted {} card(s); output is {:.1}s long",
                  report.fired_annotations, report.output_duration());
            Ok(())
        }
        Err(e) => {
            if e.leaves_partial_output() {
                warn!("{:?} was only partially written", cli.output);
            }
            Err(anyhow::anyhow!(e.user_message()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#1e90ff"), Ok([0x1e, 0x90, 0xff]));
        assert_eq!(parse_hex_color("000000"), Ok([0, 0, 0]));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
    }
}
