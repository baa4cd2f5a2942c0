// Render a single text card to PNG to check font, size and colors before a full run

use std::path::PathBuf;

use clap::Parser;
use interstitial_compositor::{
    config::Config,
    render::{FontRenderer, TextRenderer},
};

#[derive(Parser)]
#[command(name = "preview_card", about = "Render one interstitial card to a PNG file")]
struct Args {
    /// Message to render
    text: String,

    /// Output PNG path
    #[arg(short, long, default_value = "card_preview.png")]
    output: PathBuf,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Background as three comma-separated channels, e.g. 30,30,30
    #[arg(short, long, default_value = "0,0,0", value_delimiter = ',')]
    background: Vec<u8>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let background = match args.background.as_slice() {
        [r, g, b] => [*r, *g, *b],
        _ => anyhow::bail!("background needs exactly three channels"),
    };

    let renderer = FontRenderer::new(&config.interstitial)?;
    let card = renderer.render(&args.text, args.width, args.height, background)?;
    card.save_png(&args.output)?;

    println!("Card saved to: {}", args.output.display());
    Ok(())
}
