use anyhow::bail;
use clap::Parser;
use flowdash_core::Config;
use flowdash_replay::{init_tracing, load_config, load_raw_ticks, MockContract, ReplayRunner};
use std::path::PathBuf;

/// Replay a tick file (or a mock contract feed) through the flow analytics engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raw tick file (JSON array or JSON lines)
    #[arg(short, long, conflicts_with = "mock")]
    ticks: Option<PathBuf>,

    /// Replay a built-in mock contract instead of a file
    #[arg(long, value_enum)]
    mock: Option<MockContract>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    init_tracing(&config.logging)?;

    let raws = match (&args.ticks, args.mock) {
        (Some(path), _) => load_raw_ticks(path)?,
        (None, Some(contract)) => {
            config.instrument.symbol = contract.symbol().to_string();
            config
                .instrument
                .reference_price
                .get_or_insert(contract.reference_price());
            contract.raw_ticks()?
        }
        (None, None) => bail!("one of --ticks or --mock is required"),
    };

    let output = ReplayRunner::new(config)?.run(raws)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{json}");

    Ok(())
}
