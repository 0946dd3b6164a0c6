use clap::Parser;
use std::process::ExitCode;

mod commands;

use commands::{run_trade, TradeArgs};

#[derive(Parser)]
#[command(name = "sentiment-trader")]
#[command(
    about = "Trade one OANDA instrument against retail client sentiment",
    long_about = "Reads the averaged client sentiment ratio for an instrument, derives a \
                  contrarian LONG/SHORT/FLAT bias and converges the account's open trades \
                  to it. Meant to be run once per cycle by an external scheduler."
)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    trade: TradeArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run_trade(cli.trade).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
