//! Runs one decision cycle: read sentiment, decide, converge OANDA trades.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use sentiment_trader_core::{
    ActionOutcome, AppConfig, CloseStatus, ConfigLoader, CycleError, CycleParams, CycleReport,
    SourceBackend, TradeError, TradingCycle,
};
use sentiment_trader_oanda::OandaClient;
use sentiment_trader_signals::build_source;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

/// Sentiment backend selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Clickhouse,
    Fxbold,
    Mongo,
}

impl From<BackendArg> for SourceBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Clickhouse => SourceBackend::Clickhouse,
            BackendArg::Fxbold => SourceBackend::Fxbold,
            BackendArg::Mongo => SourceBackend::Mongo,
        }
    }
}

/// Arguments for a trading cycle.
#[derive(Args, Debug)]
pub struct TradeArgs {
    /// OANDA account id (e.g. 101-004-1234567-001).
    #[arg(long, env = "OANDA_ACCOUNT_ID")]
    pub account: Option<String>,

    /// Instrument as entered (EURUSD, EUR_USD, XAUUSD, SPX500_USD).
    #[arg(long)]
    pub symbol: String,

    /// Sentiment data provider, e.g. "xm" or "fxblue".
    #[arg(long)]
    pub source: Option<String>,

    /// Sentiment lookback window in minutes.
    #[arg(long)]
    pub timeframe: Option<u32>,

    /// Units for a new position.
    #[arg(long)]
    pub units: Decimal,

    /// Minimum rounded ratio magnitude for a directional bias.
    #[arg(long, alias = "treshold")]
    pub threshold: Option<f64>,

    /// Sentiment backend; overrides the config file.
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Config file path.
    #[arg(short, long, default_value = "config/Config.toml")]
    pub config: String,

    /// Compute and print the plan without touching the account.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the cycle report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

impl TradeArgs {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(provider) = &self.source {
            config.sentiment.provider = provider.to_ascii_lowercase();
        }
        if let Some(backend) = self.backend {
            config.sentiment.backend = backend.into();
        }
        if let Some(timeframe) = self.timeframe {
            config.trading.timeframe_minutes = timeframe;
        }
        if let Some(threshold) = self.threshold {
            config.trading.threshold = threshold;
        }
        if let Some(account) = &self.account {
            config.oanda.account_id = Some(account.clone());
        }
    }

    fn cycle_params(&self, config: &AppConfig) -> CycleParams {
        CycleParams {
            symbol: self.symbol.clone(),
            timeframe_minutes: config.trading.timeframe_minutes,
            threshold: config.trading.threshold,
            order_size: self.units,
            dry_run: self.dry_run,
        }
    }
}

/// Runs one cycle and maps its result to a process exit code.
///
/// # Errors
/// Returns an error when configuration or collaborators cannot be set up.
/// A cycle that starts and then fails is reported and mapped to exit code 1.
pub async fn run_trade(args: TradeArgs) -> Result<ExitCode> {
    let mut config = ConfigLoader::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    args.apply(&mut config);

    let source = build_source(&config.sentiment).context("failed to set up sentiment source")?;
    let broker =
        OandaClient::from_app_config(&config.oanda, None).context("failed to set up OANDA client")?;

    info!(
        symbol = %args.symbol,
        account = broker.account_id(),
        backend = source.name(),
        provider = %config.sentiment.provider,
        timeframe_minutes = config.trading.timeframe_minutes,
        threshold = config.trading.threshold,
        dry_run = args.dry_run,
        "starting cycle"
    );

    let cycle = TradingCycle::new(source, broker)
        .with_call_timeout(Duration::from_secs(config.trading.call_timeout_secs.max(1)));
    let params = args.cycle_params(&config);

    match cycle.run(&params).await {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report_failure(&err);
            Ok(ExitCode::from(1))
        }
    }
}

fn print_report(report: &CycleReport) {
    println!("=== {} ===", report.instrument);
    println!(
        "Signal:      {} over {}m -> {}",
        report.signal.ratio, report.signal.timeframe_minutes, report.bias
    );
    println!("Open trades: {}", report.open_trades);

    println!("Plan:");
    for action in &report.plan {
        println!("  - {action}");
    }

    if report.dry_run {
        println!("\nDry run: nothing was sent to the broker.");
        return;
    }

    println!("Executed:");
    for outcome in &report.outcomes {
        println!("  - {}", describe_outcome(outcome));
    }
    println!("Realized P/L: {}", report.realized_pl());
}

fn report_failure(err: &CycleError) {
    if err.error.is_signal_error() {
        error!(error = %err.error, "no usable signal, nothing traded");
    } else {
        error!(error = %err.error, "cycle failed");
    }

    if let Some(line) = describe_partial_close(&err.error) {
        eprintln!("{line}");
    }

    if !err.completed.is_empty() {
        eprintln!("Completed before failure:");
        for outcome in &err.completed {
            eprintln!("  - {}", describe_outcome(outcome));
        }
    }
}

/// Summarizes which trades did and did not close in a partial close failure.
fn describe_partial_close(error: &TradeError) -> Option<String> {
    let TradeError::PartialCloseFailure { closed, failed } = error else {
        return None;
    };
    let failed: Vec<&str> = failed.iter().map(|(id, _)| id.as_str()).collect();
    let closed = if closed.is_empty() {
        "none".to_string()
    } else {
        closed.join(", ")
    };
    Some(format!("Closed: {closed}; still open: {}", failed.join(", ")))
}

fn describe_outcome(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Closed { results } => {
            let parts: Vec<String> = results
                .iter()
                .map(|r| match &r.status {
                    CloseStatus::Closed { realized_pl } => format!("{} (P/L {realized_pl})", r.trade_id),
                    CloseStatus::Failed { reason } => format!("{} FAILED: {reason}", r.trade_id),
                })
                .collect();
            format!("closed {}", parts.join(", "))
        }
        ActionOutcome::Opened { receipt } => {
            let price = receipt
                .fill_price
                .map_or_else(|| "n/a".to_string(), |p| p.to_string());
            format!(
                "opened {} {} {} @ {} (order {})",
                receipt.direction, receipt.size, receipt.instrument, price, receipt.order_id
            )
        }
        ActionOutcome::Skipped => "skipped".to_string(),
    }
}
