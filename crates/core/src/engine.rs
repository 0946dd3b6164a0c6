//! One decision cycle: fetch signal, decide, snapshot, reconcile, execute.
//!
//! The cycle is strictly sequential. The position snapshot is fetched exactly
//! once and shared by the plan and its execution. Execution stops at the first
//! failed action; nothing is retried.

use crate::decision::{decide, validate_threshold};
use crate::error::{Result, TradeError};
use crate::reconcile::{reconcile, validate_order_size, Action};
use crate::signal::{Bias, Signal};
use crate::symbol::NormalizedSymbol;
use crate::traits::{BrokerGateway, CloseOutcome, CloseStatus, OrderReceipt, SentimentSource};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Default cap on a single collaborator call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Inputs for one cycle.
#[derive(Debug, Clone)]
pub struct CycleParams {
    /// Symbol as entered by the caller.
    pub symbol: String,
    pub timeframe_minutes: u32,
    pub threshold: f64,
    /// Units for a new position.
    pub order_size: Decimal,
    /// Compute the plan without executing it.
    pub dry_run: bool,
}

impl CycleParams {
    fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)?;
        validate_order_size(self.order_size)?;
        if self.timeframe_minutes == 0 {
            return Err(TradeError::Configuration(
                "timeframe must be at least one minute".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one executed action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Closed { results: Vec<CloseOutcome> },
    Opened { receipt: OrderReceipt },
    /// Nothing to send to the broker (no-op or empty close).
    Skipped,
}

/// Summary of a completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub instrument: String,
    pub signal: Signal,
    pub bias: Bias,
    pub open_trades: usize,
    pub plan: Vec<Action>,
    pub outcomes: Vec<ActionOutcome>,
    pub dry_run: bool,
}

impl CycleReport {
    /// Sum of realized P/L over every successful close.
    #[must_use]
    pub fn realized_pl(&self) -> Decimal {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ActionOutcome::Closed { results } => Some(results),
                _ => None,
            })
            .flatten()
            .filter_map(|r| match r.status {
                CloseStatus::Closed { realized_pl } => Some(realized_pl),
                CloseStatus::Failed { .. } => None,
            })
            .sum()
    }
}

/// A failed cycle, with the actions that completed before the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct CycleError {
    #[source]
    pub error: TradeError,
    pub completed: Vec<ActionOutcome>,
}

impl From<TradeError> for CycleError {
    fn from(error: TradeError) -> Self {
        Self {
            error,
            completed: Vec::new(),
        }
    }
}

/// Wires a sentiment source and a broker into a decision cycle.
pub struct TradingCycle<B>
where
    B: BrokerGateway,
{
    source: Box<dyn SentimentSource>,
    broker: B,
    call_timeout: Duration,
}

impl<B> TradingCycle<B>
where
    B: BrokerGateway,
{
    pub fn new(source: Box<dyn SentimentSource>, broker: B) -> Self {
        Self {
            source,
            broker,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Sets the cap applied to every collaborator call.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    #[must_use]
    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Runs one cycle.
    ///
    /// # Errors
    /// Returns the first failure, together with every action that completed
    /// before it.
    pub async fn run(&self, params: &CycleParams) -> std::result::Result<CycleReport, CycleError> {
        params.validate()?;
        let symbol = NormalizedSymbol::parse(&params.symbol)?;

        let ratio = self
            .bounded(
                "fetch_sentiment",
                self.source.fetch(&symbol.source_key, params.timeframe_minutes),
            )
            .await?
            .ok_or_else(|| {
                TradeError::signal_unavailable(
                    &symbol.source_key,
                    format!("{} returned no data", self.source.name()),
                )
            })?;

        let signal = Signal::new(ratio, &symbol.raw, params.timeframe_minutes);
        let bias = decide(Some(ratio), params.threshold)?;
        info!(
            symbol = %symbol,
            source = self.source.name(),
            ratio,
            threshold = params.threshold,
            timeframe = params.timeframe_minutes,
            %bias,
            "sentiment decision"
        );

        let snapshot = self
            .bounded("list_open_trades", self.broker.list_open_trades(&symbol.broker))
            .await?;
        info!(
            instrument = snapshot.instrument(),
            open_trades = snapshot.len(),
            net_units = %snapshot.net_units(),
            "position snapshot"
        );

        let plan = reconcile(bias, &snapshot, params.order_size)?;
        for (step, action) in plan.iter().enumerate() {
            info!(step = step + 1, %action, "planned action");
        }

        let mut report = CycleReport {
            instrument: symbol.broker.clone(),
            signal,
            bias,
            open_trades: snapshot.len(),
            plan,
            outcomes: Vec::new(),
            dry_run: params.dry_run,
        };

        if params.dry_run {
            info!("dry run: plan not executed");
            return Ok(report);
        }

        for action in &report.plan {
            match self.execute(&symbol.broker, action).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(error) => {
                    return Err(CycleError {
                        error,
                        completed: report.outcomes,
                    })
                }
            }
        }

        Ok(report)
    }

    async fn execute(&self, instrument: &str, action: &Action) -> Result<ActionOutcome> {
        match action {
            Action::CloseTrades { ids } if ids.is_empty() => {
                info!(instrument, "no open trades to close");
                Ok(ActionOutcome::Skipped)
            }
            Action::CloseTrades { ids } => {
                let results = self.close_each(ids).await;

                let mut closed = Vec::new();
                let mut failed = Vec::new();
                for result in &results {
                    match &result.status {
                        CloseStatus::Closed { realized_pl } => {
                            info!(trade_id = %result.trade_id, %realized_pl, "trade closed");
                            closed.push(result.trade_id.clone());
                        }
                        CloseStatus::Failed { reason } => {
                            warn!(trade_id = %result.trade_id, %reason, "trade close failed");
                            failed.push((result.trade_id.clone(), reason.clone()));
                        }
                    }
                }

                // An id the broker never reported on is still open as far as we know.
                for id in ids {
                    if !results.iter().any(|r| &r.trade_id == id) {
                        failed.push((id.clone(), "no result reported".to_string()));
                    }
                }

                if failed.is_empty() {
                    Ok(ActionOutcome::Closed { results })
                } else {
                    Err(TradeError::PartialCloseFailure { closed, failed })
                }
            }
            Action::OpenPosition { direction, size } => {
                let receipt = self
                    .bounded(
                        "open_position",
                        self.broker.open_position(instrument, *direction, *size),
                    )
                    .await?;
                info!(
                    instrument,
                    %direction,
                    %size,
                    order_id = %receipt.order_id,
                    "position opened"
                );
                Ok(ActionOutcome::Opened { receipt })
            }
            Action::NoOp => {
                info!(instrument, "position already aligned");
                Ok(ActionOutcome::Skipped)
            }
        }
    }

    /// Closes `ids` one request at a time, each under its own deadline.
    ///
    /// A timed-out or failed request ends the batch: that id and every id
    /// after it are reported as failed, while earlier results are kept.
    async fn close_each(&self, ids: &BTreeSet<String>) -> Vec<CloseOutcome> {
        let mut results = Vec::with_capacity(ids.len());
        let mut remaining = ids.iter();

        while let Some(id) = remaining.next() {
            let single = BTreeSet::from([id.clone()]);
            match self
                .bounded("close_trades", self.broker.close_trades(&single))
                .await
            {
                Ok(outcomes) => results.extend(outcomes),
                Err(error) => {
                    warn!(trade_id = %id, %error, "close request failed, abandoning remaining closes");
                    results.push(CloseOutcome::failed(id.as_str(), error.to_string()));
                    results.extend(
                        remaining
                            .by_ref()
                            .map(|rest| CloseOutcome::failed(rest.as_str(), "not attempted")),
                    );
                    break;
                }
            }
        }

        results
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TradeError::unavailable(
                operation,
                format!("timed out after {}s", self.call_timeout.as_secs_f64()),
            )),
        }
    }
}
