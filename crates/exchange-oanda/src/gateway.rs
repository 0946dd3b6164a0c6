//! [`BrokerGateway`] implementation over the OANDA REST client.

use crate::client::OandaClient;
use crate::error::OandaError;
use crate::types::{MarketOrderRequest, OrderResponse};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sentiment_trader_core::{
    BrokerGateway, CloseOutcome, Direction, OrderReceipt, PositionSnapshot, Result,
};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

#[async_trait]
impl BrokerGateway for OandaClient {
    async fn list_open_trades(&self, instrument: &str) -> Result<PositionSnapshot> {
        let raw = self
            .open_trades()
            .await
            .map_err(|e| e.into_trade_error("list_open_trades"))?;

        let trades = raw
            .into_iter()
            .filter(|t| t.instrument == instrument)
            .filter_map(|t| {
                let id = t.id.clone();
                let trade = t.into_trade();
                if trade.is_none() {
                    warn!(trade_id = %id, "ignoring open trade with zero units");
                }
                trade
            });

        let snapshot = PositionSnapshot::new(instrument, trades);
        debug!(instrument, open_trades = snapshot.len(), "fetched open trades");
        Ok(snapshot)
    }

    async fn close_trades(&self, ids: &BTreeSet<String>) -> Result<Vec<CloseOutcome>> {
        let mut outcomes = Vec::with_capacity(ids.len());
        let mut remaining = ids.iter();

        while let Some(id) = remaining.next() {
            match self.close_trade(id).await {
                Ok(response) => {
                    let outcome = close_outcome(id, &response);
                    if outcome.is_closed() {
                        info!(trade_id = %id, "trade closed");
                    } else {
                        warn!(trade_id = %id, "trade close rejected");
                    }
                    outcomes.push(outcome);
                }
                Err(err) if err.is_transient() => {
                    // Broker unreachable: stop here and report the rest as not attempted.
                    warn!(trade_id = %id, error = %err, "close failed, aborting remaining closes");
                    outcomes.push(CloseOutcome::failed(id.as_str(), err.to_string()));
                    outcomes.extend(remaining.by_ref().map(|rest| {
                        CloseOutcome::failed(rest.as_str(), "not attempted after transport failure")
                    }));
                    break;
                }
                Err(err) => {
                    warn!(trade_id = %id, error = %err, "trade close rejected");
                    outcomes.push(CloseOutcome::failed(id.as_str(), err.to_string()));
                }
            }
        }

        Ok(outcomes)
    }

    async fn open_position(
        &self,
        instrument: &str,
        direction: Direction,
        size: Decimal,
    ) -> Result<OrderReceipt> {
        let order = MarketOrderRequest::new(instrument, direction, size);
        let response = self
            .create_market_order(&order)
            .await
            .map_err(|e| e.into_trade_error("open_position"))?;

        let receipt = order_receipt(instrument, direction, size, response)
            .map_err(|e| e.into_trade_error("open_position"))?;
        info!(
            instrument,
            direction = %direction,
            size = %size,
            order_id = %receipt.order_id,
            "position opened"
        );
        Ok(receipt)
    }
}

/// Interprets a trade-close response.
///
/// A 2xx response can still carry a cancel transaction; that counts as failed.
fn close_outcome(trade_id: &str, response: &OrderResponse) -> CloseOutcome {
    if let Some(cancel) = &response.order_cancel_transaction {
        let reason = cancel.reason.as_deref().unwrap_or("close order cancelled");
        return CloseOutcome::failed(trade_id, reason);
    }

    match &response.order_fill_transaction {
        Some(fill) => {
            let realized = fill
                .trades_closed
                .iter()
                .filter(|r| r.trade_id == trade_id)
                .filter_map(|r| r.realized_pl)
                .reduce(|a, b| a + b)
                .or(fill.pl)
                .unwrap_or_default();
            CloseOutcome::closed(trade_id, realized)
        }
        None => CloseOutcome::failed(trade_id, "no fill reported for close"),
    }
}

fn order_receipt(
    instrument: &str,
    direction: Direction,
    size: Decimal,
    response: OrderResponse,
) -> std::result::Result<OrderReceipt, OandaError> {
    if let Some(cancel) = response.order_cancel_transaction {
        return Err(OandaError::OrderRejected(
            cancel.reason.unwrap_or_else(|| "order cancelled".to_string()),
        ));
    }

    let fill = response
        .order_fill_transaction
        .ok_or_else(|| OandaError::OrderRejected("no fill reported for market order".into()))?;

    let order_id = fill
        .order_id
        .clone()
        .or_else(|| response.order_create_transaction.map(|t| t.id))
        .unwrap_or_else(|| fill.id.clone());

    Ok(OrderReceipt {
        order_id,
        trade_id: fill.trade_opened.map(|t| t.trade_id),
        instrument: instrument.to_string(),
        direction,
        size,
        fill_price: fill.price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::OandaClientConfig;
    use rust_decimal_macros::dec;
    use secrecy::SecretString;
    use sentiment_trader_core::TradeError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: &str = "101-004-1234567-001";

    fn client_for(server: &MockServer) -> OandaClient {
        let config = OandaClientConfig::practice(ACCOUNT).with_base_url(server.uri());
        OandaClient::new(config, SecretString::from("test-token")).unwrap()
    }

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    async fn mount_close(server: &MockServer, trade_id: &str, template: ResponseTemplate) {
        Mock::given(method("PUT"))
            .and(path(format!(
                "/v3/accounts/{ACCOUNT}/trades/{trade_id}/close"
            )))
            .respond_with(template)
            .mount(server)
            .await;
    }

    fn filled_close(trade_id: &str, pl: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "orderFillTransaction": {
                "id": "900",
                "pl": pl,
                "tradesClosed": [{ "tradeID": trade_id, "units": "-100", "realizedPL": pl }]
            }
        }))
    }

    #[tokio::test]
    async fn test_snapshot_filters_instrument() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v3/accounts/{ACCOUNT}/openTrades")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "trades": [
                    { "id": "1", "instrument": "EUR_USD", "initialUnits": "100", "unrealizedPL": "1.5" },
                    { "id": "2", "instrument": "EUR_USD", "initialUnits": "-100", "unrealizedPL": "-0.5" },
                    { "id": "3", "instrument": "USD_JPY", "initialUnits": "100" }
                ]
            })))
            .mount(&server)
            .await;

        let snapshot = client_for(&server).list_open_trades("EUR_USD").await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.in_direction(Direction::Long).count(), 1);
        assert_eq!(snapshot.in_direction(Direction::Short).count(), 1);
        assert_eq!(snapshot.total_unrealized_pl(), dec!(1.0));

        let count = client_for(&server).count_open_trades("USD_JPY").await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_snapshot_error_maps_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).list_open_trades("EUR_USD").await.unwrap_err();
        assert!(matches!(
            err,
            TradeError::CollaboratorUnavailable { ref operation, .. } if operation == "list_open_trades"
        ));
    }

    #[tokio::test]
    async fn test_close_reports_each_trade() {
        let server = MockServer::start().await;
        mount_close(&server, "10", filled_close("10", "2.50")).await;
        mount_close(
            &server,
            "11",
            ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "errorCode": "NO_SUCH_TRADE",
                "errorMessage": "The Trade specified does not exist"
            })),
        )
        .await;
        mount_close(&server, "12", filled_close("12", "-1.00")).await;

        let outcomes = client_for(&server)
            .close_trades(&ids(&["10", "11", "12"]))
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0], CloseOutcome::closed("10", dec!(2.50)));
        assert!(!outcomes[1].is_closed());
        assert_eq!(outcomes[2], CloseOutcome::closed("12", dec!(-1.00)));
    }

    #[tokio::test]
    async fn test_close_cancel_transaction_is_failure() {
        let server = MockServer::start().await;
        mount_close(
            &server,
            "20",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "orderCancelTransaction": { "id": "21", "reason": "MARKET_HALTED" }
            })),
        )
        .await;

        let outcomes = client_for(&server).close_trades(&ids(&["20"])).await.unwrap();
        assert_eq!(outcomes, vec![CloseOutcome::failed("20", "MARKET_HALTED")]);
    }

    #[tokio::test]
    async fn test_close_transport_failure_marks_rest_unattempted() {
        let server = MockServer::start().await;
        mount_close(&server, "30", ResponseTemplate::new(500)).await;
        mount_close(&server, "31", filled_close("31", "1")).await;

        let outcomes = client_for(&server)
            .close_trades(&ids(&["30", "31"]))
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_closed()));
        assert_eq!(
            outcomes[1],
            CloseOutcome::failed("31", "not attempted after transport failure")
        );
    }

    #[tokio::test]
    async fn test_open_position_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v3/accounts/{ACCOUNT}/orders")))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "orderCreateTransaction": { "id": "70" },
                "orderFillTransaction": {
                    "id": "71",
                    "orderID": "70",
                    "price": "1.0850",
                    "tradeOpened": { "tradeID": "71", "units": "500" }
                }
            })))
            .mount(&server)
            .await;

        let receipt = client_for(&server)
            .open_position("EUR_USD", Direction::Long, dec!(500))
            .await
            .unwrap();

        assert_eq!(receipt.order_id, "70");
        assert_eq!(receipt.trade_id.as_deref(), Some("71"));
        assert_eq!(receipt.fill_price, Some(dec!(1.0850)));
        assert_eq!(receipt.direction, Direction::Long);
    }

    #[tokio::test]
    async fn test_open_position_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "orderCreateTransaction": { "id": "80" },
                "orderCancelTransaction": { "id": "81", "reason": "INSUFFICIENT_MARGIN" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .open_position("EUR_USD", Direction::Short, dec!(500))
            .await
            .unwrap_err();

        match err {
            TradeError::CollaboratorUnavailable { operation, message } => {
                assert_eq!(operation, "open_position");
                assert!(message.contains("INSUFFICIENT_MARGIN"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
