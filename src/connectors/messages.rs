// src/connectors/messages.rs
//
// Wire types for the Kalshi trade API v2. Prices and exposures arrive in
// whole cents; anything the venue may omit is Option.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PositionsResponse {
    #[serde(default)]
    pub market_positions: Vec<RawMarketPosition>,
    #[serde(default)]
    pub event_positions: Vec<RawEventPosition>,
}

#[derive(Debug, Deserialize)]
pub struct RawMarketPosition {
    pub ticker: String,
    /// Signed contract count; negative means short.
    pub position: i64,
    /// Exposure in cents.
    #[serde(default)]
    pub market_exposure: i64,
}

#[derive(Debug, Deserialize)]
pub struct RawEventPosition {
    pub event_ticker: String,
    #[serde(default)]
    pub event_exposure: i64,
    #[serde(default)]
    pub total_cost: i64,
}

#[derive(Debug, Deserialize)]
pub struct MarketResponse {
    pub market: RawMarket,
}

#[derive(Debug, Deserialize)]
pub struct RawMarket {
    pub ticker: String,
    pub title: Option<String>,
    /// Best yes bid/ask in cents.
    pub yes_bid: Option<i64>,
    pub yes_ask: Option<i64>,
    pub open_interest: Option<i64>,
    pub volume: Option<i64>,
    pub close_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceResponse {
    /// Available cash in cents.
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderRequest<'a> {
    pub ticker: &'a str,
    pub action: &'a str,
    pub side: &'a str,
    pub count: u32,
    #[serde(rename = "type")]
    pub order_type: &'a str,
    pub client_order_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderResponse {
    pub order: RawOrder,
}

#[derive(Debug, Deserialize)]
pub struct RawOrder {
    pub order_id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_response_tolerates_missing_lists() {
        let resp: PositionsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.market_positions.is_empty());
        assert!(resp.event_positions.is_empty());
    }

    #[test]
    fn market_parses_partial_fields() {
        let json = r#"{"market":{"ticker":"KXTEST","yes_bid":44,"open_interest":250}}"#;
        let resp: MarketResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.market.yes_bid, Some(44));
        assert_eq!(resp.market.yes_ask, None);
        assert_eq!(resp.market.close_time, None);
    }

    #[test]
    fn order_request_serializes_type_field() {
        let req = CreateOrderRequest {
            ticker: "KXTEST",
            action: "sell",
            side: "yes",
            count: 10,
            order_type: "market",
            client_order_id: "abc",
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""type":"market""#));
        assert!(json.contains(r#""action":"sell""#));
    }
}
