// src/connectors/kalshi.rs
//
// Kalshi REST client. The trade API v2 authenticates with an RSA (SHA-256)
// signature computed over timestamp + method + path, sent via the
// KALSHI-ACCESS-* headers.

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, Method};
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info};

use crate::connectors::messages::{
    BalanceResponse, CreateOrderRequest, CreateOrderResponse, MarketResponse, PositionsResponse,
};
use crate::connectors::traits::Brokerage;
use crate::types::{
    AccountPosition, MarketQuote, OrderAction, OrderConfirmation, OrderRequest, OrderSide,
    Portfolio,
};
use crate::utils::money::cents_to_dollars;

pub const KALSHI_API_BASE: &str = "https://api.elections.kalshi.com";
const PATH_PREFIX: &str = "/trade-api/v2";

#[derive(Debug, Error)]
pub enum KalshiError {
    #[error("kalshi configuration: {0}")]
    Configuration(String),
    #[error("request signing: {0}")]
    Signing(String),
    #[error("http transport: {0}")]
    Http(#[from] reqwest::Error),
    #[error("kalshi api {status}: {body}")]
    Api { status: u16, body: String },
}

pub struct KalshiClient {
    api_key: String,
    private_key: RsaPrivateKey,
    http_client: Client,
    base_url: String,
}

impl KalshiClient {
    pub fn new(api_key: String, private_key_pem: &str) -> Result<Self, KalshiError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
            .map_err(|e| KalshiError::Signing(format!("failed to parse private key: {e}")))?;
        Ok(Self {
            api_key,
            private_key,
            http_client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            base_url: KALSHI_API_BASE.to_string(),
        })
    }

    /// Credentials from `KALSHI_KEY_ID` plus either `KALSHI_PRIVATE_KEY`
    /// (PEM in the variable, `\n`-escaped allowed) or
    /// `KALSHI_PRIVATE_KEY_PATH` (PEM on disk).
    pub fn from_env() -> Result<Self, KalshiError> {
        let api_key = std::env::var("KALSHI_KEY_ID")
            .map_err(|_| KalshiError::Configuration("missing KALSHI_KEY_ID".into()))?;

        let pem = match std::env::var("KALSHI_PRIVATE_KEY") {
            Ok(inline) => inline.replace("\\n", "\n"),
            Err(_) => {
                let path = std::env::var("KALSHI_PRIVATE_KEY_PATH")
                    .unwrap_or_else(|_| "kalshi_key.pem".to_string());
                std::fs::read_to_string(&path).map_err(|e| {
                    KalshiError::Configuration(format!("cannot read private key {path}: {e}"))
                })?
            }
        };

        Self::new(api_key, &pem)
    }

    /// Signature over `timestamp + method + path` (path without query),
    /// base64 encoded.
    fn sign(&self, method: &str, path: &str) -> Result<[(&'static str, String); 3], KalshiError> {
        let timestamp_ms = chrono::Utc::now().timestamp_millis().to_string();
        let message = format!("{timestamp_ms}{method}{path}");

        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        let signature = signing_key.sign(message.as_bytes());
        let signature_b64 = BASE64.encode(signature.to_bytes());

        Ok([
            ("KALSHI-ACCESS-KEY", self.api_key.clone()),
            ("KALSHI-ACCESS-SIGNATURE", signature_b64),
            ("KALSHI-ACCESS-TIMESTAMP", timestamp_ms),
        ])
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<T, KalshiError> {
        let signed_path = format!("{PATH_PREFIX}{path}");
        let headers = self.sign(method.as_str(), &signed_path)?;
        let url = format!("{}{}", self.base_url, signed_path);

        let mut request = self.http_client.request(method, &url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KalshiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, KalshiError> {
        self.send(Method::GET, path, None).await
    }
}

#[async_trait]
impl Brokerage for KalshiClient {
    async fn get_positions(&self) -> Result<Vec<AccountPosition>> {
        let resp: PositionsResponse = self.get("/portfolio/positions").await?;

        let mut positions = Vec::new();
        for p in resp.market_positions {
            positions.push(AccountPosition {
                ticker: p.ticker,
                position: p.position,
                market_exposure: p.market_exposure,
            });
        }
        for p in resp.event_positions {
            // Event aggregates carry no per-market contract count; expose
            // the cost figure and let the caller infer entry pricing.
            let exposure = if p.event_exposure != 0 {
                p.event_exposure
            } else {
                p.total_cost
            };
            positions.push(AccountPosition {
                ticker: p.event_ticker,
                position: 0,
                market_exposure: exposure,
            });
        }
        debug!("fetched {} account positions", positions.len());
        Ok(positions)
    }

    async fn get_market(&self, ticker: &str) -> Result<MarketQuote> {
        let resp: MarketResponse = self.get(&format!("/markets/{ticker}")).await?;
        let m = resp.market;
        Ok(MarketQuote {
            ticker: m.ticker,
            title: m.title.unwrap_or_default(),
            yes_bid: m.yes_bid.map(cents_to_dollars),
            yes_ask: m.yes_ask.map(cents_to_dollars),
            open_interest: m.open_interest,
            volume: m.volume,
            close_time: m.close_time,
        })
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderConfirmation> {
        let action = match request.action {
            OrderAction::Buy => "buy",
            OrderAction::Sell => "sell",
        };
        let side = match request.side {
            OrderSide::Yes => "yes",
            OrderSide::No => "no",
        };
        let body = serde_json::to_string(&CreateOrderRequest {
            ticker: &request.ticker,
            action,
            side,
            count: request.count,
            order_type: "market",
            client_order_id: &request.client_order_id,
        })?;

        info!(
            ticker = %request.ticker,
            count = request.count,
            action,
            "sending market order"
        );
        let resp: CreateOrderResponse = self
            .send(Method::POST, "/portfolio/orders", Some(body))
            .await?;
        Ok(OrderConfirmation {
            order_id: resp.order.order_id,
            status: resp.order.status,
        })
    }

    async fn get_portfolio(&self) -> Result<Portfolio> {
        let resp: BalanceResponse = self.get("/portfolio/balance").await?;
        Ok(Portfolio {
            cash_balance: cents_to_dollars(resp.balance),
        })
    }
}
