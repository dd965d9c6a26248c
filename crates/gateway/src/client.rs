//! Fyers-style REST market-data client.
//!
//! The broker's dynamic JSON payloads are mapped to typed structs at this
//! boundary; a quote with no usable price field is an explicit error, an
//! empty or `no_data` history is a valid empty result.

use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use orbit_core::{Candle, GatewayConfig, MarketData, Resolution};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

pub struct FyersGateway {
    http: Client,
    base_url: String,
    auth_header: String,
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    s: String,
    #[serde(default)]
    d: Vec<QuoteNode>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteNode {
    #[serde(default)]
    v: QuoteValues,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteValues {
    #[serde(default)]
    s: Option<String>,
    #[serde(default)]
    errmsg: Option<String>,
    #[serde(default)]
    lp: Option<f64>,
    #[serde(default)]
    last_price: Option<f64>,
    #[serde(default)]
    ltp: Option<f64>,
    #[serde(default)]
    open_price: Option<f64>,
    #[serde(default)]
    prev_close_price: Option<f64>,
}

impl QuoteValues {
    /// First usable price field, in the broker's order of reliability.
    fn best_price(&self) -> Option<f64> {
        self.lp
            .or(self.last_price)
            .or(self.ltp)
            .or(self.open_price)
            .or(self.prev_close_price)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    s: String,
    #[serde(default)]
    candles: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    message: Option<String>,
}

impl FyersGateway {
    /// Builds the client. The access token is read separately (it rotates
    /// daily) and combined with the app id into the auth header.
    pub fn new(cfg: &GatewayConfig, access_token: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            auth_header: format!("{}:{}", cfg.client_id, access_token.trim()),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.auth_header)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }

    /// Parses a quotes payload down to the last traded price.
    pub(crate) fn parse_quote(body: &str) -> Result<Decimal> {
        let parsed: QuotesResponse = serde_json::from_str(body)?;
        if parsed.s != "ok" {
            return Err(GatewayError::Broker(
                parsed.message.unwrap_or_else(|| format!("s={}", parsed.s)),
            ));
        }
        let node = parsed
            .d
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::MissingField("d".to_string()))?;
        if node.v.s.as_deref() == Some("error") || node.v.errmsg.is_some() {
            return Err(GatewayError::Broker(
                node.v.errmsg.unwrap_or_else(|| "symbol error".to_string()),
            ));
        }
        let price = node
            .v
            .best_price()
            .ok_or_else(|| GatewayError::MissingField("lp".to_string()))?;
        Decimal::from_f64(price).ok_or_else(|| GatewayError::Malformed(format!("price {price}")))
    }

    /// Parses a history payload into candles. `no_data` is an empty
    /// result; individually malformed rows are skipped.
    pub(crate) fn parse_history(body: &str) -> Result<Vec<Candle>> {
        let parsed: HistoryResponse = serde_json::from_str(body)?;
        match parsed.s.as_str() {
            "ok" => {}
            "no_data" => return Ok(Vec::new()),
            other => {
                return Err(GatewayError::Broker(
                    parsed.message.unwrap_or_else(|| format!("s={other}")),
                ))
            }
        }

        let mut candles = Vec::with_capacity(parsed.candles.len());
        for row in &parsed.candles {
            match Self::parse_candle_row(row) {
                Some(candle) => candles.push(candle),
                None => tracing::warn!(?row, "skipping malformed history row"),
            }
        }
        Ok(candles)
    }

    fn parse_candle_row(row: &[serde_json::Value]) -> Option<Candle> {
        if row.len() < 6 {
            return None;
        }
        let epoch = row[0].as_i64()?;
        let timestamp = Utc.timestamp_opt(epoch, 0).single()?;
        let field = |i: usize| row[i].as_f64().and_then(Decimal::from_f64);
        Some(Candle {
            timestamp,
            open: field(1)?,
            high: field(2)?,
            low: field(3)?,
            close: field(4)?,
            volume: field(5)?,
        })
    }
}

#[async_trait]
impl MarketData for FyersGateway {
    async fn quote(&self, symbol: &str) -> anyhow::Result<Decimal> {
        let body = self.get_json("/quotes/", &[("symbols", symbol)]).await?;
        Ok(Self::parse_quote(&body)?)
    }

    async fn history(
        &self,
        symbol: &str,
        resolution: Resolution,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<Candle>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        let body = self
            .get_json(
                "/data/history",
                &[
                    ("symbol", symbol),
                    ("resolution", resolution.code()),
                    ("date_format", "1"),
                    ("range_from", from.as_str()),
                    ("range_to", to.as_str()),
                    ("cont_flag", "1"),
                ],
            )
            .await?;
        Ok(Self::parse_history(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quote_takes_the_first_usable_price_field() {
        let body = r#"{"s":"ok","d":[{"n":"NSE:NIFTY50-INDEX","v":{"lp":24712.4}}]}"#;
        assert_eq!(FyersGateway::parse_quote(body).unwrap(), dec!(24712.4));

        let fallback = r#"{"s":"ok","d":[{"v":{"prev_close_price":24600.0}}]}"#;
        assert_eq!(FyersGateway::parse_quote(fallback).unwrap(), dec!(24600));
    }

    #[test]
    fn quote_without_any_price_field_is_an_error() {
        let body = r#"{"s":"ok","d":[{"v":{"volume":120}}]}"#;
        assert!(matches!(
            FyersGateway::parse_quote(body),
            Err(GatewayError::MissingField(_))
        ));
    }

    #[test]
    fn quote_broker_error_is_surfaced() {
        let body = r#"{"s":"error","message":"invalid token"}"#;
        assert!(matches!(
            FyersGateway::parse_quote(body),
            Err(GatewayError::Broker(_))
        ));

        let symbol_err = r#"{"s":"ok","d":[{"v":{"s":"error","errmsg":"invalid symbol"}}]}"#;
        assert!(matches!(
            FyersGateway::parse_quote(symbol_err),
            Err(GatewayError::Broker(_))
        ));
    }

    #[test]
    fn history_no_data_is_empty_not_an_error() {
        let body = r#"{"s":"no_data"}"#;
        assert!(FyersGateway::parse_history(body).unwrap().is_empty());
    }

    #[test]
    fn history_rows_map_to_candles() {
        let body = r#"{"s":"ok","candles":[
            [1756093500, 24650.0, 24660.5, 24640.0, 24655.2, 125000],
            [1756093560, 24655.2, 24670.0, 24650.0, 24668.0, 98000]
        ]}"#;
        let candles = FyersGateway::parse_history(body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].high, dec!(24660.5));
        assert_eq!(candles[1].close, dec!(24668));
        assert!(candles[0].timestamp < candles[1].timestamp);
    }

    #[test]
    fn malformed_history_rows_are_skipped() {
        let body = r#"{"s":"ok","candles":[
            [1756093500, 24650.0, 24660.5, 24640.0, 24655.2, 125000],
            ["bad", 1, 2],
            [1756093620, 24656.0, 24661.0, 24648.0, 24650.0, 88000]
        ]}"#;
        let candles = FyersGateway::parse_history(body).unwrap();
        assert_eq!(candles.len(), 2);
    }
}
