// ==========================================
// 价格表导入与定价引擎 - HTTP 汇率来源
// ==========================================
// 报文: {"compra": 1180.5, "venta": 1220.0, "fechaActualizacion": "2026-10-19T15:00:00Z"}
// 映射: compra → buy, venta → sell, fechaActualizacion → date
// ==========================================

use crate::domain::pricing::FxInfo;
use crate::fx::error::{FxError, FxResult};
use crate::fx::provider::FxRateSource;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// HTTP 客户端超时（外层另有获取超时）
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct QuotePayload {
    compra: f64,
    venta: f64,
    #[serde(rename = "fechaActualizacion", default)]
    fecha_actualizacion: String,
}

pub struct HttpFxSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFxSource {
    pub fn new(url: impl Into<String>) -> FxResult<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// 解析汇率报文
pub fn parse_quote(body: &str, source: &str) -> FxResult<FxInfo> {
    let payload: QuotePayload = serde_json::from_str(body)?;
    Ok(FxInfo {
        buy: payload.compra,
        sell: payload.venta,
        date: payload.fecha_actualizacion,
        source: source.to_string(),
    })
}

#[async_trait]
impl FxRateSource for HttpFxSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> FxResult<FxInfo> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FxError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response.text().await?;
        debug!(url = %self.url, bytes = body.len(), "汇率报文已接收");
        parse_quote(&body, &self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quote() {
        let body = r#"{"moneda":"USD","compra":1180.5,"venta":1220,"fechaActualizacion":"2026-10-19T15:00:00Z"}"#;
        let fx = parse_quote(body, "https://fx.example/usd").unwrap();
        assert_eq!(fx.buy, 1180.5);
        assert_eq!(fx.sell, 1220.0);
        assert_eq!(fx.date, "2026-10-19T15:00:00Z");
        assert_eq!(fx.source, "https://fx.example/usd");
    }

    #[test]
    fn test_parse_quote_missing_field() {
        let err = parse_quote(r#"{"compra":1180.5}"#, "x").unwrap_err();
        assert!(matches!(err, FxError::Parse(_)));
    }
}
