// src/connectors/kraken.rs
use crate::config::Credentials;
use crate::connectors::messages::BalanceResponse;
use crate::connectors::signer::{next_nonce, Signer};
use crate::connectors::traits::BalanceSource;
use crate::error::{PortfolioError, Result};
use crate::types::Holdings;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, info, warn};
use url::Url;

pub const BALANCE_PATH: &str = "/0/private/Balance";

pub struct KrakenRestClient {
    api_key: String,
    signer: Signer,
    http_client: Client,
    base_rest_url: String,
}

impl KrakenRestClient {
    pub fn new(credentials: &Credentials, base_rest_url: &str) -> Result<Self> {
        Url::parse(base_rest_url)?;
        Ok(Self {
            api_key: credentials.api_key.clone(),
            signer: Signer::new(&credentials.api_secret)?,
            http_client: Client::new(),
            base_rest_url: base_rest_url.trim_end_matches('/').to_string(),
        })
    }

    /// POSTs `nonce=<n>&<params>` to a private endpoint and returns the status with the raw body.
    /// Error statuses are not rejected here; Kraken puts its reasons in the body.
    async fn send_signed_request(
        &self,
        path: &str,
        params: Vec<(&str, String)>,
    ) -> Result<(StatusCode, String)> {
        let nonce = next_nonce().to_string();
        let mut form = vec![("nonce", nonce.clone())];
        form.extend(params);

        let body = serde_urlencoded::to_string(&form)?;
        let signature = self.signer.sign(path, &body, &nonce);
        let url = format!("{}{}", self.base_rest_url, path);

        debug!("POST {}", url);
        let response = self
            .http_client
            .post(&url)
            .header("API-Key", &self.api_key)
            .header("API-Sign", signature)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        Ok((status, response.text().await?))
    }
}

#[async_trait]
impl BalanceSource for KrakenRestClient {
    async fn fetch_balances(&self) -> Result<Holdings> {
        let (status, body) = self.send_signed_request(BALANCE_PATH, vec![]).await?;
        let resp = match serde_json::from_str::<BalanceResponse>(&body) {
            Ok(resp) if !resp.error.is_empty() => return Err(PortfolioError::Auth(resp.error)),
            _ if !status.is_success() => {
                warn!("Balance request failed with HTTP {}", status);
                return Err(PortfolioError::Transport(format!("HTTP {}", status)));
            }
            parsed => parsed?,
        };
        let holdings = parse_balances(resp)?;
        info!("Loaded {} non-zero balances", holdings.len());
        Ok(holdings)
    }
}

/// Keeps only entries that parse to a strictly positive decimal.
pub fn parse_balances(resp: BalanceResponse) -> Result<Holdings> {
    if !resp.error.is_empty() {
        return Err(PortfolioError::Auth(resp.error));
    }

    let mut holdings = Holdings::new();
    for (asset, raw) in resp.result {
        let parsed = raw.as_str().and_then(|s| Decimal::from_str(s.trim()).ok());
        match parsed {
            Some(balance) if balance > Decimal::ZERO => {
                holdings.insert(asset, balance);
            }
            Some(_) => {}
            None => warn!("Dropping unparsable balance for {}: {}", asset, raw),
        }
    }
    Ok(holdings)
}
