// src/core/engine.rs
use crate::config::AppConfig;
use crate::connectors::kraken::KrakenRestClient;
use crate::connectors::stream::{ShutdownHandle, StreamEvent, StreamSession};
use crate::connectors::traits::BalanceSource;
use crate::core::instruments::subscription_pairs;
use crate::core::ledger::PriceLedger;
use crate::core::traits::ValuationSink;
use crate::core::valuator::valuate;
use crate::error::{PortfolioError, Result};
use crate::types::{AssetValuation, ClientState, Holdings};
use tracing::{debug, error, info};

/// Owns balances, prices and the stream connection.
///
/// `connect` walks `Idle -> BalancesLoaded -> Connected -> Subscribed`; any failure
/// there leaves the client in `Error`. `stream` runs the tick loop until the feed
/// ends, fails, or the shutdown handle fires, and always finishes in `Closed`.
pub struct PortfolioClient {
    balance_source: Box<dyn BalanceSource>,
    ws_url: String,
    holdings: Holdings,
    ledger: PriceLedger,
    session: Option<StreamSession>,
    shutdown: ShutdownHandle,
    state: ClientState,
}

impl PortfolioClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let credentials = config.credentials()?;
        let rest = KrakenRestClient::new(&credentials, &config.rest_url)?;
        Ok(Self::with_source(Box::new(rest), config.ws_url.clone()))
    }

    pub fn with_source(balance_source: Box<dyn BalanceSource>, ws_url: impl Into<String>) -> Self {
        Self {
            balance_source,
            ws_url: ws_url.into(),
            holdings: Holdings::new(),
            ledger: PriceLedger::new(),
            session: None,
            shutdown: ShutdownHandle::new(),
            state: ClientState::Idle,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    pub fn ledger(&self) -> &PriceLedger {
        &self.ledger
    }

    /// Handle for stopping the stream from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn valuations(&self) -> Vec<AssetValuation> {
        valuate(&self.holdings, &self.ledger)
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.load_balances().await?;
        self.open_stream().await?;
        self.subscribe().await
    }

    async fn load_balances(&mut self) -> Result<()> {
        self.expect_state(ClientState::Idle)?;
        match self.balance_source.fetch_balances().await {
            Ok(holdings) => {
                self.holdings = holdings;
                self.transition(ClientState::BalancesLoaded);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    async fn open_stream(&mut self) -> Result<()> {
        self.expect_state(ClientState::BalancesLoaded)?;
        match StreamSession::connect(&self.ws_url, &self.shutdown).await {
            Ok(session) => {
                self.session = Some(session);
                self.transition(ClientState::Connected);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    async fn subscribe(&mut self) -> Result<()> {
        self.expect_state(ClientState::Connected)?;
        let pairs = subscription_pairs(&self.holdings);
        let Some(session) = self.session.as_mut() else {
            return self.fail(PortfolioError::State {
                expected: ClientState::Connected,
                actual: self.state,
            });
        };

        match session.subscribe(&pairs).await {
            Ok(()) => {
                self.transition(ClientState::Subscribed);
                Ok(())
            }
            Err(e) => {
                self.release().await;
                self.fail(e)
            }
        }
    }

    /// Runs the tick loop, handing a fresh valuation to `sink` after every price update.
    pub async fn stream<S: ValuationSink>(&mut self, mut sink: S) -> Result<()> {
        self.expect_state(ClientState::Subscribed)?;
        let Some(session) = self.session.as_mut() else {
            return self.fail(PortfolioError::State {
                expected: ClientState::Subscribed,
                actual: self.state,
            });
        };
        self.state = ClientState::Streaming;
        info!("Client state -> {:?}", self.state);

        let outcome = loop {
            match session.next_message(&mut self.ledger).await {
                Ok(StreamEvent::Tick(tick)) => {
                    debug!("Tick {} @ {}", tick.pair, tick.price);
                    sink.deliver(valuate(&self.holdings, &self.ledger));
                }
                Ok(StreamEvent::Skip) => {}
                Ok(StreamEvent::End) => break Ok(()),
                Err(e) => {
                    error!("Stream failed: {}", e);
                    break Err(e);
                }
            }
        };

        self.close().await;
        outcome
    }

    /// Releases the connection and stops any running loop. Idempotent.
    pub async fn close(&mut self) {
        self.shutdown.close();
        self.release().await;
        if !matches!(self.state, ClientState::Closed | ClientState::Error) {
            self.transition(ClientState::Closed);
        }
    }

    async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }

    fn expect_state(&self, expected: ClientState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PortfolioError::State {
                expected,
                actual: self.state,
            })
        }
    }

    fn transition(&mut self, next: ClientState) {
        info!("Client state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, e: PortfolioError) -> Result<()> {
        error!("Startup failed in {:?}: {}", self.state, e);
        self.state = ClientState::Error;
        Err(e)
    }
}
