use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapters::api::{ApiError, AuthService, BillingApi, ClientConfig, HttpBillingApi};
use crate::adapters::db;
use crate::adapters::preferences::{Checkpoint, PreferenceStore, PrefsError, SqlitePreferences};
use crate::adapters::token_vault::{SqliteTokenVault, TokenVault};
use crate::app::config::AppConfig;
use crate::app::error::AppError;

/// First-run lookback window: without a stored checkpoint, invoices issued
/// within the last 30 days count as new.
const CHECKPOINT_SENTINEL_DAYS: i64 = 30;
const FORCE_CHECK_REWIND_DAYS: i64 = 1;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Where new-invoice signals land. The mobile shell plugs the platform
/// notification channel in here; the headless runtime just logs.
pub trait NotificationSink: Send + Sync {
    fn new_invoices(&self, count: usize);
}

#[derive(Debug, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn new_invoices(&self, count: usize) {
        tracing::info!(count, "new invoices available");
    }
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to fetch invoices: {0}")]
    Fetch(#[source] ApiError),
    #[error("failed to read checkpoint: {0}")]
    ReadCheckpoint(#[source] PrefsError),
    #[error("failed to persist checkpoint: {0}")]
    WriteCheckpoint(#[source] PrefsError),
}

pub struct NotificationPoller<A, C, N> {
    api: A,
    auth: Arc<AuthService>,
    preferences: Arc<dyn PreferenceStore>,
    clock: C,
    sink: N,
}

impl<A, C, N> NotificationPoller<A, C, N>
where
    A: BillingApi,
    C: Clock,
    N: NotificationSink,
{
    pub fn new(
        api: A,
        auth: Arc<AuthService>,
        preferences: Arc<dyn PreferenceStore>,
        clock: C,
        sink: N,
    ) -> Self {
        Self {
            api,
            auth,
            preferences,
            clock,
            sink,
        }
    }

    /// One poll cycle. Returns whether a new-invoice signal was emitted;
    /// every failure inside the cycle is logged and reported as `false`.
    pub async fn check_for_new_invoices(&self) -> bool {
        if !self.auth.is_logged_in() {
            return false;
        }

        match self.run_check().await {
            Ok(signaled) => signaled,
            Err(error) => {
                tracing::warn!(error = %error, "invoice check failed");
                false
            }
        }
    }

    async fn run_check(&self) -> Result<bool, CheckError> {
        let invoices = self.api.invoices().await.map_err(CheckError::Fetch)?;
        if invoices.is_empty() {
            return Ok(false);
        }

        let checkpoint = self
            .preferences
            .checkpoint()
            .map_err(CheckError::ReadCheckpoint)?
            .unwrap_or_else(|| self.sentinel_checkpoint());

        let new_by_date = invoices
            .iter()
            .filter(|invoice| invoice.issue_date > checkpoint.last_check_time)
            .count();
        let count_grew = invoices.len() as i64 > checkpoint.last_invoice_count;

        if new_by_date == 0 && !count_grew {
            return Ok(false);
        }

        // The checkpoint moves before the signal goes out; a sink that
        // panics must not make the same invoices fire twice.
        self.preferences
            .save_checkpoint(&Checkpoint {
                last_check_time: self.clock.now(),
                last_invoice_count: invoices.len() as i64,
            })
            .map_err(CheckError::WriteCheckpoint)?;

        self.sink.new_invoices(new_by_date.max(1));
        Ok(true)
    }

    fn sentinel_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            last_check_time: self.clock.now() - chrono::Duration::days(CHECKPOINT_SENTINEL_DAYS),
            last_invoice_count: 0,
        }
    }

    /// User-initiated refresh. Rewinds the persisted checkpoint by one day
    /// so invoices reported just before the tap are considered again, then
    /// runs a normal check.
    pub async fn force_check(&self) -> bool {
        let rewound = match self.preferences.checkpoint() {
            Ok(Some(checkpoint)) => Checkpoint {
                last_check_time: checkpoint.last_check_time
                    - chrono::Duration::days(FORCE_CHECK_REWIND_DAYS),
                last_invoice_count: checkpoint.last_invoice_count,
            },
            Ok(None) => self.sentinel_checkpoint(),
            Err(error) => {
                tracing::warn!(error = %error, "failed to read checkpoint for forced check");
                self.sentinel_checkpoint()
            }
        };

        if let Err(error) = self.preferences.save_checkpoint(&rewound) {
            tracing::warn!(error = %error, "failed to rewind checkpoint for forced check");
        }

        self.check_for_new_invoices().await
    }

    pub fn clear(&self) -> Result<(), PrefsError> {
        self.preferences.clear_checkpoint()
    }
}

/// Spawns the periodic poll task: one grace delay at startup, then a check
/// immediately and on every interval tick until the token is cancelled.
pub fn start_poller<A, C, N>(
    poller: NotificationPoller<A, C, N>,
    poll_interval: Duration,
    startup_grace: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    A: BillingApi + 'static,
    C: Clock + Send + Sync + 'static,
    N: NotificationSink + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(startup_grace) => {}
        }

        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    poller.check_for_new_invoices().await;
                }
            }
        }
    })
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let mut connection =
        db::open_connection(&config.store_path).map_err(AppError::store_init)?;
    db::run_migrations(&mut connection).map_err(AppError::store_init)?;
    let shared_connection = Arc::new(Mutex::new(connection));

    let vault: Arc<dyn TokenVault> =
        Arc::new(SqliteTokenVault::new(Arc::clone(&shared_connection)));
    let preferences: Arc<dyn PreferenceStore> =
        Arc::new(SqlitePreferences::new(Arc::clone(&shared_connection)));

    let auth = Arc::new(AuthService::new(
        ClientConfig {
            base_url: config.api_base_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            accept_invalid_certs: config.accept_invalid_certs,
        },
        vault,
        Arc::clone(&preferences),
    ));

    if config.accept_invalid_certs {
        tracing::warn!("certificate validation disabled; development use only");
    }

    let api = HttpBillingApi::new(Arc::clone(&auth));
    let poller = NotificationPoller::new(api, auth, preferences, SystemClock, TracingSink);
    let cancel = CancellationToken::new();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::runtime)?;

    runtime.block_on(async {
        let poller_handle = start_poller(
            poller,
            Duration::from_secs(config.poll_interval_secs),
            Duration::from_millis(config.startup_grace_ms),
            cancel.clone(),
        );

        tracing::info!("notification poller running; ctrl-c stops it");

        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %error, "failed to listen for shutdown signal");
        }

        cancel.cancel();
        if poller_handle.await.is_err() {
            return Err(AppError::runtime("poller task panicked"));
        }
        Ok(())
    })
}
