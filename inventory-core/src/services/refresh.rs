//! Background full-refresh job

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cache::{self, RefreshLock, SharedCache};
use crate::core::config::Config;
use crate::core::error::{AppError, AppResult};
use crate::services::sales::SalesService;
use crate::services::stock::StockService;
use crate::services::sync::SyncService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Completed,
    Failed,
}

/// Pollable status of a refresh job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub state: JobState,
    /// Coarse completion percentage
    pub progress: u8,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    fn running(job_id: &str, progress: u8, message: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.to_string(),
            state: JobState::Running,
            progress,
            message: message.into(),
            started_at,
            finished_at: None,
        }
    }
}

/// Runs the full refresh (stores, catalog, stock, monthly sales) as a
/// supervised background task.
///
/// At most one refresh runs per deployment: the job takes a leased lock
/// before it spawns and releases it on every exit path, including panic.
/// A crashed process cannot wedge the lock past its lease.
#[derive(Clone)]
pub struct RefreshRunner {
    sync: SyncService,
    stock: StockService,
    sales: SalesService,
    cache: SharedCache,
    lock: RefreshLock,
    config: Config,
    /// Token for the currently running job, replaced on each start
    cancel: Arc<Mutex<CancellationToken>>,
}

impl RefreshRunner {
    pub fn new(
        sync: SyncService,
        stock: StockService,
        sales: SalesService,
        cache: SharedCache,
        config: Config,
    ) -> Self {
        let lock = RefreshLock::new(Arc::clone(&cache), config.lock_lease);
        Self {
            sync,
            stock,
            sales,
            cache,
            lock,
            config,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    /// Start a refresh job; returns its id for polling.
    ///
    /// Fails with [`AppError::Conflict`] while another job holds the lock.
    pub async fn start(&self) -> AppResult<String> {
        let job_id = Uuid::new_v4().to_string();
        if !self.lock.acquire(&job_id).await {
            return Err(AppError::conflict("a refresh job is already running"));
        }

        let started_at = Utc::now();
        self.write_status(JobStatus::running(&job_id, 0, "starting", started_at))
            .await;

        let token = CancellationToken::new();
        if let Ok(mut current) = self.cancel.lock() {
            *current = token.clone();
        }

        let runner = self.clone();
        let spawned_id = job_id.clone();
        tokio::spawn(async move {
            let result = AssertUnwindSafe(runner.run(&spawned_id, started_at, token))
                .catch_unwind()
                .await;

            let mut status = runner
                .status(&spawned_id)
                .await
                .unwrap_or_else(|| JobStatus::running(&spawned_id, 0, "starting", started_at));
            status.finished_at = Some(Utc::now());
            match result {
                Ok(Ok(())) => {
                    status.state = JobState::Completed;
                    status.progress = 100;
                    status.message = "refresh complete".into();
                    tracing::info!(job_id = %spawned_id, "refresh job complete");
                }
                Ok(Err(err)) => {
                    status.state = JobState::Failed;
                    status.message = err.to_string();
                    tracing::error!(job_id = %spawned_id, "refresh job failed: {err}");
                }
                Err(_) => {
                    status.state = JobState::Failed;
                    status.message = "refresh job panicked".into();
                    tracing::error!(job_id = %spawned_id, "refresh job panicked");
                }
            }
            runner.write_status(status).await;
            runner.lock.release(&spawned_id).await;
        });

        Ok(job_id)
    }

    /// Poll a job's status; `None` once retention has expired or for an
    /// unknown id
    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        let payload = self.cache.get(&cache::job_key(job_id)).await?;
        serde_json::from_str(&payload).ok()
    }

    /// Whether a refresh is currently running
    pub async fn busy(&self) -> bool {
        self.lock.held().await
    }

    /// Ask the running job to stop at its next step boundary (or abort the
    /// in-flight step). No-op when nothing is running.
    pub fn cancel(&self) {
        if let Ok(current) = self.cancel.lock() {
            current.cancel();
        }
    }

    async fn run(
        &self,
        job_id: &str,
        started_at: DateTime<Utc>,
        token: CancellationToken,
    ) -> AppResult<()> {
        let progress = |pct: u8, message: &str| {
            JobStatus::running(job_id, pct, message, started_at)
        };
        let cancelled = || AppError::internal("refresh job cancelled");

        self.write_status(progress(1, "syncing stores")).await;
        let stores = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(cancelled()),
            result = self.sync.sync_stores() => result?,
        };

        self.write_status(progress(10, "syncing catalog")).await;
        let catalog = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(cancelled()),
            result = self.sync.sync_catalog() => result?,
        };

        self.write_status(progress(40, "syncing stock levels")).await;
        let stock = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(cancelled()),
            result = self.stock.sync_all(None, None) => result?,
        };

        self.write_status(progress(70, "recomputing monthly sales")).await;
        let sales = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(cancelled()),
            result = self.sales.warm_all() => result?,
        };

        self.write_status(progress(95, "finishing")).await;
        tracing::info!(
            job_id,
            stores = stores.fetched,
            products = catalog.fetched,
            stock_products = stock.products,
            sales_rows = sales.rows_written,
            "refresh pass finished"
        );
        Ok(())
    }

    async fn write_status(&self, status: JobStatus) {
        if let Ok(payload) = serde_json::to_string(&status) {
            self.cache
                .set(&cache::job_key(&status.job_id), payload, Some(self.config.job_retention))
                .await;
        }
    }
}
