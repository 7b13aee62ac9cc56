//! Single-instance pool coordinator and its message-passing handle.
//!
//! The authoritative `CredentialPool` lives inside one task. Every other
//! execution context talks to it through a `PoolHandle` carrying statically
//! typed `PoolCommand` values, so the full set of operations is a closed,
//! exhaustively matched enum. Mutating commands are applied and persisted by
//! the coordinator before it takes the next command; outcome reports carry no
//! reply channel, so callers never wait on durability.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::{
    CredentialHealth, CredentialOutcome, CredentialPool, PoolError, SelectedCredential, StateStore,
};

/// Storage key under which the secret-free health snapshot is persisted.
pub const HEALTH_STATE_KEY: &str = "credential_health";

const COMMAND_QUEUE_DEPTH: usize = 64;

pub enum PoolCommand {
    Select {
        reply: oneshot::Sender<Result<SelectedCredential, PoolError>>,
    },
    CredentialAt {
        index: usize,
        reply: oneshot::Sender<Option<SelectedCredential>>,
    },
    ReportOutcome {
        index: usize,
        outcome: CredentialOutcome,
    },
    Reconfigure {
        secrets: Vec<String>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<CredentialHealth>>,
    },
}

pub struct PoolCoordinator {
    pool: CredentialPool,
    store: Arc<dyn StateStore>,
    rx: mpsc::Receiver<PoolCommand>,
}

impl PoolCoordinator {
    /// Restores persisted health state, then starts the coordinator task and
    /// returns a cloneable handle to it.
    pub async fn spawn(secrets: Vec<String>, store: Arc<dyn StateStore>) -> PoolHandle {
        let mut pool = CredentialPool::new(secrets);

        let keys = vec![HEALTH_STATE_KEY.to_string()];
        match store.get(&keys).await {
            Ok(mut entries) => {
                if let Some(value) = entries.remove(HEALTH_STATE_KEY) {
                    match serde_json::from_value::<Vec<CredentialHealth>>(value) {
                        Ok(snapshot) => pool.restore(&snapshot),
                        Err(error) => {
                            tracing::warn!(%error, "ignoring undecodable credential health state");
                        }
                    }
                }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to load persisted credential health state");
            }
        }

        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let coordinator = Self { pool, store, rx };
        tokio::spawn(coordinator.run());

        PoolHandle { tx }
    }

    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                PoolCommand::Select { reply } => {
                    let _ = reply.send(self.pool.select());
                }
                PoolCommand::CredentialAt { index, reply } => {
                    let _ = reply.send(self.pool.credential_at(index));
                }
                PoolCommand::ReportOutcome { index, outcome } => {
                    match outcome {
                        CredentialOutcome::Success => self.pool.report_success(index),
                        CredentialOutcome::Failure(class) => self.pool.report_failure(index, class),
                    }
                    self.persist().await;
                }
                PoolCommand::Reconfigure { secrets } => {
                    self.pool.reconfigure(secrets);
                    self.persist().await;
                }
                PoolCommand::Snapshot { reply } => {
                    let _ = reply.send(self.pool.snapshot());
                }
            }
        }
    }

    async fn persist(&self) {
        let snapshot = self.pool.snapshot();
        let value = match serde_json::to_value(&snapshot) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, "failed to encode credential health snapshot");
                return;
            }
        };

        let entries = HashMap::from([(HEALTH_STATE_KEY.to_string(), value)]);
        if let Err(error) = self.store.set(entries).await {
            tracing::warn!(%error, "failed to persist credential health snapshot");
        }
    }
}

#[derive(Clone)]
pub struct PoolHandle {
    tx: mpsc::Sender<PoolCommand>,
}

impl PoolHandle {
    pub async fn select(&self) -> Result<SelectedCredential, PoolError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(PoolCommand::Select { reply })
            .await
            .map_err(|_| PoolError::coordinator("pool coordinator is gone"))?;

        response
            .await
            .map_err(|_| PoolError::coordinator("pool coordinator dropped the reply"))?
    }

    pub async fn credential_at(&self, index: usize) -> Result<Option<SelectedCredential>, PoolError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(PoolCommand::CredentialAt { index, reply })
            .await
            .map_err(|_| PoolError::coordinator("pool coordinator is gone"))?;

        response
            .await
            .map_err(|_| PoolError::coordinator("pool coordinator dropped the reply"))
    }

    /// Fire-and-forget outcome report. Delivery failures are logged, never
    /// surfaced, so a turn is never blocked on pool bookkeeping.
    pub async fn report_outcome(&self, index: usize, outcome: CredentialOutcome) {
        if self
            .tx
            .send(PoolCommand::ReportOutcome { index, outcome })
            .await
            .is_err()
        {
            tracing::warn!(index, "dropping credential outcome report, coordinator is gone");
        }
    }

    pub async fn reconfigure(&self, secrets: Vec<String>) -> Result<(), PoolError> {
        self.tx
            .send(PoolCommand::Reconfigure { secrets })
            .await
            .map_err(|_| PoolError::coordinator("pool coordinator is gone"))
    }

    pub async fn snapshot(&self) -> Result<Vec<CredentialHealth>, PoolError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(PoolCommand::Snapshot { reply })
            .await
            .map_err(|_| PoolError::coordinator("pool coordinator is gone"))?;

        response
            .await
            .map_err(|_| PoolError::coordinator("pool coordinator dropped the reply"))
    }
}
