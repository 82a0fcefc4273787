//! Per-signer transaction nonce sequencing.
//!
//! Each signer owns one actor task that hands out strictly increasing nonces.
//! The actor reconciles with the chain on an interval and forgets its counter
//! when a submission reports a nonce conflict.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::chain::{Address, ChainClient, ChainError};
use crate::tokio_tools::spawn_named_task;

const LOG_TARGET: &str = "rps::nonce";
const COMMAND_CHANNEL_CAPACITY: usize = 64;
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
    #[error("failed to read nonce from chain: {0}")]
    Chain(#[from] ChainError),

    #[error("nonce sequencer for {0} has stopped")]
    Closed(Address),

    #[error("signer pool is empty")]
    EmptyPool,
}

enum Command {
    Reserve(oneshot::Sender<Result<u64, NonceError>>),
    Invalidate,
    Peek(oneshot::Sender<Option<u64>>),
}

/// Handle to a running nonce actor. Cheap to clone.
#[derive(Clone)]
pub struct NonceSequencer {
    signer: Address,
    commands: mpsc::Sender<Command>,
}

impl NonceSequencer {
    pub fn spawn(
        signer: Address,
        chain: Arc<dyn ChainClient>,
        refresh_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (commands, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let actor = NonceActor {
            signer: signer.clone(),
            chain,
            next: None,
        };
        spawn_named_task(
            format!("nonce-sequencer-{signer}"),
            actor.run(rx, refresh_interval, cancel),
        );
        Self { signer, commands }
    }

    pub fn signer(&self) -> &Address {
        &self.signer
    }

    /// Claim the next nonce. Consecutive calls never return the same value
    /// unless the counter was invalidated in between.
    pub async fn reserve(&self) -> Result<u64, NonceError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Reserve(reply)).await?;
        response.await.map_err(|_| self.closed())?
    }

    /// Drop the local counter; the next reservation re-reads the chain.
    pub async fn invalidate(&self) -> Result<(), NonceError> {
        self.send(Command::Invalidate).await
    }

    /// The nonce the next reservation would return, if known locally.
    pub async fn peek(&self) -> Result<Option<u64>, NonceError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Peek(reply)).await?;
        response.await.map_err(|_| self.closed())
    }

    async fn send(&self, command: Command) -> Result<(), NonceError> {
        self.commands.send(command).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> NonceError {
        NonceError::Closed(self.signer.clone())
    }
}

struct NonceActor {
    signer: Address,
    chain: Arc<dyn ChainClient>,
    next: Option<u64>,
}

impl NonceActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        refresh_interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut refresh = tokio::time::interval(refresh_interval.max(MIN_REFRESH_INTERVAL));
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        refresh.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(target: LOG_TARGET, signer = %self.signer, "nonce sequencer stopped");
                    break;
                }
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle(command).await;
                }
                _ = refresh.tick() => {
                    self.refresh().await;
                }
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Reserve(reply) => {
                let result = self.reserve().await;
                let _ = reply.send(result);
            }
            Command::Invalidate => {
                tracing::info!(
                    target: LOG_TARGET,
                    signer = %self.signer,
                    discarded = ?self.next,
                    "invalidated local nonce"
                );
                self.next = None;
            }
            Command::Peek(reply) => {
                let _ = reply.send(self.next);
            }
        }
    }

    async fn reserve(&mut self) -> Result<u64, NonceError> {
        let nonce = match self.next {
            Some(nonce) => nonce,
            None => {
                let nonce = self.chain.pending_nonce(&self.signer).await?;
                tracing::debug!(target: LOG_TARGET, signer = %self.signer, nonce, "loaded nonce from chain");
                nonce
            }
        };
        self.next = Some(nonce + 1);
        Ok(nonce)
    }

    /// `next = max(local, chain)`; never moves the counter backwards.
    async fn refresh(&mut self) {
        let Some(local) = self.next else { return };
        match self.chain.pending_nonce(&self.signer).await {
            Ok(chain) if chain > local => {
                tracing::info!(
                    target: LOG_TARGET,
                    signer = %self.signer,
                    local,
                    chain,
                    "chain nonce ahead of local counter"
                );
                self.next = Some(chain);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, signer = %self.signer, error = %err, "nonce refresh failed");
            }
        }
    }
}

/// Round-robin selection over signers, each with its own sequencer.
pub struct SignerPool {
    sequencers: Vec<NonceSequencer>,
    cursor: AtomicUsize,
}

impl SignerPool {
    pub fn new(sequencers: Vec<NonceSequencer>) -> Result<Self, NonceError> {
        if sequencers.is_empty() {
            return Err(NonceError::EmptyPool);
        }
        Ok(Self {
            sequencers,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn spawn(
        signers: &[Address],
        chain: Arc<dyn ChainClient>,
        refresh_interval: Duration,
        cancel: CancellationToken,
    ) -> Result<Self, NonceError> {
        let sequencers = signers
            .iter()
            .map(|signer| {
                NonceSequencer::spawn(
                    signer.clone(),
                    Arc::clone(&chain),
                    refresh_interval,
                    cancel.child_token(),
                )
            })
            .collect();
        Self::new(sequencers)
    }

    pub fn next(&self) -> &NonceSequencer {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.sequencers.len();
        &self.sequencers[index]
    }

    pub fn len(&self) -> usize {
        self.sequencers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequencers.is_empty()
    }
}
