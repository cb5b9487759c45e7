use crate::api::RepositoryApi;
use crate::error::{RepoLikesError, Result};
use crate::store::{RepositoryListStore, Snapshot};
use crate::types::{LikeFailure, LikeOutcome, RepositoryId, RepositoryRecord};
use futures::future::join_all;
use ractor::rpc::CallResult;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort, SpawnErr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Owns the repository list store. The mailbox is the single queue that every
/// write goes through, so the store itself needs no locking.
pub struct RepositoryListActor;

/// State for the repository list actor
pub struct RepositoryListState {
    api: Arc<dyn RepositoryApi>,
    store: RepositoryListStore,
    likes_applied: u64,
    likes_failed: u64,
    refreshes: u64,
}

/// Messages the repository list actor can handle
pub enum RepositoryListMessage {
    /// Fetch the full list from the API and load it
    Refresh(Option<RpcReplyPort<Result<usize>>>),
    /// Replace the whole list
    LoadAll(Vec<RepositoryRecord>),
    /// Swap one record for its updated version
    ReplaceById {
        id: RepositoryId,
        record: RepositoryRecord,
    },
    /// Like a repository; the network call runs outside the mailbox
    Like {
        id: RepositoryId,
        reply: Option<RpcReplyPort<LikeOutcome>>,
    },
    /// Internal: a like round-trip failed
    LikeFailed(LikeFailure),
    /// Current snapshot of the list
    GetSnapshot(RpcReplyPort<Snapshot>),
    /// Receiver notified on every snapshot change
    Subscribe(RpcReplyPort<watch::Receiver<Snapshot>>),
    /// Counters for the list
    GetStats(RpcReplyPort<RepositoryListStats>),
}

impl std::fmt::Debug for RepositoryListMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Refresh(_) => write!(f, "Refresh"),
            Self::LoadAll(records) => write!(f, "LoadAll({} records)", records.len()),
            Self::ReplaceById { id, .. } => write!(f, "ReplaceById({})", id),
            Self::Like { id, .. } => write!(f, "Like({})", id),
            Self::LikeFailed(failure) => write!(f, "LikeFailed({})", failure.id),
            Self::GetSnapshot(_) => write!(f, "GetSnapshot"),
            Self::Subscribe(_) => write!(f, "Subscribe"),
            Self::GetStats(_) => write!(f, "GetStats"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryListStats {
    pub version: u64,
    pub records: usize,
    pub likes_applied: u64,
    pub likes_failed: u64,
    pub refreshes: u64,
}

impl RepositoryListActor {
    /// Spawn the actor with an empty list
    pub async fn spawn_with_api(
        api: Arc<dyn RepositoryApi>
    ) -> std::result::Result<ActorRef<RepositoryListMessage>, SpawnErr> {
        let (actor_ref, _handle) = Actor::spawn(None, RepositoryListActor, api).await?;
        info!("Repository list actor started");
        Ok(actor_ref)
    }
}

#[ractor::async_trait]
impl Actor for RepositoryListActor {
    type Msg = RepositoryListMessage;
    type State = RepositoryListState;
    type Arguments = Arc<dyn RepositoryApi>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        api: Self::Arguments
    ) -> std::result::Result<Self::State, ActorProcessingErr> {
        debug!("Starting repository list actor");

        Ok(RepositoryListState {
            api,
            store: RepositoryListStore::new(),
            likes_applied: 0,
            likes_failed: 0,
            refreshes: 0,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> std::result::Result<(), ActorProcessingErr> {
        match message {
            RepositoryListMessage::Refresh(reply) => {
                // Blocks the mailbox on purpose: nothing should merge into a list
                // that is about to be replaced.
                let outcome = match state.api.list_repositories().await {
                    Ok(records) => {
                        let count = records.len();
                        state.store.load_all(records);
                        state.refreshes += 1;
                        info!(count, version = state.store.version(), "Repository list loaded");
                        Ok(count)
                    }
                    Err(e) => {
                        error!("Failed to fetch repositories: {}", e);
                        Err(e)
                    }
                };

                if let Some(reply) = reply {
                    if !reply.is_closed() {
                        let _ = reply.send(outcome);
                    }
                }
            }

            RepositoryListMessage::LoadAll(records) => {
                state.store.load_all(records);
            }

            RepositoryListMessage::ReplaceById { id, record } => {
                let likes = record.likes;
                if state.store.replace_by_id(&id, record) {
                    state.likes_applied += 1;
                    debug!(%id, likes, version = state.store.version(), "Repository updated");
                } else {
                    warn!(%id, "Updated repository is no longer in the list");
                }
            }

            RepositoryListMessage::Like { id, reply } => {
                let api = state.api.clone();

                tokio::spawn(async move {
                    let outcome = match api.like_repository(&id).await {
                        Ok(record) => {
                            // Enqueue the merge before answering so a caller that reads the
                            // snapshot after the reply already sees it.
                            match myself.send_message(RepositoryListMessage::ReplaceById {
                                id: id.clone(),
                                record: record.clone(),
                            }) {
                                Ok(()) => Ok(record),
                                Err(e) => {
                                    error!(%id, "Failed to send ReplaceById message: {}", e);
                                    Err(LikeFailure {
                                        id: id.clone(),
                                        reason: "list actor stopped".to_string(),
                                    })
                                }
                            }
                        }
                        Err(e) => {
                            let failure = LikeFailure {
                                id: id.clone(),
                                reason: e.to_string(),
                            };
                            let _ = myself.send_message(
                                RepositoryListMessage::LikeFailed(failure.clone())
                            );
                            Err(failure)
                        }
                    };

                    if let Some(reply) = reply {
                        if !reply.is_closed() {
                            let _ = reply.send(outcome);
                        }
                    }
                });
            }

            RepositoryListMessage::LikeFailed(failure) => {
                state.likes_failed += 1;
                warn!(id = %failure.id, "Like failed, keeping last known list: {}", failure.reason);
            }

            RepositoryListMessage::GetSnapshot(reply) => {
                if !reply.is_closed() {
                    let _ = reply.send(state.store.snapshot());
                }
            }

            RepositoryListMessage::Subscribe(reply) => {
                if !reply.is_closed() {
                    let _ = reply.send(state.store.subscribe());
                }
            }

            RepositoryListMessage::GetStats(reply) => {
                let stats = RepositoryListStats {
                    version: state.store.version(),
                    records: state.store.records().len(),
                    likes_applied: state.likes_applied,
                    likes_failed: state.likes_failed,
                    refreshes: state.refreshes,
                };

                if !reply.is_closed() {
                    let _ = reply.send(stats);
                }
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State
    ) -> std::result::Result<(), ActorProcessingErr> {
        info!(
            "Repository list actor stopped. Likes applied: {}, failed: {}",
            state.likes_applied,
            state.likes_failed
        );
        Ok(())
    }
}

/// Ask the actor to fetch and load the full list. Returns the number of records loaded.
pub async fn refresh(
    actor: &ActorRef<RepositoryListMessage>,
    timeout: Duration
) -> Result<usize> {
    match actor.call(|reply| RepositoryListMessage::Refresh(Some(reply)), Some(timeout)).await {
        Ok(CallResult::Success(Ok(count))) => Ok(count),
        Ok(CallResult::Success(Err(e))) => Err(e),
        Ok(CallResult::Timeout) => {
            Err(RepoLikesError::ActorError("Timeout waiting for refresh".to_string()))
        }
        Ok(CallResult::SenderError) => {
            Err(RepoLikesError::ActorError("Sender error during refresh".to_string()))
        }
        Err(e) => Err(RepoLikesError::ActorError(format!("Failed to request refresh: {}", e))),
    }
}

/// Like a repository and wait for the round-trip. The outer error is about the actor,
/// the inner one about the like itself.
pub async fn like(
    actor: &ActorRef<RepositoryListMessage>,
    id: RepositoryId,
    timeout: Duration
) -> Result<LikeOutcome> {
    let call = actor.call(
        |reply| RepositoryListMessage::Like { id: id.clone(), reply: Some(reply) },
        Some(timeout)
    ).await;

    match call {
        Ok(CallResult::Success(outcome)) => Ok(outcome),
        Ok(CallResult::Timeout) => {
            Err(RepoLikesError::ActorError(format!("Timeout waiting for like of {}", id)))
        }
        Ok(CallResult::SenderError) => {
            Err(RepoLikesError::ActorError(format!("Sender error while liking {}", id)))
        }
        Err(e) => Err(RepoLikesError::ActorError(format!("Failed to request like: {}", e))),
    }
}

pub async fn snapshot(
    actor: &ActorRef<RepositoryListMessage>,
    timeout: Duration
) -> Result<Snapshot> {
    match actor.call(RepositoryListMessage::GetSnapshot, Some(timeout)).await {
        Ok(CallResult::Success(snapshot)) => Ok(snapshot),
        Ok(_) => Err(RepoLikesError::ActorError("No snapshot returned".to_string())),
        Err(e) => Err(RepoLikesError::ActorError(format!("Failed to request snapshot: {}", e))),
    }
}

pub async fn subscribe(
    actor: &ActorRef<RepositoryListMessage>,
    timeout: Duration
) -> Result<watch::Receiver<Snapshot>> {
    match actor.call(RepositoryListMessage::Subscribe, Some(timeout)).await {
        Ok(CallResult::Success(receiver)) => Ok(receiver),
        Ok(_) => Err(RepoLikesError::ActorError("No subscription returned".to_string())),
        Err(e) => Err(RepoLikesError::ActorError(format!("Failed to subscribe: {}", e))),
    }
}

pub async fn stats(
    actor: &ActorRef<RepositoryListMessage>,
    timeout: Duration
) -> Result<RepositoryListStats> {
    match actor.call(RepositoryListMessage::GetStats, Some(timeout)).await {
        Ok(CallResult::Success(stats)) => Ok(stats),
        Ok(_) => Err(RepoLikesError::ActorError("No statistics returned".to_string())),
        Err(e) => Err(RepoLikesError::ActorError(format!("Failed to get statistics: {}", e))),
    }
}

/// Result of liking several repositories at once
#[derive(Debug, Clone)]
pub struct LikeReport {
    pub requested: usize,
    pub liked: Vec<RepositoryRecord>,
    pub failures: Vec<LikeFailure>,
    /// List after every round-trip settled; failed ids keep their last known record
    pub snapshot: Snapshot,
}

impl LikeReport {
    pub fn all_liked(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Err` when any like failed, so callers can exit non-zero after rendering
    pub fn ensure_all_liked(&self) -> Result<()> {
        if self.all_liked() {
            Ok(())
        } else {
            Err(RepoLikesError::ApiError(
                format!("{} of {} likes failed", self.failures.len(), self.requested)
            ))
        }
    }
}

/// Like every id concurrently and collect the outcome of each, including actor-level
/// errors, before taking the final snapshot.
pub async fn like_all(
    actor: &ActorRef<RepositoryListMessage>,
    ids: Vec<RepositoryId>,
    timeout: Duration
) -> Result<LikeReport> {
    let requested = ids.len();
    let likes = ids.into_iter().map(|id| async move {
        match like(actor, id.clone(), timeout).await {
            Ok(outcome) => outcome,
            Err(e) => Err(LikeFailure { id, reason: e.to_string() }),
        }
    });

    let mut liked = Vec::new();
    let mut failures = Vec::new();
    for outcome in join_all(likes).await {
        match outcome {
            Ok(record) => liked.push(record),
            Err(failure) => failures.push(failure),
        }
    }

    let snapshot = snapshot(actor, timeout).await?;

    Ok(LikeReport {
        requested,
        liked,
        failures,
        snapshot,
    })
}
