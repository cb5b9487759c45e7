mod common;

use async_trait::async_trait;
use common::{record, sample_repositories, TestContext};
use repo_likes::actors::repository_list::{self, RepositoryListMessage};
use repo_likes::render::{render_list, RenderOptions};
use repo_likes::actors::RepositoryListActor;
use repo_likes::api::RepositoryApi;
use repo_likes::error::{RepoLikesError, Result};
use repo_likes::types::{RepositoryId, RepositoryRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const TIMEOUT: Duration = Duration::from_secs(5);

/// API double with per-id latency and failures
struct ScriptedApi {
    repositories: Mutex<Vec<RepositoryRecord>>,
    delays: HashMap<RepositoryId, Duration>,
    failing: Vec<RepositoryId>,
}

impl ScriptedApi {
    fn new(repositories: Vec<RepositoryRecord>) -> Self {
        Self {
            repositories: Mutex::new(repositories),
            delays: HashMap::new(),
            failing: Vec::new(),
        }
    }
}

#[async_trait]
impl RepositoryApi for ScriptedApi {
    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        Ok(self.repositories.lock().await.clone())
    }

    async fn like_repository(&self, id: &RepositoryId) -> Result<RepositoryRecord> {
        if let Some(delay) = self.delays.get(id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(id) {
            return Err(RepoLikesError::ApiError("backend unavailable".to_string()));
        }

        let mut repositories = self.repositories.lock().await;
        let repository = repositories
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| RepoLikesError::NotFound(id.to_string()))?;
        repository.likes += 1;
        Ok(repository.clone())
    }
}

#[tokio::test]
async fn test_refresh_loads_list_in_server_order() {
    let api = Arc::new(ScriptedApi::new(sample_repositories()));
    let actor = RepositoryListActor::spawn_with_api(api).await.expect("Failed to spawn actor");

    let count = repository_list::refresh(&actor, TIMEOUT).await.expect("Refresh failed");
    assert_eq!(count, 3);

    let snapshot = repository_list::snapshot(&actor, TIMEOUT).await.unwrap();
    assert_eq!(&*snapshot.records, sample_repositories().as_slice());

    actor.stop(None);
}

#[tokio::test]
async fn test_like_updates_only_that_record() {
    let api = Arc::new(ScriptedApi::new(sample_repositories()));
    let actor = RepositoryListActor::spawn_with_api(api).await.expect("Failed to spawn actor");
    repository_list::refresh(&actor, TIMEOUT).await.unwrap();

    let outcome = repository_list::like(&actor, RepositoryId::from(1), TIMEOUT).await.unwrap();
    let liked = outcome.expect("Like should succeed");
    assert_eq!(liked.likes, 1);

    let snapshot = repository_list::snapshot(&actor, TIMEOUT).await.unwrap();
    let expected = sample_repositories();
    assert_eq!(snapshot.records.len(), 3);
    assert_eq!(snapshot.records[0], record(1, "GoBarber", &["Node.js", "Express"], 1));
    assert_eq!(snapshot.records[1], expected[1]);
    assert_eq!(snapshot.records[2], expected[2]);

    actor.stop(None);
}

#[tokio::test]
async fn test_out_of_order_completions_touch_only_their_ids() {
    let mut api = ScriptedApi::new(sample_repositories());
    // The first like finishes last
    api.delays.insert(RepositoryId::from(1), Duration::from_millis(200));
    api.delays.insert(RepositoryId::from(3), Duration::from_millis(10));
    let actor = RepositoryListActor::spawn_with_api(Arc::new(api)).await.unwrap();
    repository_list::refresh(&actor, TIMEOUT).await.unwrap();

    let mut receiver = repository_list::subscribe(&actor, TIMEOUT).await.unwrap();
    let _ = receiver.borrow_and_update();

    let (first, third) = tokio::join!(
        repository_list::like(&actor, RepositoryId::from(1), TIMEOUT),
        repository_list::like(&actor, RepositoryId::from(3), TIMEOUT)
    );
    assert!(first.unwrap().is_ok());
    assert!(third.unwrap().is_ok());

    let snapshot = repository_list::snapshot(&actor, TIMEOUT).await.unwrap();
    assert_eq!(snapshot.records[0].likes, 1);
    assert_eq!(snapshot.records[1], sample_repositories()[1]);
    assert_eq!(snapshot.records[2].likes, 8);

    // The subscriber was notified of the changes
    assert!(receiver.has_changed().unwrap());
    assert_eq!(receiver.borrow_and_update().version, snapshot.version);

    actor.stop(None);
}

#[tokio::test]
async fn test_failed_like_keeps_last_known_list() {
    let mut api = ScriptedApi::new(sample_repositories());
    api.failing.push(RepositoryId::from(2));
    let actor = RepositoryListActor::spawn_with_api(Arc::new(api)).await.unwrap();
    repository_list::refresh(&actor, TIMEOUT).await.unwrap();
    let before = repository_list::snapshot(&actor, TIMEOUT).await.unwrap();

    let outcome = repository_list::like(&actor, RepositoryId::from(2), TIMEOUT).await.unwrap();
    let failure = outcome.expect_err("Like should fail");
    assert_eq!(failure.id, RepositoryId::from(2));
    assert!(failure.reason.contains("backend unavailable"));

    let after = repository_list::snapshot(&actor, TIMEOUT).await.unwrap();
    assert_eq!(after.version, before.version);
    assert_eq!(&*after.records, &*before.records);

    let stats = repository_list::stats(&actor, TIMEOUT).await.unwrap();
    assert_eq!(stats.likes_failed, 1);
    assert_eq!(stats.likes_applied, 0);
    assert_eq!(stats.refreshes, 1);

    actor.stop(None);
}

#[tokio::test]
async fn test_direct_messages_apply_in_order() {
    let api = Arc::new(ScriptedApi::new(Vec::new()));
    let actor = RepositoryListActor::spawn_with_api(api).await.unwrap();

    actor.send_message(RepositoryListMessage::LoadAll(sample_repositories())).unwrap();
    actor.send_message(RepositoryListMessage::ReplaceById {
        id: RepositoryId::from(2),
        record: record(2, "GoStack", &["React", "React Native"], 10),
    }).unwrap();
    actor.send_message(RepositoryListMessage::ReplaceById {
        id: RepositoryId::from(99),
        record: record(99, "Ghost", &[], 0),
    }).unwrap();

    let snapshot = repository_list::snapshot(&actor, TIMEOUT).await.unwrap();
    assert_eq!(snapshot.version, 3);
    assert_eq!(snapshot.records.len(), 3);
    assert_eq!(snapshot.records[1].likes, 10);

    let stats = repository_list::stats(&actor, TIMEOUT).await.unwrap();
    assert_eq!(stats.likes_applied, 1);
    assert_eq!(stats.records, 3);

    actor.stop(None);
}

#[tokio::test]
async fn test_end_to_end_against_backend() {
    let ctx = TestContext::new(sample_repositories()).await.expect("Failed to start backend");
    let client = ctx.client().expect("Failed to create client");
    let actor = RepositoryListActor::spawn_with_api(Arc::new(client)).await.unwrap();

    repository_list::refresh(&actor, TIMEOUT).await.unwrap();
    let outcome = repository_list::like(&actor, RepositoryId::from(3), TIMEOUT).await.unwrap();
    assert_eq!(outcome.unwrap().likes, 8);

    let missing = repository_list::like(&actor, RepositoryId::from(42), TIMEOUT).await.unwrap();
    assert!(missing.is_err());

    let snapshot = repository_list::snapshot(&actor, TIMEOUT).await.unwrap();
    assert_eq!(snapshot.records[2].likes, 8);
    assert_eq!(snapshot.records[0].likes, 0);

    actor.stop(None);
}

#[tokio::test]
async fn test_refresh_failure_reported() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = repo_likes::api::ClientConfig::from_url(&format!("http://{}", addr)).unwrap();
    let client = repo_likes::api::ApiClient::new(config).unwrap();
    let actor = RepositoryListActor::spawn_with_api(Arc::new(client)).await.unwrap();

    let result = repository_list::refresh(&actor, TIMEOUT).await;
    assert!(matches!(result, Err(RepoLikesError::NetworkError(_))));

    let snapshot = repository_list::snapshot(&actor, TIMEOUT).await.unwrap();
    assert!(snapshot.is_empty());

    actor.stop(None);
}

#[tokio::test]
async fn test_refresh_keeps_not_found_kind() {
    // Backend without a /repositories route
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, axum::Router::new()).await;
    });

    let config = repo_likes::api::ClientConfig::from_url(&format!("http://{}", addr)).unwrap();
    let client = repo_likes::api::ApiClient::new(config).unwrap();
    let actor = RepositoryListActor::spawn_with_api(Arc::new(client)).await.unwrap();

    match repository_list::refresh(&actor, TIMEOUT).await {
        Err(RepoLikesError::NotFound(url)) => {
            assert_eq!(url, format!("http://{}/repositories", addr));
        }
        other => panic!("Expected NotFound error, got: {:?}", other),
    }

    actor.stop(None);
    server.abort();
}

#[tokio::test]
async fn test_like_all_reports_failures_and_keeps_list() {
    let mut api = ScriptedApi::new(sample_repositories());
    api.failing.push(RepositoryId::from(2));
    let actor = RepositoryListActor::spawn_with_api(Arc::new(api)).await.unwrap();
    repository_list::refresh(&actor, TIMEOUT).await.unwrap();

    let ids = vec![RepositoryId::from(1), RepositoryId::from(2), RepositoryId::from(3)];
    let report = repository_list::like_all(&actor, ids, TIMEOUT).await.expect("Report expected");

    assert_eq!(report.requested, 3);
    assert_eq!(report.liked.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, RepositoryId::from(2));
    assert!(!report.all_liked());

    match report.ensure_all_liked() {
        Err(RepoLikesError::ApiError(message)) => assert_eq!(message, "1 of 3 likes failed"),
        other => panic!("Expected ApiError, got: {:?}", other),
    }

    // Successful likes are merged, the failed one keeps its last known count
    let output = render_list(&report.snapshot.records, &RenderOptions {
        color: false,
        show_test_ids: true,
    });
    assert!(output.contains("1 curtidas  <repository-likes-1>"));
    assert!(output.contains("3 curtidas  <repository-likes-2>"));
    assert!(output.contains("8 curtidas  <repository-likes-3>"));

    actor.stop(None);
}

#[tokio::test]
async fn test_like_all_succeeds_when_every_like_lands() {
    let api = Arc::new(ScriptedApi::new(sample_repositories()));
    let actor = RepositoryListActor::spawn_with_api(api).await.unwrap();
    repository_list::refresh(&actor, TIMEOUT).await.unwrap();

    let ids = vec![RepositoryId::from(1), RepositoryId::from(3)];
    let report = repository_list::like_all(&actor, ids, TIMEOUT).await.unwrap();

    assert!(report.all_liked());
    assert!(report.ensure_all_liked().is_ok());
    assert_eq!(report.snapshot.records[0].likes, 1);
    assert_eq!(report.snapshot.records[1], sample_repositories()[1]);
    assert_eq!(report.snapshot.records[2].likes, 8);

    actor.stop(None);
}

#[tokio::test]
async fn test_like_completing_after_stop_is_a_failure() {
    let mut api = ScriptedApi::new(sample_repositories());
    api.delays.insert(RepositoryId::from(1), Duration::from_millis(300));
    let actor = RepositoryListActor::spawn_with_api(Arc::new(api)).await.unwrap();
    repository_list::refresh(&actor, TIMEOUT).await.unwrap();

    let (outcome, stopped) = tokio::join!(
        repository_list::like(&actor, RepositoryId::from(1), TIMEOUT),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            actor.stop_and_wait(None, None).await
        }
    );
    assert!(stopped.is_ok());

    let failure = outcome.unwrap().expect_err("Like should not report success");
    assert_eq!(failure.id, RepositoryId::from(1));
    assert_eq!(failure.reason, "list actor stopped");
}
