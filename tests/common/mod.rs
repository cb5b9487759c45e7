#![allow(dead_code)]

use repo_likes::api::{ApiClient, ClientConfig};
use repo_likes::server::{self, BackendState};
use repo_likes::types::RepositoryRecord;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;

pub fn record(id: u64, title: &str, techs: &[&str], likes: u64) -> RepositoryRecord {
    RepositoryRecord {
        id: id.into(),
        title: title.to_string(),
        url: format!("https://github.com/rocketseat/{}", title.to_lowercase()),
        techs: techs.iter().map(|t| t.to_string()).collect(),
        likes,
    }
}

pub fn sample_repositories() -> Vec<RepositoryRecord> {
    vec![
        record(1, "GoBarber", &["Node.js", "Express"], 0),
        record(2, "GoStack", &["React", "React Native"], 3),
        record(3, "Umbriel", &["TypeScript"], 7),
    ]
}

/// In-memory backend bound to an ephemeral port for the lifetime of the test
pub struct TestContext {
    pub addr: SocketAddr,
    pub state: BackendState,
    server: JoinHandle<()>,
}

impl TestContext {
    pub async fn new(repositories: Vec<RepositoryRecord>) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = BackendState::new(repositories);

        let server_state = state.clone();
        let server = tokio::spawn(async move {
            if let Err(e) = server::serve(listener, server_state).await {
                eprintln!("Test backend stopped: {}", e);
            }
        });

        Ok(TestContext { addr, state, server })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> anyhow::Result<ApiClient> {
        let config = ClientConfig::from_url(&self.base_url())?
            .with_timeout(Duration::from_secs(5));
        Ok(ApiClient::new(config)?)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}
