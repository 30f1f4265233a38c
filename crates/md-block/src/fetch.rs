//! Remote content fetching for `src`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use ureq::Agent;
use url::Url;

use crate::error::FetchError;

/// Future returned by [`Fetcher::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;

/// GET a URL and decode the body as text.
pub trait Fetcher: Send + Sync {
    /// Fetch `url`.
    fn fetch(&self, url: &Url) -> FetchFuture<'_>;
}

/// [`Fetcher`] for `http`, `https` and `file` URLs.
///
/// Requests run on tokio's blocking pool.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> FetchFuture<'_> {
        let agent = self.agent.clone();
        let url = url.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || fetch_blocking(&agent, &url))
                .await
                .map_err(|e| FetchError::Join(e.to_string()))?
        })
    }
}

fn fetch_blocking(agent: &Agent, url: &Url) -> Result<String, FetchError> {
    match url.scheme() {
        "http" | "https" => {
            let response = agent
                .get(url.as_str())
                .call()
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                return Err(FetchError::Http { status });
            }

            response
                .into_body()
                .read_to_string()
                .map_err(|e| FetchError::Body(e.to_string()))
        }
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| FetchError::Transport(format!("not a local path: {url}")))?;
            std::fs::read_to_string(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::InvalidData => FetchError::Body(e.to_string()),
                _ => FetchError::Transport(format!("{}: {e}", path.display())),
            })
        }
        other => Err(FetchError::UnsupportedScheme(other.to_owned())),
    }
}
