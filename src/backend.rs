//! Game backend client
//!
//! The backend owns rounds, answer checking and scores. The session only
//! talks to it through the [`GameBackend`] trait; [`HttpBackend`] is the
//! implementation speaking to the real `/api/game` endpoints.

use async_trait::async_trait;
use garde::Validate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{config::BackendConfig, leaderboard::PlayerScore, round::Round};

/// Errors raised while talking to the backend
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The backend answered with a non-success status
    #[error("backend request failed with status {0}")]
    HttpStatus(StatusCode),
    /// The request could not be sent or its body could not be decoded
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The configured base URL cannot be joined with an endpoint path
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
    /// The backend configuration failed validation
    #[error("invalid backend configuration: {0}")]
    Config(#[from] garde::Report),
}

/// The endpoints the game screens rely on
#[async_trait]
pub trait GameBackend: Send + Sync {
    /// Begins a round server-side (`POST /api/game/start`)
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    async fn start_game(&self) -> Result<(), Error>;

    /// Retrieves the active round (`GET /api/game/current-song`)
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a round.
    async fn current_round(&self) -> Result<Round, Error>;

    /// Records that the hint is on screen (`POST /api/game/show-hint`)
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected.
    async fn show_hint(&self) -> Result<(), Error>;

    /// Verifies a chat guess (`POST /api/game/check-answer`)
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body lacks a verdict.
    async fn check_answer(&self, username: &str, answer: &str) -> Result<bool, Error>;

    /// Fetches the final standings (`GET /api/game/results`)
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a score list.
    async fn results(&self) -> Result<Vec<PlayerScore>, Error>;
}

#[derive(Debug, Deserialize)]
struct CheckAnswerResponse {
    is_correct: bool,
}

/// [`GameBackend`] over HTTP
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Creates a client for the backend described by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, Error> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
        })
    }

    /// Creates a client configured from the environment
    ///
    /// # Errors
    ///
    /// See [`HttpBackend::new`].
    pub fn from_env() -> Result<Self, Error> {
        Self::new(&BackendConfig::from_env())
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_ignoring_body(&self, path: &str) -> Result<(), Error> {
        let response = self.client.post(self.endpoint(path)?).send().await?;
        if !response.status().is_success() {
            return Err(Error::HttpStatus(response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl GameBackend for HttpBackend {
    async fn start_game(&self) -> Result<(), Error> {
        self.post_ignoring_body("/api/game/start").await
    }

    async fn current_round(&self) -> Result<Round, Error> {
        let response = self
            .client
            .get(self.endpoint("/api/game/current-song")?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn show_hint(&self) -> Result<(), Error> {
        self.post_ignoring_body("/api/game/show-hint").await
    }

    async fn check_answer(&self, username: &str, answer: &str) -> Result<bool, Error> {
        let response = self
            .client
            .post(self.endpoint("/api/game/check-answer")?)
            .query(&[("username", username), ("answer", answer)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::HttpStatus(response.status()));
        }
        let body: CheckAnswerResponse = response.json().await?;
        Ok(body.is_correct)
    }

    async fn results(&self) -> Result<Vec<PlayerScore>, Error> {
        let response = self
            .client
            .get(self.endpoint("/api/game/results")?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(&BackendConfig {
            base_url: base_url.to_owned(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoints_join_onto_base() {
        let backend = backend("http://quiz.local:8000");
        assert_eq!(
            backend.endpoint("/api/game/current-song").unwrap().as_str(),
            "http://quiz.local:8000/api/game/current-song"
        );
    }

    #[test]
    fn test_absolute_paths_replace_base_path() {
        let backend = backend("http://quiz.local/prefix/");
        assert_eq!(
            backend.endpoint("/api/game/results").unwrap().as_str(),
            "http://quiz.local/api/game/results"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpBackend::new(&BackendConfig {
            base_url: "::not a url::".to_owned(),
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_check_answer_body() {
        let body: CheckAnswerResponse = serde_json::from_str(r#"{"is_correct":true}"#).unwrap();
        assert!(body.is_correct);
    }

    #[test]
    fn test_status_error_message() {
        let error = Error::HttpStatus(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            error.to_string(),
            "backend request failed with status 503 Service Unavailable"
        );
    }
}
