use reqwest::{
    header::{HeaderMap, HeaderValue},
    StatusCode,
};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

pub struct HttpClient {
    pub client: ClientWithMiddleware,
}

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("invalid client id: {0}")]
    InvalidClientId(#[from] reqwest::header::InvalidHeaderValue),
    #[error("could not build http client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("reqwest middleware error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),
    #[error("unexpected status: {0}")]
    UnexpectedStatus(StatusCode),
}

impl DownloadError {
    /// Connection-class failures are retried by the supervisor; decode
    /// failures mean the upstream shape changed and are not.
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::ReqwestError(e) => !e.is_decode(),
            DownloadError::ReqwestMiddlewareError(_) => true,
            DownloadError::UnexpectedStatus(_) => true,
        }
    }
}

impl HttpClient {
    pub fn new(client_id: &str) -> Result<HttpClient, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert("Client-ID", HeaderValue::from_str(client_id)?);

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(HttpClient { client })
    }

    pub async fn get_text(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<(StatusCode, String), DownloadError> {
        let mut req = self.client.get(url);
        if !query.is_empty() {
            req = req.query(query);
        }

        let resp = req.send().await?;
        let status = resp.status();

        Ok((status, resp.text().await?))
    }

    pub async fn get_json<T>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, DownloadError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut req = self.client.get(url);
        if !query.is_empty() {
            req = req.query(query);
        }

        Ok(req.send().await?.error_for_status()?.json().await?)
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let resp = self.client.get(url).send().await?.error_for_status()?;

        Ok(resp.bytes().await?.to_vec())
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value > 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}
