use serde::Deserialize;

use crate::util::{DownloadError, HttpClient};

pub const HELIX_URL: &str = "https://api.twitch.tv/helix";
pub const GATEWAY_URL: &str = "https://api.twitch.tv/api";
pub const USHER_URL: &str = "https://usher.ttvnw.net/api/channel/hls";

/// Short-lived playback credential. Valid until the service starts
/// answering 403, which is the only expiry signal it provides.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub sig: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamsEnvelope {
    pub data: Vec<StreamInfo>,
}

#[derive(Debug, Deserialize)]
pub struct StreamInfo {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub stream_type: String,
}

/// Outcome of a master-playlist request, with the status codes that
/// carry protocol meaning picked apart.
#[derive(Debug)]
pub enum MasterFetch {
    /// 403: the playback token is no longer accepted.
    Rejected,
    /// 404: the channel is not broadcasting.
    Offline,
    Playlist(String),
}

pub struct TwitchApi {
    client: HttpClient,
    helix_url: String,
    gateway_url: String,
    usher_url: String,
}

impl TwitchApi {
    pub fn new(client: HttpClient) -> TwitchApi {
        Self::with_endpoints(client, HELIX_URL, GATEWAY_URL, USHER_URL)
    }

    pub fn with_endpoints(
        client: HttpClient,
        helix_url: &str,
        gateway_url: &str,
        usher_url: &str,
    ) -> TwitchApi {
        TwitchApi {
            client,
            helix_url: helix_url.to_string(),
            gateway_url: gateway_url.to_string(),
            usher_url: usher_url.to_string(),
        }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub async fn is_live(&self, channel: &str) -> Result<bool, DownloadError> {
        let url = format!("{}/streams", self.helix_url);
        let streams: StreamsEnvelope = self
            .client
            .get_json(&url, &[("user_login", channel)])
            .await?;

        if let Some(stream) = streams.data.first() {
            debug!("{} is live: {}", channel, stream.title);
        }

        Ok(!streams.data.is_empty())
    }

    pub async fn access_token(&self, channel: &str) -> Result<AccessToken, DownloadError> {
        let url = format!("{}/channels/{}/access_token", self.gateway_url, channel);

        self.client.get_json(&url, &[]).await
    }

    pub async fn master_playlist(
        &self,
        channel: &str,
        token: &AccessToken,
    ) -> Result<MasterFetch, DownloadError> {
        let url = format!("{}/{}.m3u8", self.usher_url, channel);
        let query = [
            ("token", token.token.as_str()),
            ("sig", token.sig.as_str()),
            ("allow_source", "true"),
        ];
        let (status, body) = self.client.get_text(&url, &query).await?;
        debug!("Formats {}", status);

        match status {
            reqwest::StatusCode::FORBIDDEN => Ok(MasterFetch::Rejected),
            reqwest::StatusCode::NOT_FOUND => Ok(MasterFetch::Offline),
            s if s.is_success() => Ok(MasterFetch::Playlist(body)),
            s => Err(DownloadError::UnexpectedStatus(s)),
        }
    }
}
