use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;

use crate::{
    playlist::{self, PlaylistError},
    quality::Quality,
    twitch::{MasterFetch, TwitchApi},
    util::DownloadError,
};

const TOKEN_RETRY_LIMIT: usize = 5;
const TOKEN_BACKOFF_CAP: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum Resolution {
    /// The chosen variant's segment-list URL.
    Active(String),
    /// The channel stopped broadcasting before a variant could be
    /// resolved.
    Offline,
    /// No variant on offer satisfies the constraint.
    NoMatch,
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("download error: {0}")]
    Download(#[from] DownloadError),
    #[error("playlist error: {0}")]
    Playlist(#[from] PlaylistError),
    #[error("playback token rejected {0} times")]
    TokenRetriesExhausted(usize),
}

impl ResolveError {
    pub fn is_transient(&self) -> bool {
        match self {
            ResolveError::Download(e) => e.is_transient(),
            ResolveError::Playlist(_) => false,
            ResolveError::TokenRetriesExhausted(_) => true,
        }
    }
}

/// Per-session resolution state. The variant chosen on the first
/// successful resolve is pinned for every re-resolve after that.
pub struct Resolver {
    chosen: Option<usize>,
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver { chosen: None }
    }

    /// Line index of the pinned variant's URL in the master playlist.
    pub fn chosen_line(&self) -> Option<usize> {
        self.chosen
    }

    /// Acquire a playback token and turn it into the segment-list URL
    /// of a variant within `constraint`. Rejected tokens are
    /// re-acquired a bounded number of times, backing off in between.
    pub async fn resolve(
        &mut self,
        api: &TwitchApi,
        channel: &str,
        constraint: &Quality,
    ) -> Result<Resolution, ResolveError> {
        let mut backoff = ExponentialBackoff::from_millis(2)
            .factor(500)
            .max_delay(TOKEN_BACKOFF_CAP);

        for _ in 0..TOKEN_RETRY_LIMIT {
            let token = api.access_token(channel).await?;

            let master = match api.master_playlist(channel, &token).await? {
                MasterFetch::Rejected => {
                    warn!("Playback token rejected");
                    if let Some(delay) = backoff.next() {
                        tokio::time::sleep(delay).await;
                    }
                    continue;
                }
                MasterFetch::Offline => return Ok(Resolution::Offline),
                MasterFetch::Playlist(body) => body,
            };

            return self.select(&master, constraint);
        }

        Err(ResolveError::TokenRetriesExhausted(TOKEN_RETRY_LIMIT))
    }

    fn select(&mut self, master: &str, constraint: &Quality) -> Result<Resolution, ResolveError> {
        if let Some(line) = self.chosen {
            let url = playlist::line_at(master, line)?;
            info!("Reusing variant at line {}", line);
            return Ok(Resolution::Active(url.to_string()));
        }

        for entry in playlist::variants(master) {
            let quality: Quality = match entry.label.parse() {
                Ok(quality) => quality,
                Err(_) => {
                    debug!("Skipping variant {:?}", entry.label);
                    continue;
                }
            };

            if quality <= *constraint {
                info!("Format found {}", entry.label);
                self.chosen = Some(entry.line_index);
                return Ok(Resolution::Active(entry.url));
            }
        }

        warn!("No variant within {}", constraint);
        Ok(Resolution::NoMatch)
    }
}
