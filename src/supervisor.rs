use std::time::Duration;

use crate::{
    quality::Quality,
    resolver::{Resolution, ResolveError, Resolver},
    tailer::{TailEnd, TailError, Tailer},
    twitch::TwitchApi,
    util::DownloadError,
    writer::ChunkWriter,
};

pub const PROBE_INTERVAL: Duration = Duration::from_secs(5);
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// One channel to capture, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct ChannelTarget {
    pub name: String,
    pub quality: Quality,
}

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("download error: {0}")]
    Download(#[from] DownloadError),
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("tail error: {0}")]
    Tail(#[from] TailError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Connection-class failures restart the session; anything else is
    /// a structural fault and stops the process.
    pub fn is_transient(&self) -> bool {
        match self {
            CaptureError::Download(e) => e.is_transient(),
            CaptureError::Resolve(e) => e.is_transient(),
            CaptureError::Tail(e) => e.is_transient(),
            CaptureError::Io(_) => false,
        }
    }
}

enum SessionEnd {
    Offline,
    NoMatch,
}

/// Capture `target` forever: probe until it goes live, resolve a
/// variant, tail it into chunk files, and start over whenever the
/// broadcast stops or the connection drops.
pub async fn run(api: &TwitchApi, target: &ChannelTarget) -> Result<(), CaptureError> {
    tokio::fs::create_dir_all(&target.name).await?;
    info!("Start {}", target.name);

    loop {
        match api.is_live(&target.name).await {
            Ok(false) => {
                tokio::time::sleep(PROBE_INTERVAL).await;
                continue;
            }
            Ok(true) => (),
            Err(e) if e.is_transient() => {
                error!("Connection error: {}", e);
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        info!("Live {}", target.name);
        match capture_session(api, target).await {
            Ok(SessionEnd::Offline) => info!("{} went offline", target.name),
            Ok(SessionEnd::NoMatch) => tokio::time::sleep(PROBE_INTERVAL).await,
            Err(e) if e.is_transient() => {
                error!("Connection error: {}", e);
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// One session: from a live probe until the broadcast ends or a
/// connection failure throws us back to probing. Token expiry stays
/// inside the session and re-resolves the pinned variant with the
/// cursor intact.
async fn capture_session(
    api: &TwitchApi,
    target: &ChannelTarget,
) -> Result<SessionEnd, CaptureError> {
    let mut writer = ChunkWriter::new(&target.name);
    let outcome = session_loop(api, target, &mut writer).await;
    writer.finish().await?;

    outcome
}

async fn session_loop(
    api: &TwitchApi,
    target: &ChannelTarget,
    writer: &mut ChunkWriter,
) -> Result<SessionEnd, CaptureError> {
    let mut resolver = Resolver::new();
    let mut tailer = Tailer::new();

    loop {
        let tail_url = match resolver
            .resolve(api, &target.name, &target.quality)
            .await?
        {
            Resolution::Active(url) => url,
            Resolution::Offline => return Ok(SessionEnd::Offline),
            Resolution::NoMatch => return Ok(SessionEnd::NoMatch),
        };

        match tailer.tail(api.client(), &tail_url, writer).await? {
            TailEnd::TokenExpired => info!("Playback token expired"),
            TailEnd::Ended => return Ok(SessionEnd::Offline),
        }
    }
}
