use std::time::Duration;

use reqwest::StatusCode;

use crate::{
    playlist::{self, PlaylistError},
    stats::CaptureStatistics,
    util::{DownloadError, HttpClient},
    writer::ChunkWriter,
};

pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Why a tail loop stopped without failing.
#[derive(Debug, PartialEq, Eq)]
pub enum TailEnd {
    /// The segment list started rejecting the playback token.
    TokenExpired,
    /// The segment list is gone; the broadcast ended.
    Ended,
}

#[derive(thiserror::Error, Debug)]
pub enum TailError {
    #[error("download error: {0}")]
    Download(#[from] DownloadError),
    #[error("playlist error: {0}")]
    Playlist(#[from] PlaylistError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TailError {
    pub fn is_transient(&self) -> bool {
        match self {
            TailError::Download(e) => e.is_transient(),
            TailError::Playlist(_) => false,
            TailError::Io(_) => false,
        }
    }
}

/// Follows one variant's segment list, delivering every segment past
/// the cursor to the writer in sequence order, at most once each.
pub struct Tailer {
    last_downloaded: i64,
    stats: CaptureStatistics,
}

impl Tailer {
    pub fn new() -> Tailer {
        Tailer {
            last_downloaded: -1,
            stats: CaptureStatistics::new(),
        }
    }

    /// Highest sequence number handed to the writer so far.
    pub fn cursor(&self) -> i64 {
        self.last_downloaded
    }

    /// Poll the segment list until the token expires, the broadcast
    /// ends or a download fails.
    pub async fn tail(
        &mut self,
        client: &HttpClient,
        tail_url: &str,
        writer: &mut ChunkWriter,
    ) -> Result<TailEnd, TailError> {
        loop {
            if let Some(end) = self.poll_once(client, tail_url, writer).await? {
                return Ok(end);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// One poll cycle: fetch the current segment-list window and
    /// forward every segment past the cursor.
    pub async fn poll_once(
        &mut self,
        client: &HttpClient,
        tail_url: &str,
        writer: &mut ChunkWriter,
    ) -> Result<Option<TailEnd>, TailError> {
        let (status, body) = client.get_text(tail_url, &[]).await?;
        debug!("Segment list {}", status);

        match status {
            StatusCode::FORBIDDEN => return Ok(Some(TailEnd::TokenExpired)),
            StatusCode::NOT_FOUND => return Ok(Some(TailEnd::Ended)),
            s if !s.is_success() => return Err(DownloadError::UnexpectedStatus(s).into()),
            _ => (),
        }

        let snapshot = playlist::segment_list(&body)?;
        let mut new_segments = 0;

        for segment in snapshot.segments {
            if segment.sequence <= self.last_downloaded {
                continue;
            }

            info!("Segment {}", segment.sequence);
            let payload = client.fetch_bytes(&segment.url).await?;
            writer.write(segment.sequence, &payload).await?;
            self.last_downloaded = segment.sequence;
            self.stats.record(payload.len());
            new_segments += 1;
        }

        if new_segments > 0 {
            info!("{}", self.stats);
        }

        Ok(None)
    }
}
