use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::{fs::File, io::AsyncWriteExt};

/// Number of consecutive segments aggregated into one output file.
pub const SEGMENTS_PER_CHUNK: i64 = 5;

pub struct ChunkWriter {
    dir: PathBuf,
    current: Option<OpenChunk>,
}

struct OpenChunk {
    index: i64,
    file: File,
}

impl ChunkWriter {
    pub fn new(dir: impl AsRef<Path>) -> ChunkWriter {
        ChunkWriter {
            dir: dir.as_ref().to_path_buf(),
            current: None,
        }
    }

    pub fn current_chunk(&self) -> Option<i64> {
        self.current.as_ref().map(|open| open.index)
    }

    /// Append one segment payload to the chunk owning its sequence
    /// number, rotating to a new file on a chunk change. A payload
    /// pointing behind the open chunk is dropped; a chunk is never
    /// reopened once superseded.
    pub async fn write(&mut self, sequence: i64, payload: &[u8]) -> io::Result<()> {
        let index = sequence / SEGMENTS_PER_CHUNK;

        if let Some(open) = &self.current {
            if index < open.index {
                warn!("Dropping segment {} behind chunk {}", sequence, open.index);
                return Ok(());
            }
        }
        if self.current_chunk() != Some(index) {
            self.rotate(index).await?;
        }
        if let Some(open) = self.current.as_mut() {
            open.file.write_all(payload).await?;
        }

        Ok(())
    }

    async fn rotate(&mut self, index: i64) -> io::Result<()> {
        if let Some(mut open) = self.current.take() {
            open.file.flush().await?;
            debug!("Closed chunk {}", open.index);
        }

        let path = self.dir.join(format!("{}.ts", index));
        info!("New chunk {}", path.display());
        let file = File::create(&path).await?;
        self.current = Some(OpenChunk { index, file });

        Ok(())
    }

    /// Flush and close the open chunk, ending the writer's session.
    pub async fn finish(&mut self) -> io::Result<()> {
        if let Some(mut open) = self.current.take() {
            open.file.flush().await?;
        }

        Ok(())
    }
}
