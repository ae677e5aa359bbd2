use std::fmt;

use crate::util;

#[derive(Debug, Default)]
pub struct CaptureStatistics {
    pub segments_written: u64,
    pub bytes_written: u64,
}

impl CaptureStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, payload_len: usize) {
        self.segments_written += 1;
        self.bytes_written += payload_len as u64;
    }
}

impl fmt::Display for CaptureStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "captured {} segments ({})",
            self.segments_written,
            util::format_bytes(self.bytes_written)
        )
    }
}
