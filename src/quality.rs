use std::{fmt, str::FromStr};

pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Upper bound on the variant quality to capture, written `720p60` or
/// `720p` (frame rate defaults to 30). `infp` accepts any resolution.
/// Qualities compare lexicographically: resolution first, then frame
/// rate.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quality {
    pub resolution: f64,
    pub frame_rate: f64,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParseQualityError {
    #[error("missing 'p' separator in quality string")]
    MissingSeparator,
    #[error("invalid resolution: {0:?}")]
    InvalidResolution(String),
    #[error("invalid frame rate: {0:?}")]
    InvalidFrameRate(String),
}

impl FromStr for Quality {
    type Err = ParseQualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resolution, frame_rate) = s
            .split_once('p')
            .ok_or(ParseQualityError::MissingSeparator)?;

        let resolution = resolution
            .parse()
            .map_err(|_| ParseQualityError::InvalidResolution(resolution.to_string()))?;
        let frame_rate = if frame_rate.is_empty() {
            DEFAULT_FRAME_RATE
        } else {
            frame_rate
                .parse()
                .map_err(|_| ParseQualityError::InvalidFrameRate(frame_rate.to_string()))?
        };

        Ok(Quality {
            resolution,
            frame_rate,
        })
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p{}", self.resolution, self.frame_rate)
    }
}
