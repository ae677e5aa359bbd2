//! # ttv-rs
//!
//! This crate captures a live Twitch broadcast to disk as numbered
//! chunk files. It polls a channel until it goes live, acquires a
//! playback token, picks the first stream variant within a quality
//! bound and then tails that variant's segment list, appending every
//! new segment to a rolling output file (five segments per file).
//!
//! ## Usage
//!
//! ```no_run
//! use ttv_rs::{
//!     quality::Quality,
//!     supervisor::{self, ChannelTarget},
//!     twitch::TwitchApi,
//!     util::HttpClient,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     // HttpClient wraps reqwest with a middleware retrying transient
//!     // errors and carries the service Client-ID header.
//!     let client = HttpClient::new("my-client-id").unwrap();
//!     let api = TwitchApi::new(client);
//!
//!     let target = ChannelTarget {
//!         name: String::from("somechannel"),
//!         quality: "720p30".parse::<Quality>().unwrap(),
//!     };
//!
//!     // Runs until killed: captures every broadcast of the channel
//!     // into ./somechannel/0.ts, 1.ts, ...
//!     supervisor::run(&api, &target).await.unwrap();
//! }
//! ```

#[forbid(unsafe_code)]
#[macro_use]
extern crate log;

pub mod config;
pub mod playlist;
pub mod quality;
pub mod resolver;
pub mod stats;
pub mod supervisor;
pub mod tailer;
pub mod twitch;
pub mod util;
pub mod writer;
