pub mod ai;
pub mod config;
pub mod download;
pub mod error;
pub mod innertube;
pub mod output;
pub mod resolver;
pub mod transcript;

pub use error::Error;
pub use resolver::{VideoRef, get_video_id, is_youtube_url, shorten_youtube_url};
