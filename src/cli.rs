use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use youtube_tools::ai::AiConfig;
use youtube_tools::config::{Config, DEFAULT_TEMPERATURE};
use youtube_tools::transcript::TranscriptOptions;

#[derive(Parser)]
#[command(
    name = "youtube-tools",
    about = "YouTube Tools - CLI for YouTube video processing",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show progress and metadata on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a long YouTube URL to its short youtu.be equivalent
    Shorten {
        /// YouTube URL to shorten
        url: String,
    },

    /// List available video qualities
    Qualities {
        /// YouTube URL
        url: String,
    },

    /// Download a YouTube video
    Download {
        /// YouTube URL to download
        url: String,

        /// Output directory (default: Downloads folder)
        #[arg(long)]
        output_path: Option<PathBuf>,

        /// Video quality: best, worst, or a height like 720p (default: best)
        #[arg(long)]
        quality: Option<String>,
    },

    /// Get video transcript
    Transcript {
        /// YouTube URL
        url: String,

        /// List available transcript tracks instead of fetching one
        #[arg(long)]
        list: bool,

        #[command(flatten)]
        captions: CaptionArgs,
    },

    /// Show video metadata
    Info {
        /// YouTube URL
        url: String,
    },

    /// Generate an AI summary of a video
    Summarize {
        /// YouTube URL
        url: String,

        #[command(flatten)]
        captions: CaptionArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },

    /// Ask an LLM about a video (reads questions from stdin if none is given)
    Chat {
        /// YouTube URL
        url: String,

        /// Question to ask about the video
        question: Option<String>,

        #[command(flatten)]
        captions: CaptionArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },
}

#[derive(Args)]
pub struct CaptionArgs {
    /// Preferred caption language, repeat for fallbacks (default: en)
    #[arg(short, long = "lang")]
    pub langs: Vec<String>,

    /// Prefer manually created captions over auto-generated ones
    #[arg(long)]
    pub manual_first: bool,
}

impl CaptionArgs {
    pub fn options(&self, config: &Config) -> TranscriptOptions {
        TranscriptOptions {
            languages: config.languages_or(&self.langs),
            prefer_generated: !self.manual_first && config.prefer_generated.unwrap_or(true),
        }
    }
}

#[derive(Args)]
pub struct LlmArgs {
    /// LLM model (claude-* uses Anthropic, anything else OpenAI)
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum tokens in the response
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl LlmArgs {
    pub fn ai_config(&self, config: &Config) -> AiConfig {
        AiConfig {
            model: config.model_or(self.model.as_deref()),
            max_tokens: self.max_tokens.or(config.max_tokens),
            temperature: config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}
