use thiserror::Error;

/// Failures a user needs to tell apart.
///
/// Everything else travels as a plain `eyre::Report`; these variants are
/// attached at the edge of each operation so the CLI can report an invalid
/// link differently from a video that could not be fetched.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid YouTube URL")]
    InvalidUrl(String),

    #[error("{0}")]
    Download(String),

    #[error("{0}")]
    Transcript(String),

    #[error("{0}")]
    Ai(String),

    #[error("{tool} not found. Install it with:\n  {hint}")]
    MissingTool { tool: &'static str, hint: &'static str },
}

impl Error {
    /// Stable machine-readable tag, used in JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidUrl(_) => "invalid_url",
            Error::Download(_) => "download",
            Error::Transcript(_) => "transcript",
            Error::Ai(_) => "ai",
            Error::MissingTool { .. } => "missing_tool",
        }
    }
}

/// Find the classified error anywhere in a report's chain.
pub fn classify(report: &eyre::Report) -> Option<&Error> {
    report.chain().find_map(|e| e.downcast_ref::<Error>())
}
