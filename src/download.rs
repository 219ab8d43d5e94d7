use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::str::FromStr;

use eyre::{Result, bail};
use log::{debug, info, warn};
use serde::Serialize;

use crate::error::Error;
use crate::resolver;

/// Folder names tried under $HOME when no download dir is configured
const DOWNLOAD_DIR_NAMES: &[&str] = &["Downloads", "downloads", "Descargas", "Téléchargements", "Download"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm"];

/// Requested video quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    #[default]
    Best,
    Worst,
    /// Maximum frame height, e.g. 720 for "720p"
    Height(u32),
}

impl Quality {
    /// Format selector understood by both extractors
    pub fn format_selector(&self) -> String {
        match self {
            Quality::Best => "best".to_string(),
            Quality::Worst => "worst".to_string(),
            Quality::Height(h) => format!("best[height<={h}]/best"),
        }
    }
}

impl FromStr for Quality {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best" | "highest" => Ok(Quality::Best),
            "worst" | "lowest" => Ok(Quality::Worst),
            other => match other.strip_suffix('p').and_then(|h| h.parse::<u32>().ok()) {
                Some(h) if h > 0 => Ok(Quality::Height(h)),
                _ => bail!("unknown quality '{s}' (expected best, worst, or a height like 720p)"),
            },
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Best => write!(f, "best"),
            Quality::Worst => write!(f, "worst"),
            Quality::Height(h) => write!(f, "{h}p"),
        }
    }
}

/// External program that does the actual extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    YtDlp,
    YoutubeDl,
}

impl Extractor {
    /// Tried in this order
    pub const ALL: [Extractor; 2] = [Extractor::YtDlp, Extractor::YoutubeDl];

    pub fn program(&self) -> &'static str {
        match self {
            Extractor::YtDlp => "yt-dlp",
            Extractor::YoutubeDl => "youtube-dl",
        }
    }

    fn install_hint(&self) -> &'static str {
        match self {
            Extractor::YtDlp => "pip install yt-dlp\n  or: brew install yt-dlp",
            Extractor::YoutubeDl => "pip install youtube-dl",
        }
    }

    fn missing(&self) -> Error {
        Error::MissingTool {
            tool: self.program(),
            hint: self.install_hint(),
        }
    }

    fn run(&self, args: &[&str]) -> std::result::Result<Output, Error> {
        debug!("Running {} {}", self.program(), args.join(" "));
        Command::new(self.program())
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => self.missing(),
                _ => Error::Download(format!("failed to run {}: {e}", self.program())),
            })
    }
}

/// One entry of the quality listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityOption {
    pub quality: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
}

/// Where videos go when no output path is given
pub fn default_download_dir() -> PathBuf {
    let xdg = std::env::var_os("XDG_DOWNLOAD_DIR").map(PathBuf::from);
    pick_download_dir(xdg, dirs::download_dir(), dirs::home_dir())
}

fn pick_download_dir(xdg: Option<PathBuf>, platform: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = xdg.filter(|d| d.is_dir()) {
        return dir;
    }
    if let Some(dir) = platform.filter(|d| d.is_dir()) {
        return dir;
    }
    let Some(home) = home else {
        return PathBuf::from(".");
    };
    DOWNLOAD_DIR_NAMES
        .iter()
        .map(|name| home.join(name))
        .find(|d| d.is_dir())
        .unwrap_or(home)
}

/// Download the video behind `url`, returning the path of the saved file.
///
/// yt-dlp is tried first and youtube-dl second; the first success wins.
pub fn download_video(url: &str, output_path: Option<&Path>, quality: Quality) -> Result<PathBuf> {
    let url = resolver::watch_url(&resolver::require_video_id(url)?);

    let dir = output_path.map(Path::to_path_buf).unwrap_or_else(default_download_dir);
    std::fs::create_dir_all(&dir)?;
    info!("Downloading {url} to {} (quality {quality})", dir.display());

    let mut failures = Vec::new();
    for extractor in Extractor::ALL {
        info!("Attempting download with {}", extractor.program());
        match download_with(extractor, &url, &dir, quality) {
            Ok(path) => {
                info!("Saved to {}", path.display());
                return Ok(path);
            }
            Err(e) => {
                warn!("{} failed: {e}", extractor.program());
                failures.push((extractor, e));
            }
        }
    }

    if failures.iter().all(|(_, e)| matches!(e, Error::MissingTool { .. })) {
        return Err(Extractor::YtDlp.missing().into());
    }

    let summary = failures
        .iter()
        .map(|(x, e)| match e {
            Error::MissingTool { .. } => format!("{}: not installed", x.program()),
            other => format!("{}: {other}", x.program()),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::Download(format!("Download failed with both methods ({summary})")).into())
}

fn download_with(
    extractor: Extractor,
    url: &str,
    dir: &Path,
    quality: Quality,
) -> std::result::Result<PathBuf, Error> {
    let template = dir.join("%(title)s.%(ext)s");
    let template = template.to_string_lossy();
    let selector = quality.format_selector();
    let base = ["--no-playlist", "--no-warnings", "-f", selector.as_str(), "-o", &*template];

    match extractor {
        Extractor::YtDlp => {
            let mut args = base.to_vec();
            args.extend(["--no-simulate", "--print", "after_move:filepath", url]);
            let output = check(extractor, extractor.run(&args)?)?;
            last_line(&output.stdout)
                .map(PathBuf::from)
                .filter(|p| p.exists())
                .ok_or_else(|| Error::Download("Downloaded file not found".to_string()))
        }
        Extractor::YoutubeDl => {
            let mut probe = base.to_vec();
            probe.extend(["--get-filename", url]);
            let expected = probed_filename(extractor, extractor.run(&probe)?)?;

            let mut args = base.to_vec();
            args.push(url);
            check(extractor, extractor.run(&args)?)?;

            locate_output(dir, &expected).ok_or_else(|| Error::Download("Downloaded file not found".to_string()))
        }
    }
}

/// Filename reported by a `--get-filename` run; a failed run stops the download
fn probed_filename(extractor: Extractor, output: Output) -> std::result::Result<PathBuf, Error> {
    let output = check(extractor, output)?;
    last_line(&output.stdout)
        .map(PathBuf::from)
        .ok_or_else(|| Error::Download(format!("{} did not report a filename", extractor.program())))
}

fn check(extractor: Extractor, output: Output) -> std::result::Result<Output, Error> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!("{} stderr: {stderr}", extractor.program());
    Err(Error::Download(classify_failure(&stderr)))
}

fn last_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Find the saved file, allowing for the extractor having changed the extension
fn locate_output(dir: &Path, expected: &Path) -> Option<PathBuf> {
    if expected.exists() {
        return Some(expected.to_path_buf());
    }
    let stem = expected.file_stem()?.to_string_lossy().to_string();
    std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .find(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            let ext_ok = p
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| VIDEO_EXTENSIONS.contains(&e));
            ext_ok && name.contains(&stem)
        })
}

/// Turn extractor stderr into a message a user can act on
fn classify_failure(stderr: &str) -> String {
    let lower = stderr.to_lowercase();
    if stderr.contains("Private video") {
        "Video is private".to_string()
    } else if stderr.contains("Video unavailable") {
        "Video is unavailable".to_string()
    } else if lower.contains("confirm your age") {
        "Video is age-restricted".to_string()
    } else if lower.contains("http error 403") || lower.contains("forbidden") {
        "Access denied - video may be private or region-locked".to_string()
    } else if lower.contains("http error 404") {
        "Video not found - it may have been deleted or the URL is incorrect".to_string()
    } else {
        stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| l.starts_with("ERROR:"))
            .or_else(|| stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()))
            .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
            .unwrap_or_else(|| "extractor exited with an error".to_string())
    }
}

/// List the qualities a video can be downloaded in, best first
pub fn available_qualities(url: &str) -> Result<Vec<QualityOption>> {
    let url = resolver::watch_url(&resolver::require_video_id(url)?);

    let output = Extractor::YtDlp.run(&["-J", "--no-playlist", "--no-warnings", url.as_str()])?;
    let output = check(Extractor::YtDlp, output)
        .map_err(|e| Error::Download(format!("Failed to get available qualities: {e}")))?;

    let info: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| Error::Download(format!("Failed to get available qualities: {e}")))?;
    Ok(qualities_from_info(&info))
}

fn qualities_from_info(info: &serde_json::Value) -> Vec<QualityOption> {
    let formats = info
        .get("formats")
        .and_then(|f| f.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut by_height: Vec<(u64, QualityOption)> = Vec::new();
    for fmt in formats {
        let has_video = fmt.get("vcodec").and_then(|v| v.as_str()) != Some("none");
        let has_audio = fmt.get("acodec").and_then(|v| v.as_str()) != Some("none");
        if !(has_video && has_audio) {
            continue;
        }
        let Some(height) = fmt.get("height").and_then(|h| h.as_u64()).filter(|h| *h > 0) else {
            continue;
        };
        if by_height.iter().any(|(h, _)| *h == height) {
            continue;
        }
        let ext = fmt.get("ext").and_then(|e| e.as_str()).unwrap_or("mp4").to_string();
        by_height.push((
            height,
            QualityOption {
                quality: format!("{height}p"),
                description: format!("{height}p - {ext}"),
                format_id: Some(
                    fmt.get("format_id")
                        .and_then(|f| f.as_str())
                        .unwrap_or_default()
                        .to_string(),
                ),
                ext: Some(ext),
                filesize: fmt.get("filesize").and_then(|s| s.as_u64()),
            },
        ));
    }
    by_height.sort_by(|a, b| b.0.cmp(&a.0));

    let special = |quality: &str, description: &str| QualityOption {
        quality: quality.to_string(),
        description: description.to_string(),
        format_id: None,
        ext: None,
        filesize: None,
    };

    let mut qualities = vec![special("best", "Best available quality")];
    qualities.extend(by_height.into_iter().map(|(_, q)| q));
    qualities.push(special("worst", "Lowest available quality"));
    qualities
}
