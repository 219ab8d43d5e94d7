use eyre::{Result, WrapErr, bail};
use log::{debug, info};
use serde::Serialize;

use crate::error::{self, Error};
use crate::innertube::{self, CaptionTrack, USER_AGENT, VideoInfo};
use crate::resolver;

/// A single captioned segment
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Complete transcript for a video
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub info: VideoInfo,
    pub language: String,
    pub is_generated: bool,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Plain text, one segment per line, no timestamps
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Which caption track to pick
#[derive(Debug, Clone)]
pub struct TranscriptOptions {
    /// Language codes in priority order
    pub languages: Vec<String>,
    /// Try auto-generated captions before manual ones
    pub prefer_generated: bool,
}

impl Default for TranscriptOptions {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            prefer_generated: true,
        }
    }
}

/// Fetch the transcript of the video behind `url`
pub async fn fetch(client: &reqwest::Client, url: &str, opts: &TranscriptOptions) -> Result<Transcript> {
    let video_id = resolver::require_video_id(url)?;
    let transcript = fetch_by_id(client, &video_id, opts)
        .await
        .map_err(into_transcript_error)?;
    Ok(transcript)
}

/// Classify a fetch failure, leaving already classified errors untouched
fn into_transcript_error(err: eyre::Report) -> eyre::Report {
    if error::classify(&err).is_some() {
        return err;
    }
    Error::Transcript(format!("Failed to retrieve transcript: {err:#}")).into()
}

async fn fetch_by_id(client: &reqwest::Client, video_id: &str, opts: &TranscriptOptions) -> Result<Transcript> {
    let hl = opts.languages.first().map(String::as_str).unwrap_or("en");
    let player = innertube::fetch_player(client, video_id, hl).await?;

    if player.tracks.is_empty() {
        bail!("no captions available for video {video_id}");
    }

    let track = pick_track(&player.tracks, opts)?;
    info!(
        "Using caption track: lang={} generated={}",
        track.language_code, track.is_generated
    );

    let caption_xml = client
        .get(&track.base_url)
        .header("User-Agent", USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let segments = parse_caption_xml(&caption_xml).wrap_err("caption track was unreadable")?;
    debug!("Parsed {} caption segments", segments.len());

    Ok(Transcript {
        info: player.info,
        language: track.language_code.clone(),
        is_generated: track.is_generated,
        segments,
    })
}

/// List the caption tracks offered for the video behind `url`
pub async fn list_tracks(client: &reqwest::Client, url: &str) -> Result<Vec<CaptionTrack>> {
    let video_id = resolver::require_video_id(url)?;
    let player = innertube::fetch_player(client, &video_id, "en")
        .await
        .map_err(|e| Error::Transcript(format!("Failed to get transcript list: {e:#}")))?;
    Ok(player.tracks)
}

fn pick_track<'a>(tracks: &'a [CaptionTrack], opts: &TranscriptOptions) -> Result<&'a CaptionTrack, Error> {
    select_track(tracks, opts)
        .ok_or_else(|| Error::Transcript("No transcript available in the requested languages".to_string()))
}

/// Pick a track: generated (when preferred), then manual, then anything, in language order
fn select_track<'a>(tracks: &'a [CaptionTrack], opts: &TranscriptOptions) -> Option<&'a CaptionTrack> {
    let find = |generated: Option<bool>| {
        opts.languages.iter().find_map(|lang| {
            tracks
                .iter()
                .find(|t| &t.language_code == lang && generated.is_none_or(|g| t.is_generated == g))
        })
    };

    let preferred = if opts.prefer_generated { find(Some(true)) } else { None };
    preferred.or_else(|| find(Some(false))).or_else(|| find(None))
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_dur: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        _ => {}
                    }
                }
                current_start = start;
                // Some tracks omit dur on the final cue
                current_dur = dur.or(Some(0.0));
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(start), Some(dur)) = (current_start.take(), current_dur.take()) {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).trim().to_string();
                    if !text.is_empty() {
                        segments.push(Segment {
                            text,
                            start,
                            duration: dur,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(segments)
}
