use std::path::Path;

use serde_json::json;

use crate::ai::Summary;
use crate::download::QualityOption;
use crate::error;
use crate::innertube::{CaptionTrack, VideoInfo};
use crate::transcript::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// The outcome of one command in both of its printable shapes
#[derive(Debug, Clone)]
pub struct Report {
    pub text: String,
    pub json: serde_json::Value,
}

impl Report {
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => self.text.clone(),
            OutputFormat::Json => pretty(&self.json),
        }
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn shortened(url: &str) -> Report {
    Report {
        text: url.to_string(),
        json: json!({ "shortened_url": url }),
    }
}

pub fn downloaded(path: &Path) -> Report {
    let filename = path.display().to_string();
    Report {
        text: format!("Download completed!\nSaved to: {filename}"),
        json: json!({
            "status": "success",
            "message": "Download completed",
            "filename": filename,
        }),
    }
}

pub fn qualities(qualities: &[QualityOption]) -> Report {
    let mut lines = vec!["Available qualities:".to_string()];
    lines.extend(qualities.iter().map(|q| format!("  {}: {}", q.quality, q.description)));
    Report {
        text: lines.join("\n"),
        json: json!({ "qualities": qualities }),
    }
}

pub fn transcript(transcript: &Transcript) -> Report {
    let text = transcript.text();
    Report {
        json: json!({
            "transcript": text,
            "video_id": transcript.info.video_id,
            "title": transcript.info.title,
            "language": transcript.language,
            "is_generated": transcript.is_generated,
        }),
        text,
    }
}

pub fn tracks(tracks: &[CaptionTrack]) -> Report {
    let text = if tracks.is_empty() {
        "No transcripts available".to_string()
    } else {
        tracks
            .iter()
            .map(|t| {
                let kind = if t.is_generated { "generated" } else { "manual" };
                format!("{:<8} {} ({kind})", t.language_code, t.language)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    Report {
        text,
        json: json!({ "transcripts": tracks }),
    }
}

fn format_length(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

pub fn info(info: &VideoInfo) -> Report {
    let mut lines = vec![
        format!("Title: {}", info.title),
        format!("Author: {}", info.author),
        format!("Length: {}", format_length(info.length_seconds)),
        format!("Views: {}", info.views),
    ];
    if let Some(date) = &info.publish_date {
        lines.push(format!("Published: {date}"));
    }
    if !info.description.is_empty() {
        lines.push(String::new());
        lines.push(info.description.clone());
    }
    Report {
        text: lines.join("\n"),
        json: json!(info),
    }
}

pub fn summary(summary: &Summary) -> Report {
    Report {
        text: summary.summary.clone(),
        json: json!(summary),
    }
}

pub fn answer(answer: &str) -> Report {
    Report {
        text: answer.to_string(),
        json: json!({ "answer": answer }),
    }
}

/// Render a failure; JSON goes to stdout like any other result, text goes to stderr
pub fn error(err: &eyre::Report, format: OutputFormat) -> String {
    let classified = error::classify(err);
    let message = match classified {
        Some(e) => e.to_string(),
        None => format!("{err:#}"),
    };
    match format {
        OutputFormat::Text => format!("Error: {message}"),
        OutputFormat::Json => pretty(&json!({
            "error": message,
            "kind": classified.map(|e| e.kind()).unwrap_or("internal"),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transcript::Segment;

    fn sample_transcript() -> Transcript {
        Transcript {
            info: VideoInfo {
                video_id: "test123".to_string(),
                title: "Test Video".to_string(),
                ..Default::default()
            },
            language: "en".to_string(),
            is_generated: true,
            segments: vec![
                Segment {
                    text: "Hello world".to_string(),
                    start: 0.0,
                    duration: 1.5,
                },
                Segment {
                    text: "This is a test".to_string(),
                    start: 1.5,
                    duration: 2.0,
                },
            ],
        }
    }

    #[test]
    fn test_shortened() {
        let r = shortened("https://youtu.be/abc");
        assert_eq!(r.render(OutputFormat::Text), "https://youtu.be/abc");
        let parsed: serde_json::Value = serde_json::from_str(&r.render(OutputFormat::Json)).unwrap();
        assert_eq!(parsed, json!({"shortened_url": "https://youtu.be/abc"}));
    }

    #[test]
    fn test_downloaded() {
        let r = downloaded(Path::new("/tmp/video.mp4"));
        assert_eq!(r.text, "Download completed!\nSaved to: /tmp/video.mp4");
        assert_eq!(r.json["status"], "success");
        assert_eq!(r.json["filename"], "/tmp/video.mp4");
    }

    #[test]
    fn test_transcript_text_and_json() {
        let r = transcript(&sample_transcript());
        assert_eq!(r.render(OutputFormat::Text), "Hello world\nThis is a test");
        assert_eq!(r.json["transcript"], "Hello world\nThis is a test");
        assert_eq!(r.json["video_id"], "test123");
        assert_eq!(r.json["is_generated"], true);
    }

    #[test]
    fn test_qualities_text() {
        let q = vec![
            QualityOption {
                quality: "best".to_string(),
                description: "Best available quality".to_string(),
                format_id: None,
                ext: None,
                filesize: None,
            },
            QualityOption {
                quality: "720p".to_string(),
                description: "720p - mp4".to_string(),
                format_id: Some("22".to_string()),
                ext: Some("mp4".to_string()),
                filesize: None,
            },
        ];
        let r = qualities(&q);
        assert_eq!(
            r.text,
            "Available qualities:\n  best: Best available quality\n  720p: 720p - mp4"
        );
        assert_eq!(r.json["qualities"][1]["format_id"], "22");
    }

    #[test]
    fn test_tracks() {
        let t = vec![CaptionTrack {
            base_url: "https://example.test/secret".to_string(),
            language: "English".to_string(),
            language_code: "en".to_string(),
            is_generated: true,
            is_translatable: true,
        }];
        let r = tracks(&t);
        assert_eq!(r.text, "en       English (generated)");
        assert!(r.json["transcripts"][0].get("base_url").is_none());
        assert_eq!(tracks(&[]).text, "No transcripts available");
    }

    #[test]
    fn test_format_length() {
        assert_eq!(format_length(0), "0:00");
        assert_eq!(format_length(213), "3:33");
        assert_eq!(format_length(3725), "1:02:05");
    }

    #[test]
    fn test_info_text() {
        let r = info(&VideoInfo {
            video_id: "x".to_string(),
            title: "T".to_string(),
            author: "A".to_string(),
            description: "D".to_string(),
            length_seconds: 61,
            views: 5,
            publish_date: Some("2020-01-01".to_string()),
        });
        assert_eq!(r.text, "Title: T\nAuthor: A\nLength: 1:01\nViews: 5\nPublished: 2020-01-01\n\nD");
        assert_eq!(r.json["length_seconds"], 61);
    }

    #[test]
    fn test_summary_text_is_summary_only() {
        let r = summary(&Summary {
            summary: "Short.".to_string(),
            title: "T".to_string(),
            author: "A".to_string(),
            description: String::new(),
        });
        assert_eq!(r.text, "Short.");
        assert_eq!(r.json["title"], "T");
    }

    #[test]
    fn test_answer() {
        let r = answer("42");
        assert_eq!(r.json, json!({"answer": "42"}));
    }

    #[test]
    fn test_error_invalid_url() {
        let err: eyre::Report = Error::InvalidUrl("nope".to_string()).into();
        assert_eq!(error(&err, OutputFormat::Text), "Error: Invalid YouTube URL");
        let parsed: serde_json::Value = serde_json::from_str(&error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(parsed, json!({"error": "Invalid YouTube URL", "kind": "invalid_url"}));
    }

    #[test]
    fn test_error_distinguishes_operational_failures() {
        let err: eyre::Report = Error::Download("Video is unavailable".to_string()).into();
        let parsed: serde_json::Value = serde_json::from_str(&error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(parsed["kind"], "download");
        assert_eq!(parsed["error"], "Video is unavailable");
    }

    #[test]
    fn test_error_unclassified() {
        let err = eyre::eyre!("connection reset");
        let parsed: serde_json::Value = serde_json::from_str(&error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(parsed["kind"], "internal");
        assert_eq!(parsed["error"], "connection reset");
    }
}
