use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::Command as Process;

use eyre::Result;
use log::{debug, error, info};

use youtube_tools::ai::{self, ChatSession};
use youtube_tools::config::{self, Config};
use youtube_tools::download::{self, Extractor, Quality};
use youtube_tools::innertube;
use youtube_tools::output::{self, OutputFormat, Report};
use youtube_tools::resolver;
use youtube_tools::transcript;

mod cli;

use cli::{Cli, Command};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("youtube-tools.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("youtube-tools")
        .join("logs")
}

fn tool_version(name: &str) -> Option<String> {
    Process::new(name)
        .arg("--version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| {
            String::from_utf8_lossy(&o.stdout)
                .trim()
                .lines()
                .next()
                .unwrap_or("")
                .to_string()
        })
}

fn build_after_help() -> String {
    let tool_lines = Extractor::ALL
        .iter()
        .map(|x| match tool_version(x.program()) {
            Some(v) => format!("  \x1b[32m✅\x1b[0m {:<11}{v}", x.program()),
            None => format!("  \x1b[31m❌\x1b[0m {:<11}(not found)", x.program()),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let key_lines = ["OPENAI_API_KEY", "ANTHROPIC_API_KEY"]
        .iter()
        .map(|k| {
            let state = if std::env::var_os(k).is_some() { "set" } else { "not set" };
            format!("  {k:<18} {state}")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let log_path = log_dir().join("youtube-tools.log");

    format!(
        "\nEXAMPLES:\n  \
         youtube-tools shorten \"https://www.youtube.com/watch?v=dQw4w9WgXcQ\"\n  \
         youtube-tools download \"https://youtu.be/dQw4w9WgXcQ\" --quality 720p\n  \
         youtube-tools transcript \"https://youtu.be/dQw4w9WgXcQ\" --json\n  \
         youtube-tools chat \"https://youtu.be/dQw4w9WgXcQ\" \"What is this video about?\"\n\
         \nDOWNLOAD TOOLS:\n{tool_lines}\n\nAPI KEYS:\n{key_lines}\n\nConfig is read from: {}\nLogs are written to: {}",
        config::config_path().display(),
        log_path.display()
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = match cmd.try_get_matches() {
        Ok(m) => m,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            e.print()?;
            std::process::exit(code);
        }
    };
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_else(|e| {
        if cli.verbose {
            eprintln!("Ignoring config file: {e}");
        }
        Config::default()
    });

    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Text };

    if let Err(err) = run(&cli, &config, format).await {
        error!("{err:#}");
        let rendered = output::error(&err, format);
        match format {
            OutputFormat::Json => println!("{rendered}"),
            OutputFormat::Text => eprintln!("{rendered}"),
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: &Cli, config: &Config, format: OutputFormat) -> Result<()> {
    if cli.verbose {
        let config_path = config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    let client = reqwest::Client::new();

    let report = match &cli.command {
        Command::Shorten { url } => {
            resolver::require_video_id(url)?;
            output::shortened(&resolver::shorten_youtube_url(url))
        }
        Command::Qualities { url } => output::qualities(&download::available_qualities(url)?),
        Command::Download {
            url,
            output_path,
            quality,
        } => {
            resolver::require_video_id(url)?;
            let quality: Quality = config.quality_or(quality.as_deref()).parse()?;
            let dir = output_path.clone().or_else(|| config.output_path.clone());
            if cli.verbose {
                let shown = dir.clone().unwrap_or_else(download::default_download_dir);
                eprintln!("Output path: {}\nQuality: {quality}", shown.display());
            }
            output::downloaded(&download::download_video(url, dir.as_deref(), quality)?)
        }
        Command::Transcript { url, list, captions } => {
            if *list {
                output::tracks(&transcript::list_tracks(&client, url).await?)
            } else {
                let t = transcript::fetch(&client, url, &captions.options(config)).await?;
                if cli.verbose {
                    eprintln!(
                        "Video: {} ({})\nLanguage: {}{}\nSegments: {}",
                        t.info.title,
                        t.info.video_id,
                        t.language,
                        if t.is_generated { " (auto-generated)" } else { "" },
                        t.segments.len(),
                    );
                }
                output::transcript(&t)
            }
        }
        Command::Info { url } => output::info(&innertube::video_info(&client, url).await?),
        Command::Summarize { url, captions, llm } => {
            let ai_config = llm.ai_config(config);
            debug!("Summarizing with model {}", ai_config.model);
            output::summary(&ai::summarize(&client, &ai_config, url, &captions.options(config)).await?)
        }
        Command::Chat {
            url,
            question,
            captions,
            llm,
        } => {
            let mut session = ChatSession::open(&client, llm.ai_config(config), url, &captions.options(config)).await?;
            if cli.verbose {
                eprintln!("Video: {} by {}", session.info().title, session.info().author);
            }
            match question {
                Some(q) => output::answer(&session.ask(q).await?),
                None => {
                    let interactive = io::stdin().is_terminal();
                    return chat_loop(
                        &mut session,
                        io::stdin().lock(),
                        &mut io::stdout(),
                        &mut io::stderr(),
                        format,
                        interactive,
                    )
                    .await;
                }
            }
        }
    };

    println!("{}", report.render(format));
    Ok(())
}

/// One line of chat input
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Skip,
    Quit,
    Clear,
    Summary,
    Question(&'a str),
}

fn parse_chat_line(line: &str) -> ChatInput<'_> {
    match line.trim() {
        "" => ChatInput::Skip,
        "/quit" | "/exit" => ChatInput::Quit,
        "/clear" => ChatInput::Clear,
        "/summary" => ChatInput::Summary,
        q => ChatInput::Question(q),
    }
}

/// Whatever answers questions in the chat loop
trait ChatBackend {
    async fn ask(&mut self, question: &str) -> Result<Report>;
    async fn summary(&mut self) -> Result<Report>;
    fn clear(&mut self);
    fn exchanges(&self) -> usize;
}

impl ChatBackend for ChatSession {
    async fn ask(&mut self, question: &str) -> Result<Report> {
        Ok(output::answer(&ChatSession::ask(self, question).await?))
    }

    async fn summary(&mut self) -> Result<Report> {
        Ok(output::summary(&self.summarize().await?))
    }

    fn clear(&mut self) {
        self.clear_history();
    }

    fn exchanges(&self) -> usize {
        self.history().len()
    }
}

/// Answer questions one per line within a single session.
///
/// `/clear` forgets the conversation so far, `/summary` summarizes the video,
/// `/quit` ends the session. A failed request is reported and the session goes on.
async fn chat_loop<B, R, O, E>(
    backend: &mut B,
    input: R,
    out: &mut O,
    err_out: &mut E,
    format: OutputFormat,
    interactive: bool,
) -> Result<()>
where
    B: ChatBackend,
    R: BufRead,
    O: Write,
    E: Write,
{
    let prompt = |err_out: &mut E| -> Result<()> {
        if interactive {
            write!(err_out, "> ")?;
            err_out.flush()?;
        }
        Ok(())
    };

    prompt(&mut *err_out)?;
    for line in input.lines() {
        let line = line?;

        let result = match parse_chat_line(&line) {
            ChatInput::Skip => None,
            ChatInput::Quit => break,
            ChatInput::Clear => {
                backend.clear();
                if interactive {
                    writeln!(err_out, "History cleared")?;
                }
                None
            }
            ChatInput::Summary => Some(backend.summary().await),
            ChatInput::Question(q) => Some(backend.ask(q).await),
        };

        match result {
            Some(Ok(report)) => writeln!(out, "{}", report.render(format))?,
            Some(Err(err)) => {
                error!("{err:#}");
                let rendered = output::error(&err, format);
                match format {
                    OutputFormat::Json => writeln!(out, "{rendered}")?,
                    OutputFormat::Text => writeln!(err_out, "{rendered}")?,
                }
            }
            None => {}
        }
        prompt(&mut *err_out)?;
    }

    info!("Chat ended after {} exchanges", backend.exchanges());
    Ok(())
}
