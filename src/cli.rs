use crate::log::RunLogger;
use crate::registry::RunRegistry;
use crate::resolver::Resolver;
use crate::session::webdriver::WebDriverSession;
use crate::session::BrowserSession;
use crate::types::{ApiResponse, LessonContext, Platform, ResolveConfig};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use thirtyfour::{DesiredCapabilities, WebDriver};

#[derive(Parser)]
#[command(name = "unreel", version, about = "Lesson video resolution (JSON only)")]
pub struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the video behind one lesson page
    Resolve(ResolveArgs),
    /// Read back the activity log
    Log(LogArgs),
}

#[derive(Args)]
struct ResolveArgs {
    /// The lesson page URL. The browser behind --webdriver must already be
    /// logged in; resolution starts from whatever state that session is in.
    url: String,

    /// Lesson title used in logs and duplicate reports (defaults to the
    /// last URL segment)
    #[arg(long)]
    title: Option<String>,

    /// Identifier tying this invocation to a wider scraping run
    #[arg(long, default_value = "cli")]
    session_id: String,

    /// WebDriver endpoint of the authenticated browser
    #[arg(long, default_value = "http://localhost:9515")]
    webdriver: String,

    /// Pre-seed the blacklist with known-bad videos, as platform:id
    /// (e.g. youtube:YTrIwmIdaJI). Repeatable.
    #[arg(long = "blacklist")]
    blacklist: Vec<String>,
}

#[derive(Args)]
struct LogArgs {
    /// Only lines mentioning this lesson
    #[arg(long)]
    lesson: Option<String>,
    /// Errors only
    #[arg(long)]
    errors: bool,
}

pub async fn run() {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Resolve(args) => finish(resolve_cmd(args).await),
        Command::Log(args) => finish(log_cmd(args)),
    }
}

async fn resolve_cmd(args: ResolveArgs) -> anyhow::Result<serde_json::Value> {
    let seeds = parse_blacklist(&args.blacklist)?;
    let title = args.title.clone().unwrap_or_else(|| {
        args.url
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or("lesson")
            .to_string()
    });
    let ctx = LessonContext::new(&args.url, &title, &args.session_id);

    let caps = DesiredCapabilities::chrome();
    let driver = WebDriver::new(&args.webdriver, caps)
        .await
        .with_context(|| format!("connecting to webdriver at {}", args.webdriver))?;

    let session = WebDriverSession::new(driver);
    let mut registry = RunRegistry::with_blacklisted(seeds);
    let resolver =
        Resolver::new(session, ResolveConfig::default()).with_logger(RunLogger::new()?);

    let outcome = async {
        resolver.session().navigate(&args.url).await?;
        resolver.resolve(&ctx, &mut registry).await
    }
    .await;

    let _ = resolver.into_session().into_inner().quit().await;
    let resolution = outcome?;

    Ok(serde_json::json!({
        "lesson": { "url": ctx.lesson_url, "title": ctx.lesson_title },
        "resolution": resolution,
        "reprocess": registry.take_reprocess(),
    }))
}

fn log_cmd(args: LogArgs) -> anyhow::Result<Vec<String>> {
    Ok(RunLogger::new()?.read_logs(args.lesson.as_deref(), args.errors)?)
}

fn parse_blacklist(entries: &[String]) -> anyhow::Result<Vec<(Platform, String)>> {
    entries
        .iter()
        .map(|entry| {
            let (platform, id) = entry
                .split_once(':')
                .with_context(|| format!("expected platform:id, got {entry:?}"))?;
            let platform = Platform::from_name(platform)
                .with_context(|| format!("unknown platform {platform:?}"))?;
            anyhow::ensure!(!id.is_empty(), "empty video id in {entry:?}");
            Ok((platform, id.to_string()))
        })
        .collect()
}

fn finish<T: serde::Serialize>(res: anyhow::Result<T>) {
    let out = match res {
        Ok(v) => serde_json::to_string_pretty(&ApiResponse::ok(v)),
        Err(e) => serde_json::to_string_pretty(&ApiResponse::<()>::err(format!("{e:#}"))),
    };
    match out {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize response: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_seeds_parse() {
        let seeds =
            parse_blacklist(&["youtube:YTrIwmIdaJI".to_string(), "wistia:abc123".to_string()])
                .unwrap();
        assert_eq!(seeds[0], (Platform::YouTube, "YTrIwmIdaJI".to_string()));
        assert_eq!(seeds[1], (Platform::Wistia, "abc123".to_string()));
    }

    #[test]
    fn bad_blacklist_seeds_are_refused() {
        assert!(parse_blacklist(&["noseparator".to_string()]).is_err());
        assert!(parse_blacklist(&["betamax:abc".to_string()]).is_err());
        assert!(parse_blacklist(&["youtube:".to_string()]).is_err());
    }
}
