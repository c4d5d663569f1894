//! Append-only activity log for resolution runs.
//!
//! Every strategy attempt lands here with its outcome, so a run over a
//! few hundred lessons can be audited afterwards: which strategy found
//! each video, what got rejected and why, where isolation had to step in.

use crate::error::{ResolveError, Result};
use crate::types::LessonContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub lesson: Option<String>,
    pub event: String,
    pub details: Option<String>,
}

pub struct RunLogger {
    log_path: PathBuf,
}

impl RunLogger {
    pub fn new() -> Result<Self> {
        let user_dirs = directories::UserDirs::new()
            .ok_or_else(|| ResolveError::Other("could not determine home directory".into()))?;
        let home = user_dirs.home_dir();
        let unreel_dir = home.join(".unreel");
        fs::create_dir_all(&unreel_dir)?;

        Ok(Self {
            log_path: unreel_dir.join("activity.log"),
        })
    }

    /// Logger writing to an explicit path (tests, custom deployments).
    pub fn at(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    pub fn log(
        &self,
        level: LogLevel,
        lesson: Option<&str>,
        event: &str,
        details: Option<&str>,
    ) -> Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            lesson: lesson.map(|l| l.to_string()),
            event: event.to_string(),
            details: details.map(|d| d.to_string()),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        let level_str = match entry.level {
            LogLevel::Info => "🟢",
            LogLevel::Warn => "🟡",
            LogLevel::Error => "🔴",
        };

        let lesson_str = entry.lesson.as_deref().unwrap_or("*");
        let details_str = entry.details.as_deref().unwrap_or("");

        writeln!(
            file,
            "{} {} {} {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            level_str,
            entry.event,
            lesson_str,
            details_str
        )?;

        Ok(())
    }

    /// One strategy attempt against one lesson: `status` is
    /// accepted/rejected/none, `detail` carries the rejection reason.
    pub fn attempt(
        &self,
        strategy: &str,
        ctx: &LessonContext,
        url: Option<&str>,
        status: &str,
        detail: Option<&str>,
    ) -> Result<()> {
        let mut details = format!("strategy={strategy} status={status}");
        if let Some(url) = url {
            details.push_str(&format!(" url={url}"));
        }
        if let Some(detail) = detail {
            details.push_str(&format!(" reason={detail}"));
        }
        let level = match status {
            "rejected_data_quality" => LogLevel::Warn,
            _ => LogLevel::Info,
        };
        self.log(level, Some(&ctx.lesson_title), "attempt", Some(&details))
    }

    pub fn info(&self, lesson: Option<&str>, event: &str, details: Option<&str>) -> Result<()> {
        self.log(LogLevel::Info, lesson, event, details)
    }

    pub fn warn(&self, event: &str, lesson: Option<&str>, details: Option<&str>) -> Result<()> {
        self.log(LogLevel::Warn, lesson, event, details)
    }

    pub fn error(&self, lesson: Option<&str>, event: &str, details: Option<&str>) -> Result<()> {
        self.log(LogLevel::Error, lesson, event, details)
    }

    pub fn read_logs(
        &self,
        lesson_filter: Option<&str>,
        errors_only: bool,
    ) -> Result<Vec<String>> {
        if !self.log_path.exists() {
            return Ok(vec![]);
        }

        let file = std::fs::File::open(&self.log_path)?;
        let reader = BufReader::new(file);
        let mut matching_lines = Vec::new();

        for line in reader.lines() {
            let line = line?;

            if errors_only && !line.contains("🔴") {
                continue;
            }

            if let Some(lesson) = lesson_filter {
                if !line.contains(lesson) {
                    continue;
                }
            }

            matching_lines.push(line);
        }

        // Most recent entries first.
        matching_lines.reverse();
        Ok(matching_lines)
    }
}
