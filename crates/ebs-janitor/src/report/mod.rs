//! Run reports
//!
//! Each run renders one plain-text block ([`format`]) and hands it to a
//! [`ReportSink`]. A sink failure is logged and never changes the outcome of
//! the run.

pub mod format;

pub use format::{
    DeletionReport, GroupOutcome, GroupResult, SecurityGroupReport, SnapshotEntry, StageReport,
    StateChanges, VolumeEntry, fetch_failure_report, format_time, persist_failure_note,
};

use crate::config::SlackConfig;
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Destination for a rendered report
#[allow(async_fn_in_trait)] // Internal use only
pub trait ReportSink {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Print the report on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    async fn send(&self, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a str>,
    text: &'a str,
}

/// Post the report to a Slack incoming webhook
#[derive(Debug, Clone)]
pub struct SlackWebhookSink {
    client: reqwest::Client,
    config: SlackConfig,
}

impl SlackWebhookSink {
    pub fn new(config: SlackConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    fn message<'a>(&'a self, text: &'a str) -> SlackMessage<'a> {
        SlackMessage {
            channel: self.config.channel.as_deref(),
            username: self.config.username.as_deref(),
            icon_emoji: self.config.icon_emoji.as_deref(),
            text,
        }
    }
}

impl ReportSink for SlackWebhookSink {
    async fn send(&self, text: &str) -> Result<()> {
        self.client
            .post(&self.config.webhook_url)
            .json(&self.message(text))
            .send()
            .await
            .context("Failed to post report to Slack")?
            .error_for_status()
            .context("Slack webhook rejected the report")?;
        debug!(bytes = text.len(), "Report posted to Slack");
        Ok(())
    }
}

/// Sink chosen from configuration
#[derive(Debug, Clone)]
pub enum Sink {
    Stdout(StdoutSink),
    Slack(SlackWebhookSink),
}

impl Sink {
    /// Slack when configured, stdout otherwise
    pub fn from_config(slack: Option<&SlackConfig>) -> Result<Self> {
        match slack {
            Some(slack) => Ok(Sink::Slack(SlackWebhookSink::new(slack.clone())?)),
            None => Ok(Sink::Stdout(StdoutSink)),
        }
    }
}

impl ReportSink for Sink {
    async fn send(&self, text: &str) -> Result<()> {
        match self {
            Sink::Stdout(sink) => sink.send(text).await,
            Sink::Slack(sink) => sink.send(text).await,
        }
    }
}

/// Send a report, logging instead of propagating failures
pub async fn emit<S: ReportSink>(sink: &S, text: &str) {
    if let Err(e) = sink.send(text).await {
        warn!(error = %format!("{e:#}"), "Failed to deliver report");
    }
}

/// Send a report for a run that has already mutated resources, then pass on
/// the result of persisting its state
///
/// The report goes out either way; a failed write is noted in it.
pub async fn emit_after_persist<S: ReportSink>(
    sink: &S,
    mut text: String,
    persisted: Result<()>,
) -> Result<()> {
    if let Err(e) = &persisted {
        text.push_str(&persist_failure_note(e));
    }
    emit(sink, &text).await;
    persisted.context("Failed to write pending-delete state")
}

/// Sink that keeps every report in memory
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    sent: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingSink {
    pub(crate) fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ReportSink for RecordingSink {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
