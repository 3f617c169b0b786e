//! Checking subscription input before it is applied.
//!
//! Each line is classified; subscriptions are fetched and their links
//! counted, direct links are validated. Failures are collected per line so
//! one bad entry does not hide the rest.

use boxwiz_types::constants::MAX_PREVIEW_LINES;
use boxwiz_types::{bail, LinkClassifier, LinkKind, Result, SubscriptionFetcher, WizardError};
use std::time::Instant;
use tracing::{debug, info};

use crate::links::content_lines;
use crate::validate::{validate_response_size, validate_uri, validate_url};

/// Outcome of checking a block of input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Direct links found, counting those inside subscriptions
    pub valid: usize,
    /// The first few links, numbered
    pub preview: Vec<String>,
    /// One message per failing line
    pub errors: Vec<String>,
}

impl CheckReport {
    /// Whether at least one usable link was found.
    pub fn is_ok(&self) -> bool {
        self.valid > 0
    }

    /// One-line status.
    pub fn summary(&self) -> String {
        if self.valid == 0 {
            return "No valid proxy links found".to_string();
        }
        let mut summary = format!("Found {} valid proxy link(s)", self.valid);
        if !self.errors.is_empty() {
            summary.push_str(&format!(", {} error(s)", self.errors.len()));
        }
        summary
    }

    /// Preview lines plus a count of the ones left out.
    pub fn preview_text(&self) -> String {
        let mut text = self.preview.join("\n");
        if self.valid > self.preview.len() {
            text.push_str(&format!("\n... and {} more", self.valid - self.preview.len()));
        }
        text
    }

    fn record(&mut self, link: &str) {
        self.valid += 1;
        if self.preview.len() < MAX_PREVIEW_LINES {
            self.preview.push(format!("{}. {}", self.valid, link));
        }
    }
}

/// Check `input` line by line.
pub async fn check_input(
    input: &str,
    classifier: &dyn LinkClassifier,
    fetcher: &dyn SubscriptionFetcher,
) -> Result<CheckReport> {
    check_input_with_progress(input, classifier, fetcher, |_, _| {}).await
}

/// Like [`check_input`], calling `progress(done, total)` after each line.
pub async fn check_input_with_progress(
    input: &str,
    classifier: &dyn LinkClassifier,
    fetcher: &dyn SubscriptionFetcher,
    mut progress: impl FnMut(usize, usize),
) -> Result<CheckReport> {
    let input = input.trim();
    if input.is_empty() {
        bail!(Validation, "empty input");
    }

    let start = Instant::now();
    let lines: Vec<&str> = input.lines().collect();
    let mut report = CheckReport::default();

    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match classifier.classify(line) {
            LinkKind::Subscription => check_subscription(line, classifier, fetcher, &mut report).await,
            LinkKind::Direct => match validate_uri(line) {
                Ok(()) => report.record(line),
                Err(e) => report.errors.push(format!("Invalid URI format: {}", reason(e))),
            },
            LinkKind::Unknown => report.errors.push(format!("Unknown format: {}", line)),
        }
        progress(i + 1, lines.len());
    }

    info!(
        valid = report.valid,
        errors = report.errors.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "input checked"
    );
    Ok(report)
}

async fn check_subscription(
    line: &str,
    classifier: &dyn LinkClassifier,
    fetcher: &dyn SubscriptionFetcher,
    report: &mut CheckReport,
) {
    if let Err(e) = validate_url(line) {
        report.errors.push(format!("Invalid subscription URL: {}", reason(e)));
        return;
    }

    let content = match fetcher.fetch(line).await {
        Ok(content) => content,
        Err(e) => {
            report.errors.push(format!("Failed to fetch {}: {}", line, reason(e)));
            return;
        }
    };
    if let Err(e) = validate_response_size(&content) {
        report.errors.push(format!("Subscription response too large: {}", reason(e)));
        return;
    }

    let before = report.valid;
    for link in content_lines(&content) {
        if classifier.is_direct_link(&link) {
            report.record(&link);
        }
    }
    debug!(url = line, links = report.valid - before, "subscription checked");
    if report.valid == before {
        report.errors.push(format!("Subscription {} contains no valid proxy links", line));
    }
}

fn reason(err: WizardError) -> String {
    match err {
        WizardError::Validation(msg) | WizardError::Fetch(msg) => msg,
        other => other.to_string(),
    }
}
