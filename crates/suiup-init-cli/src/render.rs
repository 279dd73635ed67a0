use std::time::{Duration, Instant};

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};
use suiup_init_core::InstallError;
use suiup_init_security::{SkipReason, VerificationOutcome};

use crate::flows::InstallReport;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug)]
pub struct TerminalRenderer {
    style: OutputStyle,
}

pub struct TerminalProgress {
    style: OutputStyle,
    label: String,
    progress_bar: Option<ProgressBar>,
    started_at: Instant,
}

impl TerminalRenderer {
    pub fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub fn style(self) -> OutputStyle {
        self.style
    }

    pub fn print_status(self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub fn print_section(self, title: &str) {
        if let Some(line) = render_section_header(self.style, title) {
            println!();
            println!("{}", colorize(section_style(), &line));
        }
    }

    pub fn start_progress(self, label: &str) -> TerminalProgress {
        let progress_bar = if self.style == OutputStyle::Rich {
            let progress_bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed}") {
                progress_bar.set_style(style.tick_chars(".oO@* "));
            }
            progress_bar.set_message(label.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(80));
            Some(progress_bar)
        } else {
            None
        };

        TerminalProgress {
            style: self.style,
            label: label.to_string(),
            progress_bar,
            started_at: Instant::now(),
        }
    }

    pub fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    pub fn eprint_lines(self, lines: &[String]) {
        for line in lines {
            eprintln!("{line}");
        }
    }
}

impl TerminalProgress {
    pub fn finish_success(mut self) {
        let Some(progress_bar) = self.progress_bar.take() else {
            return;
        };

        progress_bar.finish_and_clear();
        println!(
            "{}",
            render_status_line(
                self.style,
                "ok",
                &format!("{} ({})", self.label, format_elapsed(self.started_at.elapsed()))
            )
        );
    }

    pub fn finish_abandon(mut self) {
        if let Some(progress_bar) = self.progress_bar.take() {
            progress_bar.finish_and_clear();
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let millis = elapsed.subsec_millis();
    format!("{secs}.{millis:03}s")
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn warning_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::Yellow.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(format!("== {title} ==")),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

pub fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn indent(lines: impl IntoIterator<Item = String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(|line| format!("    {line}"))
}

/// Banner shown when the binary was installed without a verified checksum.
pub fn format_skipped_banner(reason: &SkipReason, style: OutputStyle) -> Vec<String> {
    let headline = "WARNING: suiup was installed WITHOUT integrity verification";
    let mut lines = vec![match style {
        OutputStyle::Plain => headline.to_string(),
        OutputStyle::Rich => colorize(warning_style(), headline),
    }];
    lines.push(format!("  reason: {reason}"));
    if let SkipReason::UnparsableChecksum { content, .. } = reason {
        lines.push("  checksum file content:".to_string());
        lines.extend(indent(content.lines().map(str::to_string)));
    }
    lines
}

/// Final summary printed after a successful run or dry run.
pub fn format_report_lines(report: &InstallReport, style: OutputStyle) -> Vec<String> {
    let status = |kind: &str, message: &str| render_status_line(style, kind, message);
    let mut lines = Vec::new();

    if let Some(rule) = report.substitution {
        lines.push(status(
            "warn",
            &format!(
                "{} has no published build; using {}: {}",
                report.platform, report.artifact_platform, rule.note
            ),
        ));
    }

    if report.dry_run {
        lines.push(status("..", "dry run, nothing was downloaded or installed"));
        lines.push(format!("  version:      {}", report.version));
        lines.push(format!("  artifact:     {}", report.artifact.download_url));
        if let Some(url) = &report.artifact.checksum_url {
            lines.push(format!("  checksum:     {url}"));
        }
        lines.push(format!(
            "  install path: {} ({})",
            report.target.final_path.display(),
            report.target.source.describe()
        ));
    } else {
        lines.push(status(
            "ok",
            &format!(
                "installed suiup {} to {}",
                report.version,
                report.target.final_path.display()
            ),
        ));
    }

    match &report.verification {
        Some(VerificationOutcome::Verified {
            algorithm, provider, ..
        }) => lines.push(status(
            "ok",
            &format!("{algorithm} checksum verified (via {provider})"),
        )),
        Some(VerificationOutcome::Skipped(reason)) => {
            lines.extend(format_skipped_banner(reason, style));
        }
        Some(VerificationOutcome::Failed { .. }) | None => {}
    }

    let dir = report.target.directory.display();
    if report.path.on_path {
        lines.push(status("ok", &format!("{dir} is on PATH")));
    } else {
        lines.push(status(
            "warn",
            &format!("{dir} is not on PATH; add it with one of:"),
        ));
        lines.extend(indent(report.path.remediation.iter().cloned()));
    }

    if !report.path.shadowing.is_empty() {
        lines.push(status("warn", "other suiup binaries found on PATH:"));
        lines.extend(indent(report.path.shadowing_remediation.iter().cloned()));
    }

    lines
}

/// Error summary: the category and message, then numbered next steps.
pub fn format_error_lines(err: &anyhow::Error, style: OutputStyle) -> Vec<String> {
    let Some(install_error) = InstallError::from_chain(err.chain()) else {
        return vec![render_status_line(style, "err", &format!("error: {err:#}"))];
    };

    let mut lines = vec![render_status_line(
        style,
        "err",
        &format!("{}: {err:#}", install_error.category()),
    )];
    if let InstallError::Integrity(failure) = &install_error {
        lines.push(format!("  expected: {}", failure.expected));
        lines.push(format!("  actual:   {}", failure.actual));
        lines.push("  checksum file content:".to_string());
        lines.extend(indent(failure.checksum_content.lines().map(str::to_string)));
    }
    lines.push("next steps:".to_string());
    lines.extend(
        install_error
            .remediation()
            .into_iter()
            .enumerate()
            .map(|(index, step)| format!("  {}. {step}", index + 1)),
    );
    lines
}
