use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use suiup_init_installer::{install_interrupt_handler, CleanupRegistry};
use tracing_subscriber::EnvFilter;

mod config;
mod flows;
mod render;

use config::{Cli, RunConfig};
use flows::{run_install, HostContext, InstallReport, Toolbox};
use render::{format_error_lines, format_report_lines, OutputStyle, TerminalRenderer};

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(config: &RunConfig, ui: TerminalRenderer) -> Result<InstallReport> {
    let registry = CleanupRegistry::new();
    install_interrupt_handler(registry.clone())?;
    let host = HostContext::detect(config);
    run_install(config, &host, Toolbox::host(), &registry, ui)
}

fn exit_code(result: &Result<InstallReport>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    let mut config = RunConfig::from_cli(cli, |key| std::env::var(key).ok());
    if !std::io::stdout().is_terminal() {
        config.output = OutputStyle::Plain;
    }
    init_tracing(&config.log_filter);

    let ui = TerminalRenderer::from_style(config.output);
    let result = run(&config, ui);
    match &result {
        Ok(report) => {
            ui.print_section("summary");
            ui.print_lines(&format_report_lines(report, ui.style()));
        }
        Err(err) => ui.eprint_lines(&format_error_lines(err, ui.style())),
    }
    std::process::exit(exit_code(&result));
}
