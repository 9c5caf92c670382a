use anyhow::{Context, Result};
use chrono::Utc;
use invoices::{load_invoices, report, Config};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    match run() {
        Ok(true) => {
            info!("all done");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            error!("finished with failed reports");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("aborting: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load the table and write the reports. `Ok(false)` means some report failed.
fn run() -> Result<bool> {
    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::load().context("loading configuration")?;
    info!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        workers = config.n_workers,
        "startup"
    );

    // ─── 3) load every invoice file ──────────────────────────────────
    let table = load_invoices(&config).context("loading invoices")?;

    // ─── 4) reports, each independent of the others ──────────────────
    let summary = report::generate_all(&table, &config.output_dir, Utc::now())
        .context("preparing output directory")?;
    for (kind, rows) in &summary.written {
        info!(report = %kind, rows, "done");
    }
    Ok(summary.is_success())
}
