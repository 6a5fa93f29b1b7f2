//! resvcheck - validate a configuration and its reservation file.

use slircd_resv::Config;
use slircd_resv::config::validation;
use slircd_resv::matcher::IrcGlob;
use slircd_resv::resv::{ResvFile, ResvKind, ResvStore};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        server = %config.server.name,
        sid = %config.server.sid,
        description = %config.server.description,
        clusters = config.cluster.len(),
        shared = config.shared.len(),
        "Configuration OK"
    );

    let file = ResvFile::new(config.resv.path());
    let report = file.load().await?;

    let mut store = ResvStore::new(Arc::new(IrcGlob));
    let duplicates = store.insert_loaded(report.records);

    let nick_globs = store
        .iter()
        .filter(|r| r.kind == ResvKind::Nick && r.pattern.contains(['*', '?']))
        .count();

    info!(
        path = %file.path().display(),
        channels = store.channel_count(),
        nicks = store.nick_count(),
        nick_globs,
        skipped = report.skipped,
        duplicates,
        "Reservation file OK"
    );

    if report.skipped > 0 {
        warn!(skipped = report.skipped, "Some reservation lines could not be parsed");
    }
    if duplicates > 0 {
        warn!(duplicates, "Duplicate reservations in file were ignored");
    }

    Ok(())
}
