use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use lvback::{AlertService, BackupRunner, ConfigManager};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with reduced verbosity
    let env_filter = EnvFilter::from_default_env()
        .add_directive("lvback=info".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    let mut args = std::env::args().skip(1);
    let config_path = args
        .next()
        .unwrap_or_else(|| "config/backup.toml".to_string());
    let only_target = args.next();

    info!("Starting LVM snapshot backup runner");

    let config = ConfigManager::load(&config_path).await?;
    info!(
        "Configuration loaded from {}: {} targets",
        config_path,
        config.targets.len()
    );

    if let Some(name) = &only_target {
        if config.target(name).is_none() {
            anyhow::bail!("Target '{}' not found in {}", name, config_path);
        }
    }

    let alerts = AlertService::new(config.alert_webhook_url.clone());
    if alerts.is_enabled() {
        info!("Alert webhook enabled");
    } else {
        warn!("No alert webhook configured; run results are only logged");
    }

    let runner = BackupRunner::new();
    let mut completed = 0usize;
    let mut failed = 0usize;

    for target in &config.targets {
        if let Some(name) = &only_target {
            if name != &target.name {
                continue;
            }
        }

        match runner.run(target).await {
            Ok(outcome) => {
                completed += 1;
                if let Err(e) = alerts
                    .notify(
                        &outcome.target,
                        "completed",
                        &format!("Backup archive written to {}", outcome.archive_path),
                        Some(&outcome.archive_path),
                    )
                    .await
                {
                    warn!("Failed to send backup notification: {}", e);
                }
            }
            Err(e) => {
                failed += 1;
                error!("Backup run for target {} failed: {}", target.name, e);
                if let Err(notify_err) = alerts
                    .notify(&target.name, "failed", &e.to_string(), None)
                    .await
                {
                    warn!("Failed to send backup notification: {}", notify_err);
                }
            }
        }
    }

    info!("Backup runs finished: {} completed, {} failed", completed, failed);

    if failed > 0 {
        anyhow::bail!("{} backup run(s) failed", failed);
    }
    Ok(())
}
