use std::io;

use log::{debug, info};

use monty_hall::{SimConfig, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = SimConfig::from_env()?;
    let summary = run(&config, io::stdout()).await?;

    for report in &summary.reports {
        debug!(
            worker = report.worker,
            plays = report.tally.plays,
            wins = report.tally.wins,
            flushes = report.flushes,
            words = report.words_drawn;
            "worker report"
        );
    }

    info!(
        "seed {}: {} of {} games won by switching (±{:.4}%)",
        summary.seed,
        summary.totals.wins,
        summary.totals.plays,
        summary.totals.std_error() * 100.
    );

    Ok(())
}
