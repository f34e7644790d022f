//! Network scan command.

use std::sync::Arc;
use std::time::Duration;

use thirdi_core::join::{JoinConfig, JoinController};

use crate::cli::{GlobalOpts, NetworksArgs};
use crate::error::CliError;
use crate::output;

use super::Session;

/// How long to let the controller's empty-scan auto-retry run before
/// giving up on the radio ever warming up.
const SCAN_WARMUP_BUDGET: Duration = Duration::from_secs(10);

pub async fn handle(
    session: &Session,
    args: NetworksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let NetworksArgs { dedup } = args;
    let controller = JoinController::new(Arc::clone(&session.backend), JoinConfig {
        dedup_scan_results: dedup,
        ..JoinConfig::default()
    });
    let mut networks = controller.networks();

    controller.scan().await?;

    // The first scan after boot often comes back empty while the radio
    // warms up; the controller re-issues it on its own. Wait for the
    // first non-empty snapshot, bounded.
    let snapshot = if networks.borrow().is_empty() {
        let wait = async {
            loop {
                if networks.changed().await.is_err() {
                    break;
                }
                if !networks.borrow().is_empty() {
                    break;
                }
            }
        };
        let _ = tokio::time::timeout(SCAN_WARMUP_BUDGET, wait).await;
        networks.borrow().clone()
    } else {
        networks.borrow().clone()
    };
    controller.shutdown();

    if snapshot.is_empty() {
        output::note(global.quiet, "no networks found");
        return Ok(());
    }

    for network in &*snapshot {
        if global.quiet {
            println!("{}", network.essid);
        } else {
            let lock = if network.password { "locked" } else { "open" };
            println!("{lock:<6} {}", output::essid(&network.essid));
        }
    }
    Ok(())
}
