//! Disk-usage command.

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let usage = session.backend.disk_usage().await?;
    if global.quiet {
        println!("{} {}", usage.used, usage.total);
        return Ok(());
    }

    let percent = if usage.total == 0 {
        0.0
    } else {
        usage.used as f64 / usage.total as f64 * 100.0
    };
    println!(
        "{} used of {} ({percent:.0}%)",
        output::fmt_bytes(usage.used),
        output::fmt_bytes(usage.total),
    );
    Ok(())
}
