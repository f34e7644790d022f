//! Device status command.

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let portal = session.backend.portal().await?;

    if global.quiet {
        // Scripting: just the essid, or nothing in access-point mode.
        if let Some(essid) = &portal.essid {
            println!("{essid}");
        }
        return Ok(());
    }

    println!("Serial:  {}", portal.serial);
    if portal.portal {
        println!("Mode:    access point (setup)");
        println!("Network: none — the device hosts its own network");
    } else {
        println!("Mode:    joined");
        println!(
            "Network: {}",
            portal
                .essid
                .as_deref()
                .map_or_else(|| "unknown".to_owned(), output::essid)
        );
    }
    Ok(())
}
