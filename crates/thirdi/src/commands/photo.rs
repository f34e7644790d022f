//! Still-photo command.

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::Session;

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let filename = session.backend.make_photo().await?;
    if global.quiet {
        println!("{filename}");
    } else {
        println!("photo saved as {filename}");
    }
    Ok(())
}
