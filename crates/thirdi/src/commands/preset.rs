//! Configuration preset commands.

use crate::cli::{GlobalOpts, PresetArgs, PresetCommand};
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn handle(
    session: &Session,
    args: PresetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PresetCommand::Ls => {
            let presets = session.backend.list_presets().await?;
            if presets.is_empty() {
                output::note(global.quiet, "no presets saved");
            }
            for name in presets {
                println!("{name}");
            }
            Ok(())
        }

        PresetCommand::Save { name, pairs } => {
            let patch = super::parse_pairs(&pairs)?;
            session.backend.save_preset(&name, &patch).await?;
            output::note(global.quiet, &format!("preset '{name}' saved"));
            Ok(())
        }

        PresetCommand::Rm { name } => {
            session.backend.delete_preset(&name).await?;
            output::note(global.quiet, &format!("preset '{name}' deleted"));
            Ok(())
        }
    }
}
