//! Configuration commands.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn handle(
    session: &Session,
    args: ConfigArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Get { field } => {
            let config = session.backend.config().await?;
            let value = serde_json::to_value(&config).map_err(|e| CliError::Validation {
                field: "config".into(),
                reason: e.to_string(),
            })?;
            let map = value.as_object().cloned().unwrap_or_default();

            match field {
                Some(field) => {
                    let entry = map.get(&field).and_then(|v| v.as_str()).ok_or_else(|| {
                        CliError::Validation {
                            field: field.clone(),
                            reason: "unknown configuration field".into(),
                        }
                    })?;
                    println!("{entry}");
                }
                None => {
                    for (key, value) in &map {
                        if let Some(value) = value.as_str() {
                            println!("{key}={value}");
                        }
                    }
                }
            }
            Ok(())
        }

        ConfigCommand::Set { pairs } => {
            let patch = super::parse_pairs(&pairs)?;
            session.backend.patch_config(&patch).await?;
            output::note(global.quiet, "configuration updated");
            Ok(())
        }
    }
}
