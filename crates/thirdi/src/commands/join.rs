//! Network join / hotspot commands.
//!
//! Thin wrappers over [`JoinController`]: start the attempt, narrate the
//! phase transitions, and map the settled outcome to an exit code.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::broadcast::error::RecvError;

use thirdi_core::join::{JoinConfig, JoinController, JoinEvent, JoinOutcome, JoinPhase};

use crate::cli::{GlobalOpts, JoinArgs};
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn join(session: &Session, args: JoinArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let password = resolve_password(&args)?;
    let JoinArgs {
        essid,
        hidden,
        settle_timeout,
        ..
    } = args;
    let controller = build_controller(session, Some(settle_timeout));

    let outcome = {
        let events = controller.events();
        narrate_phases(&controller, global.quiet);
        if hidden {
            controller.join_hidden(&essid, password).await;
        } else {
            controller.join(&essid, password).await;
        }
        await_settle(events).await
    };
    controller.shutdown();

    match outcome {
        JoinOutcome::Success { essid } => {
            output::note(global.quiet, &format!("joined {}", output::essid(&essid)));
            Ok(())
        }
        JoinOutcome::Failure { timed_out: true, .. } => Err(CliError::JoinTimeout {
            seconds: settle_timeout,
        }),
        JoinOutcome::Failure { essid, .. } => Err(CliError::JoinFailed { essid }),
    }
}

pub async fn hotspot(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let config = JoinConfig::default();
    let deadline_secs = settle_seconds(&config);
    let controller = JoinController::new(Arc::clone(&session.backend), config);

    let outcome = {
        let events = controller.events();
        narrate_phases(&controller, global.quiet);
        controller.start_hotspot().await;
        await_settle(events).await
    };
    controller.shutdown();

    match outcome {
        JoinOutcome::Success { .. } => {
            output::note(global.quiet, "access-point mode restored");
            Ok(())
        }
        JoinOutcome::Failure { timed_out, .. } => {
            if timed_out {
                Err(CliError::JoinTimeout {
                    seconds: deadline_secs,
                })
            } else {
                Err(CliError::Rejected {
                    message: "device did not return to access-point mode".into(),
                })
            }
        }
    }
}

fn build_controller(session: &Session, settle_timeout: Option<u64>) -> JoinController {
    let mut config = JoinConfig::default();
    if let Some(secs) = settle_timeout {
        config.settle_timeout = Some(Duration::from_secs(secs));
    }
    JoinController::new(Arc::clone(&session.backend), config)
}

/// The deadline the controller will actually enforce, in whole seconds,
/// for the timeout error message. Zero means unbounded.
fn settle_seconds(config: &JoinConfig) -> u64 {
    config.settle_timeout.map_or(0, |t| t.as_secs())
}

fn resolve_password(args: &JoinArgs) -> Result<Option<SecretString>, CliError> {
    if let Some(password) = &args.password {
        return Ok(Some(SecretString::from(password.clone())));
    }
    if args.ask {
        let entered = rpassword::prompt_password(format!("Password for {}: ", args.essid))?;
        return Ok(Some(SecretString::from(entered)));
    }
    Ok(None)
}

/// Print phase transitions as the attempt walks through them.
fn narrate_phases(controller: &JoinController, quiet: bool) {
    if quiet {
        return;
    }
    let mut phase = controller.phase();
    tokio::spawn(async move {
        while phase.changed().await.is_ok() {
            let line = match &*phase.borrow_and_update() {
                JoinPhase::Submitting => "sending the request to the device...",
                JoinPhase::AwaitingSelfNetworkDown => {
                    "waiting for the device to leave its current network..."
                }
                JoinPhase::AwaitingTargetNetworkUp => {
                    "waiting for the device to reappear..."
                }
                JoinPhase::Idle | JoinPhase::Settled(_) => continue,
            };
            eprintln!("{line}");
        }
    });
}

/// Block until the attempt settles (or the submit is rejected).
async fn await_settle(
    mut events: tokio::sync::broadcast::Receiver<JoinEvent>,
) -> JoinOutcome {
    loop {
        match events.recv().await {
            Ok(JoinEvent::Settled(outcome)) => return outcome,
            Ok(JoinEvent::SubmitFailed { essid }) => {
                return JoinOutcome::Failure {
                    essid,
                    timed_out: false,
                };
            }
            Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => {
                return JoinOutcome::Failure {
                    essid: String::new(),
                    timed_out: false,
                };
            }
        }
    }
}
