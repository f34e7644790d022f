//! Live-stream monitor command.
//!
//! Starts the stream connector against a real device and reports
//! sub-stream transitions until interrupted. The equivalent of watching
//! the panel's stalling indicator, without the panel.

use tokio::sync::broadcast::error::RecvError;

use thirdi_core::stream::{StreamConfig, StreamConnector, StreamEvent, StreamKind};

use crate::cli::{GlobalOpts, MonitorArgs};
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn handle(
    session: &Session,
    args: MonitorArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let MonitorArgs { duration } = args;
    let Some(base_url) = &session.base_url else {
        return Err(CliError::NotSimulatable {
            operation: "monitor".into(),
        });
    };

    let connector = StreamConnector::new(StreamConfig::for_device(base_url));
    let mut events = connector.events();
    let mut video_frames = connector.video_frames();
    let mut audio_blocks = connector.audio_blocks();
    connector.start();

    output::note(
        global.quiet,
        "monitoring streams (Ctrl-C to stop); both sub-streams retry forever",
    );

    let mut video_count: u64 = 0;
    let mut audio_count: u64 = 0;

    let run = async {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(StreamEvent { kind, connected }) => {
                        let name = match kind {
                            StreamKind::Video => "video",
                            StreamKind::Audio => "audio",
                        };
                        println!("{name}: {}", output::up_down(connected));
                    }
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                },
                frame = video_frames.recv() => {
                    if matches!(frame, Err(RecvError::Closed)) {
                        break;
                    }
                    video_count += 1;
                }
                block = audio_blocks.recv() => {
                    if matches!(block, Err(RecvError::Closed)) {
                        break;
                    }
                    audio_count += 1;
                }
            }
        }
    };

    match duration {
        Some(secs) => {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(secs), run).await;
        }
        None => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                () = run => {}
            }
        }
    }

    connector.stop();
    output::note(
        global.quiet,
        &format!("received {video_count} video frames, {audio_count} audio blocks"),
    );
    Ok(())
}
