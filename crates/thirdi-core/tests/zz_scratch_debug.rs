// Temporary debugging scratch file — delete before finishing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::TcpListener;
use url::Url;

use futures_util::StreamExt;
use thirdi_api::media::{MediaStream, RetryConfig};
use thirdi_core::stream::{StreamConfig, StreamConnector, StreamKind};
use tokio_util::sync::CancellationToken;

const RETRY_DELAY: Duration = Duration::from_millis(50);

async fn spawn_server() -> (Url, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    eprintln!("server: handshake failed");
                    return;
                };
                eprintln!("server: handshake ok");
                while let Some(Ok(_)) = ws.next().await {}
                eprintln!("server: connection ended");
            });
        }
    });
    (Url::parse(&format!("ws://{addr}/")).expect("url"), accepted)
}

#[tokio::test]
async fn raw_media_stream() {
    let (url, accepted) = spawn_server().await;
    let cancel = CancellationToken::new();
    let stream = MediaStream::connect(url, RetryConfig { delay: RETRY_DELAY }, cancel.clone());
    for i in 0..6 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        eprintln!(
            "raw t={}ms connected={} accepts={}",
            i * 300 + 300,
            stream.is_connected(),
            accepted.load(Ordering::SeqCst)
        );
    }
    cancel.cancel();
}

#[tokio::test]
async fn bare_connector() {
    let (video_url, v_acc) = spawn_server().await;
    let (audio_url, a_acc) = spawn_server().await;
    let connector = StreamConnector::new(StreamConfig {
        video_url,
        audio_url,
        retry: RetryConfig { delay: RETRY_DELAY },
    });
    connector.start();
    for i in 0..6 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        eprintln!(
            "conn t={}ms video={} audio={} accepts={}/{}",
            i * 300 + 300,
            connector.is_connected(StreamKind::Video),
            connector.is_connected(StreamKind::Audio),
            v_acc.load(Ordering::SeqCst),
            a_acc.load(Ordering::SeqCst)
        );
    }
    connector.stop();
}
