//! Runs one daemon session until it ends, expires or Ctrl-C.

use dnssd_core::{DaemonClient, DnssdError, Reactor, ReactorEvent, Reply, ReplyCallback, Request};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ToolConfig;
use crate::output::print_reply;

/// Start `request` against the daemon and print replies as they arrive.
pub async fn run_session(
    config: &ToolConfig,
    request: Request,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = DaemonClient::new(config.daemon.clone());
    let kind = request.kind();

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Result<Reply, DnssdError>>();
    let callback: ReplyCallback = Box::new(move |result| {
        // receiver gone means we are shutting down
        let _ = reply_tx.send(result);
    });

    let session = client.start(request, Some(callback)).await?;
    let (mut reactor, mut events) = Reactor::new();
    let descriptor = reactor.register(session, config.session_deadline())?;
    info!(%descriptor, %kind, "session started");

    let outcome = loop {
        tokio::select! {
            Some(result) = reply_rx.recv() => report(result, json),
            event = events.recv() => break event,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                reactor.shutdown().await;
                break None;
            }
        }
    };

    // replies delivered before the session ended
    while let Ok(result) = reply_rx.try_recv() {
        report(result, json);
    }

    match outcome {
        Some(ReactorEvent::Terminated {
            error: Some(error), ..
        }) => Err(error.into()),
        Some(ReactorEvent::Expired(_)) => {
            info!(%descriptor, "session timed out");
            Ok(())
        }
        _ => Ok(()),
    }
}

fn report(result: Result<Reply, DnssdError>, json: bool) {
    match result {
        Ok(reply) => print_reply(&reply, json),
        Err(e) => warn!("{e}"),
    }
}
