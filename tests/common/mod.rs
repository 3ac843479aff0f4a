#![allow(dead_code)]

use api_model::framework::Command;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

/// Receives from `tap` until a command of type `kind` arrives.
pub async fn next_of(tap: &mut mpsc::UnboundedReceiver<Command>, kind: &str) -> Command {
    timeout(WAIT, async {
        loop {
            let command = tap.recv().await.expect("tap closed");
            if command.kind == kind {
                return command;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {kind}"))
}

/// Polls `condition` until it holds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition never held");
}

/// Everything still buffered in a closed tap.
pub async fn drain(mut tap: mpsc::UnboundedReceiver<Command>) -> Vec<Command> {
    let mut rest = Vec::new();
    while let Some(command) = tap.recv().await {
        rest.push(command);
    }
    rest
}
