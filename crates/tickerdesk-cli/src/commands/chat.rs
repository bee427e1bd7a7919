use std::future::Future;

use futures::StreamExt;
use serde_json::Value;
use tickerdesk_core::{ChatMode, ChatRequest, DataAccessClient};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::ChatArgs;
use crate::error::CliError;
use crate::output::TokenWriter;

pub async fn send(args: &ChatArgs, client: &DataAccessClient) -> Result<Value, CliError> {
    let reply = client
        .send_chat_message(&args.ticker, &ChatRequest::new(args.question.as_str()))
        .await?;
    Ok(serde_json::to_value(reply)?)
}

/// Print the answer token by token until it completes or Ctrl-C is pressed.
pub async fn stream(args: &ChatArgs, client: &DataAccessClient) -> Result<(), CliError> {
    let mode = if args.deep {
        ChatMode::Deep
    } else {
        ChatMode::Stream
    };

    let cancel = CancellationToken::new();
    let mut events = client
        .stream_chat(
            &args.ticker,
            &ChatRequest::new(args.question.as_str()),
            mode,
            cancel.clone(),
        )
        .await?;

    // Only listen for Ctrl-C once there is a stream to cancel.
    let _interrupt = InterruptListener::spawn(cancel.clone(), async {
        tokio::signal::ctrl_c().await.is_ok()
    });

    let mut writer = TokenWriter::new(std::io::stdout());
    let mut outcome = Ok(());
    while let Some(event) = events.next().await {
        match writer.write_event(event) {
            Ok(Some(_answer)) => break,
            Ok(None) => {}
            Err(error) => {
                outcome = Err(error);
                break;
            }
        }
    }

    if cancel.is_cancelled() {
        tracing::info!("chat stream cancelled");
        writer.finish()?;
    }
    outcome
}

/// Cancels `cancel` when the signal resolves to `true`. The listener task is
/// aborted when this is dropped.
struct InterruptListener {
    task: JoinHandle<()>,
}

impl InterruptListener {
    fn spawn<F>(cancel: CancellationToken, signal: F) -> Self
    where
        F: Future<Output = bool> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            if signal.await {
                cancel.cancel();
            }
        });
        Self { task }
    }
}

impl Drop for InterruptListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
