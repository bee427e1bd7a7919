use serde_json::Value;
use tickerdesk_core::DataAccessClient;

use crate::cli::{SearchArgs, TapeArgs};
use crate::error::CliError;

pub async fn health(client: &DataAccessClient) -> Result<Value, CliError> {
    let report = client.health().await?;
    if !report.is_healthy() {
        tracing::warn!(status = %report.status, "backend reports degraded health");
    }
    Ok(serde_json::to_value(report)?)
}

pub async fn ticker_tape(args: &TapeArgs, client: &DataAccessClient) -> Result<Value, CliError> {
    let tape = client.ticker_tape(args.limit, args.force_refresh).await?;
    Ok(serde_json::to_value(tape)?)
}

pub async fn search(args: &SearchArgs, client: &DataAccessClient) -> Result<Value, CliError> {
    let results = client.search(&args.query, args.limit).await?;
    Ok(serde_json::to_value(results)?)
}
