use std::collections::BTreeMap;

use serde_json::Value;
use tickerdesk_core::DataAccessClient;

use crate::cli::{ChartArgs, FundamentalsArgs, NewsArgs, TechnicalArgs, TickerArgs};
use crate::error::CliError;

pub async fn fundamentals(
    args: &FundamentalsArgs,
    client: &DataAccessClient,
) -> Result<Value, CliError> {
    let fundamentals = client.fundamentals(&args.ticker, args.force_refresh).await?;
    Ok(serde_json::to_value(fundamentals)?)
}

pub async fn chart(args: &ChartArgs, client: &DataAccessClient) -> Result<Value, CliError> {
    let series = client.chart(&args.ticker, args.period, args.interval).await?;
    Ok(serde_json::to_value(series)?)
}

pub async fn news(args: &NewsArgs, client: &DataAccessClient) -> Result<Value, CliError> {
    let feed = client.news(&args.ticker, args.limit).await?;
    Ok(serde_json::to_value(feed)?)
}

pub async fn ai_summary(args: &TickerArgs, client: &DataAccessClient) -> Result<Value, CliError> {
    let summary = client.ai_summary(&args.ticker).await?;
    Ok(serde_json::to_value(summary)?)
}

pub async fn technical(args: &TechnicalArgs, client: &DataAccessClient) -> Result<Value, CliError> {
    let params = parse_params(&args.params)?;
    let analysis = client.technical_analysis(&args.ticker, &params).await?;
    Ok(serde_json::to_value(analysis)?)
}

pub async fn header(args: &TickerArgs, client: &DataAccessClient) -> Result<Value, CliError> {
    let header = client.header(&args.ticker).await?;
    Ok(serde_json::to_value(header)?)
}

fn parse_params(raw: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(CliError::Argument(format!(
                "--param expects KEY=VALUE, got '{pair}'"
            ))),
        })
        .collect()
}
