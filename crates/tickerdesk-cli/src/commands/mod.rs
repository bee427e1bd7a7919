mod chat;
mod market;
mod stock;

use std::time::Instant;

use serde_json::Value;
use tickerdesk_core::DataAccessClient;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{Envelope, Metadata};

/// Run the selected command. Streamed chat prints as it goes and yields no
/// envelope.
pub async fn run(cli: &Cli, client: &DataAccessClient) -> Result<Option<Envelope>, CliError> {
    let started = Instant::now();

    let (command, data): (&'static str, Value) = match &cli.command {
        Command::Health => ("health", market::health(client).await?),
        Command::Tape(args) => ("tape", market::ticker_tape(args, client).await?),
        Command::Search(args) => ("search", market::search(args, client).await?),
        Command::Fundamentals(args) => ("fundamentals", stock::fundamentals(args, client).await?),
        Command::Chart(args) => ("chart", stock::chart(args, client).await?),
        Command::News(args) => ("news", stock::news(args, client).await?),
        Command::Summary(args) => ("summary", stock::ai_summary(args, client).await?),
        Command::Technical(args) => ("technical", stock::technical(args, client).await?),
        Command::Header(args) => ("header", stock::header(args, client).await?),
        Command::Chat(args) if args.stream || args.deep => {
            chat::stream(args, client).await?;
            return Ok(None);
        }
        Command::Chat(args) => ("chat", chat::send(args, client).await?),
    };

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(Some(Envelope {
        meta: Metadata::new(command, latency_ms, client.network_stats()),
        data,
    }))
}
