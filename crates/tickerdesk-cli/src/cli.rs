//! CLI argument definitions for tickerdesk.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `health` | Check backend liveness |
//! | `fundamentals` | Company fundamentals |
//! | `chart` | Price history |
//! | `news` | Recent headlines |
//! | `tape` | Ticker tape snapshot |
//! | `summary` | AI-generated summary |
//! | `technical` | Technical indicators |
//! | `header` | Quote header |
//! | `search` | Symbol search |
//! | `chat` | Ask the stock assistant |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--base-url` | `$TICKERDESK_API_URL` or `http://localhost:8000` | Backend origin |
//! | `--timeout-ms` | `$TICKERDESK_TIMEOUT_MS` or `30000` | Per-attempt timeout |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `-v` | warn | Raise log verbosity (repeatable) |
//!
//! # Examples
//!
//! ```bash
//! tickerdesk header AAPL --pretty
//! tickerdesk chart MSFT --period 6mo --interval 1wk
//! tickerdesk technical NVDA --param rsi_period=14
//! tickerdesk chat AAPL "What drove the last quarter?" --stream
//! ```

use clap::{ArgAction, Args, Parser, Subcommand};
use tickerdesk_core::{ChartInterval, ChartPeriod};

/// Tickerdesk - terminal client for the stock dashboard backend
#[derive(Debug, Parser)]
#[command(name = "tickerdesk", author, version, about = "Stock dashboard backend client")]
pub struct Cli {
    /// Backend origin, e.g. https://api.example.com
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-attempt request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check backend liveness.
    Health,

    /// Fetch company fundamentals.
    ///
    ///   tickerdesk fundamentals AAPL --force-refresh
    Fundamentals(FundamentalsArgs),

    /// Fetch price history.
    ///
    ///   tickerdesk chart AAPL --period 5d --interval 15m
    Chart(ChartArgs),

    /// Fetch recent news for a ticker.
    News(NewsArgs),

    /// Fetch the ticker tape.
    Tape(TapeArgs),

    /// Fetch the AI-generated summary for a ticker.
    Summary(TickerArgs),

    /// Fetch technical indicators for a ticker.
    ///
    ///   tickerdesk technical AAPL --param rsi_period=14 --param sma=50
    Technical(TechnicalArgs),

    /// Fetch the quote header for a ticker.
    Header(TickerArgs),

    /// Search symbols and company names.
    Search(SearchArgs),

    /// Ask the assistant about a ticker.
    ///
    /// With --stream or --deep the answer is printed as it arrives;
    /// Ctrl-C stops it.
    Chat(ChatArgs),
}

#[derive(Debug, Args)]
pub struct TickerArgs {
    /// Market symbol (e.g., AAPL, BRK.B, ^GSPC).
    pub ticker: String,
}

#[derive(Debug, Args)]
pub struct FundamentalsArgs {
    pub ticker: String,

    /// Ask the backend to bypass its own caches too.
    #[arg(long, default_value_t = false)]
    pub force_refresh: bool,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    pub ticker: String,

    /// Lookback: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
    #[arg(long, default_value = "1y")]
    pub period: ChartPeriod,

    /// Bar width: 1m, 5m, 15m, 30m, 1h, 1d, 1wk, 1mo.
    #[arg(long, default_value = "1d")]
    pub interval: ChartInterval,
}

#[derive(Debug, Args)]
pub struct NewsArgs {
    pub ticker: String,

    #[arg(long, default_value_t = 10)]
    pub limit: u32,
}

#[derive(Debug, Args)]
pub struct TapeArgs {
    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long, default_value_t = false)]
    pub force_refresh: bool,
}

#[derive(Debug, Args)]
pub struct TechnicalArgs {
    pub ticker: String,

    /// Extra query parameter as key=value; repeatable.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-form query (symbol or company name).
    pub query: String,

    #[arg(long, default_value_t = 10)]
    pub limit: u32,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    pub ticker: String,

    pub question: String,

    /// Stream the answer token by token.
    #[arg(long, default_value_t = false)]
    pub stream: bool,

    /// Stream a research-style answer from the deep endpoint.
    #[arg(long, default_value_t = false, conflicts_with = "stream")]
    pub deep: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn chart_options_parse_into_domain_types() {
        let cli = Cli::parse_from(["tickerdesk", "chart", "aapl", "--period", "6mo", "--interval", "1wk"]);
        let Command::Chart(args) = cli.command else {
            panic!("expected chart command");
        };
        assert_eq!(args.period, ChartPeriod::SixMonths);
        assert_eq!(args.interval, ChartInterval::OneWeek);
    }

    #[test]
    fn rejects_unknown_chart_period() {
        assert!(Cli::try_parse_from(["tickerdesk", "chart", "AAPL", "--period", "7y"]).is_err());
    }

    #[test]
    fn stream_and_deep_are_mutually_exclusive() {
        assert!(
            Cli::try_parse_from(["tickerdesk", "chat", "AAPL", "hi", "--stream", "--deep"]).is_err()
        );
    }

    #[test]
    fn global_flags_are_accepted_after_subcommand() {
        let cli = Cli::parse_from([
            "tickerdesk",
            "header",
            "AAPL",
            "--base-url",
            "https://api.example.test",
            "-vv",
        ]);
        assert_eq!(cli.base_url.as_deref(), Some("https://api.example.test"));
        assert_eq!(cli.verbose, 2);
    }
}
