use std::io::{self, BufReader};
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use order_book_engine::cli::run_repl;
use order_book_engine::log_observer::JsonlLogObserver;
use order_book_engine::orderbook::OrderBook;

/// A single-instrument limit order book with price-time matching.
#[derive(Parser)]
#[command(name = "order-book-engine")]
#[command(author = "Andrew Odiit", version = "0.1", about = "A limit order book engine")]
struct Cli {
    /// Where to append the JSON-lines event log.
    #[arg(long, default_value = "trades.jsonl")]
    log_file: String,

    /// Tracing verbosity for operational diagnostics.
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a tracing subscriber was already installed");
    }

    let observer = match JsonlLogObserver::open(&cli.log_file) {
        Ok(observer) => observer,
        Err(e) => {
            eprintln!("fatal: could not open log sink {}: {e}", cli.log_file);
            return ExitCode::FAILURE;
        }
    };

    let mut book = OrderBook::new();
    book.add_observer(Box::new(observer));

    let stdin = io::stdin();
    let stdout = io::stdout();
    match run_repl(BufReader::new(stdin.lock()), stdout.lock(), &mut book) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}
