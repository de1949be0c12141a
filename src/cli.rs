use std::collections::HashMap;
use std::io::{BufRead, Write};

use tracing::{info, warn};

use crate::errors::ObserverError;
use crate::orderbook::OrderBook;
use crate::orders::{Order, OrderFactory, Side};

/// Interactive REPL over whitespace-separated commands:
/// `add BUY|SELL <qty> <price>`, `remove <order_id>`, `print`, `exit`.
///
/// The book indexes orders by price level, not by id, so the REPL keeps a
/// local `id -> Order` side-table to resolve `remove <order_id>` back into
/// the `Order` value `OrderBook::remove_order` needs.
pub fn run_repl<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    book: &mut OrderBook,
) -> Result<(), ObserverError> {
    let mut factory = OrderFactory::new();
    let mut resting: HashMap<String, Order> = HashMap::new();

    let _ = writeln!(output, "Welcome to OrderBook CLI!");
    let _ = writeln!(
        output,
        "Commands:\n  add BUY|SELL <qty> <price>\n  remove <order_id>\n  print\n  exit\n"
    );

    let mut line = String::new();
    loop {
        let _ = write!(output, "> ");
        let _ = output.flush();

        line.clear();
        let bytes_read = input.read_line(&mut line).unwrap_or(0);
        if bytes_read == 0 {
            break; // end of input
        }

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("exit") => break,
            Some("print") => print_book(&mut output, book),
            Some("add") => {
                handle_add(&mut output, book, &mut factory, &mut resting, tokens)?;
            }
            Some("remove") => {
                handle_remove(&mut output, book, &mut resting, tokens)?;
            }
            Some(other) => {
                let _ = writeln!(output, "Unknown command: {other}");
            }
            None => {}
        }
    }

    Ok(())
}

fn parse_side(token: &str) -> Option<Side> {
    match token.to_ascii_uppercase().as_str() {
        "BUY" => Some(Side::Buy),
        "SELL" => Some(Side::Sell),
        _ => None,
    }
}

fn handle_add<'a, W: Write>(
    output: &mut W,
    book: &mut OrderBook,
    factory: &mut OrderFactory,
    resting: &mut HashMap<String, Order>,
    mut tokens: impl Iterator<Item = &'a str>,
) -> Result<(), ObserverError> {
    let (Some(side_tok), Some(qty_tok), Some(price_tok)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        let _ = writeln!(output, "Usage: add BUY|SELL <qty> <price>");
        return Ok(());
    };

    let Some(side) = parse_side(side_tok) else {
        let _ = writeln!(output, "Usage: add BUY|SELL <qty> <price>");
        return Ok(());
    };
    let Ok(quantity) = qty_tok.parse::<u64>() else {
        let _ = writeln!(output, "Invalid quantity: {qty_tok}");
        return Ok(());
    };
    let Ok(price) = price_tok.parse::<f64>() else {
        let _ = writeln!(output, "Invalid price: {price_tok}");
        return Ok(());
    };

    let order = match factory.create_limit(side, quantity, price) {
        Ok(order) => order,
        Err(e) => {
            let _ = writeln!(output, "Rejected: {e}");
            return Ok(());
        }
    };

    let _ = writeln!(
        output,
        "Added {} order id={} qty={} price={}",
        side.as_str(),
        order.id(),
        quantity,
        price
    );
    info!(order_id = order.id(), side = side.as_str(), "order submitted");
    resting.insert(order.id().to_string(), order.clone());
    book.add_order(order)
}

fn handle_remove<'a, W: Write>(
    output: &mut W,
    book: &mut OrderBook,
    resting: &mut HashMap<String, Order>,
    mut tokens: impl Iterator<Item = &'a str>,
) -> Result<(), ObserverError> {
    let Some(id) = tokens.next() else {
        let _ = writeln!(output, "Usage: remove <order_id>");
        return Ok(());
    };

    let Some(order) = resting.remove(id) else {
        let _ = writeln!(output, "No such order: {id}");
        warn!(order_id = id, "remove requested for unknown order id");
        return Ok(());
    };

    book.remove_order(&order)?;
    let _ = writeln!(output, "Removed order {id}");
    Ok(())
}

fn print_book<W: Write>(output: &mut W, book: &OrderBook) {
    let _ = writeln!(output, "------ Order Book ------");
    let _ = writeln!(output, "Bids (highest first):");
    for (price, qty) in book.bids().levels(true) {
        let _ = writeln!(output, "Price: {price}, Total Qty: {qty}");
    }
    let _ = writeln!(output, "Asks (lowest first):");
    for (price, qty) in book.asks().levels(false) {
        let _ = writeln!(output, "Price: {price}, Total Qty: {qty}");
    }
    let _ = writeln!(output, "--------------------------");
}
