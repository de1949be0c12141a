use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde_json::json;
use tracing::error;

use crate::errors::ObserverError;
use crate::event::{Event, Observer};

fn to_millis(ts: std::time::SystemTime) -> u128 {
    ts.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// The reference [`Observer`]: appends one JSON object per line to a file,
/// flushing after every write.
///
/// Opening the file is fallible and fatal — a construction failure is
/// surfaced immediately rather than deferred to the first event. Per-write
/// failures are logged at `error` level and then propagated, aborting the
/// remaining observer fan-out for that event.
pub struct JsonlLogObserver {
    file: File,
}

impl JsonlLogObserver {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ObserverError> {
        let path_ref = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path_ref)
            .map_err(|source| ObserverError::Open {
                path: path_ref.display().to_string(),
                source,
            })?;
        Ok(Self { file })
    }

    fn write_line(&mut self, line: &str) -> Result<(), ObserverError> {
        if let Err(e) = writeln!(self.file, "{line}") {
            error!(error = %e, "failed to write event to log sink");
            return Err(ObserverError::Write(e));
        }
        if let Err(e) = self.file.flush() {
            error!(error = %e, "failed to flush log sink");
            return Err(ObserverError::Write(e));
        }
        Ok(())
    }
}

impl Observer for JsonlLogObserver {
    fn on_event(&mut self, event: &Event) -> Result<(), ObserverError> {
        let value = match event {
            Event::Add { timestamp, order, .. } => json!({
                "type": "add",
                "order_id": order.id,
                "side": order.side.as_str(),
                "price": order.price,
                "quantity": order.quantity,
                "timestamp": to_millis(*timestamp) as u64,
            }),
            Event::Remove { timestamp, order, .. } => json!({
                "type": "cancel",
                "order_id": order.id,
                "side": order.side.as_str(),
                "timestamp": to_millis(*timestamp) as u64,
            }),
            Event::Match {
                timestamp,
                buy_order,
                sell_order,
                quantity,
                price,
                ..
            } => json!({
                "type": "match",
                "buy_id": buy_order.id,
                "sell_id": sell_order.id,
                "price": price,
                "quantity": quantity,
                "timestamp": to_millis(*timestamp) as u64,
            }),
        };

        let line = serde_json::to_string(&value)?;
        self.write_line(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::OrderBook;
    use crate::orders::{OrderFactory, Side};
    use std::io::{BufRead, BufReader};

    #[test]
    fn writes_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.jsonl");

        let mut book = OrderBook::new();
        book.add_observer(Box::new(JsonlLogObserver::open(&path).unwrap()));

        let mut factory = OrderFactory::new();
        let sell = factory.create_limit(Side::Sell, 5, 50.0).unwrap();
        book.add_order(sell).unwrap();
        let buy = factory.create_limit(Side::Buy, 5, 50.0).unwrap();
        book.add_order(buy).unwrap();

        let reader = BufReader::new(File::open(&path).unwrap());
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 3);

        let add0: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(add0["type"], "add");
        assert_eq!(add0["order_id"], "0");
        assert_eq!(add0["side"], "SELL");
        assert_eq!(add0["quantity"], 5);

        let match_line: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(match_line["type"], "match");
        assert_eq!(match_line["buy_id"], "1");
        assert_eq!(match_line["sell_id"], "0");
        assert_eq!(match_line["quantity"], 5);
        assert_eq!(match_line["price"], 50.0);
    }

    #[test]
    fn cancel_line_has_no_quantity_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.jsonl");

        let mut book = OrderBook::new();
        book.add_observer(Box::new(JsonlLogObserver::open(&path).unwrap()));

        let mut factory = OrderFactory::new();
        let order = factory.create_limit(Side::Buy, 3, 10.0).unwrap();
        book.add_order(order.clone()).unwrap();
        book.remove_order(&order).unwrap();

        let reader = BufReader::new(File::open(&path).unwrap());
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        let cancel: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(cancel["type"], "cancel");
        assert!(cancel.get("quantity").is_none());
    }

    #[test]
    fn open_failure_is_surfaced_immediately() {
        // A directory cannot be opened as a file.
        let dir = tempfile::tempdir().unwrap();
        let result = JsonlLogObserver::open(dir.path());
        assert!(result.is_err());
    }
}
