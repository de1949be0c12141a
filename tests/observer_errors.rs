use order_book_engine::errors::ObserverError;
use order_book_engine::event::{Event, Observer};
use order_book_engine::orderbook::OrderBook;
use order_book_engine::orders::{OrderFactory, Side};

/// An observer that always fails, to exercise the "best-effort fan-out,
/// abort on first failure" contract.
struct Failing;

impl Observer for Failing {
    fn on_event(&mut self, _event: &Event) -> Result<(), ObserverError> {
        Err(ObserverError::Write(std::io::Error::other("boom")))
    }
}

#[test]
fn a_failing_observer_propagates_out_of_add_order() {
    let mut book = OrderBook::new();
    book.add_observer(Box::new(Failing));
    let mut factory = OrderFactory::new();

    let order = factory.create_limit(Side::Buy, 1, 10.0).unwrap();
    let result = book.add_order(order);
    assert!(result.is_err());
}

#[test]
fn a_failing_observer_does_not_stop_earlier_observers_from_having_already_run() {
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Counting(Rc<RefCell<usize>>);
    impl Observer for Counting {
        fn on_event(&mut self, _event: &Event) -> Result<(), ObserverError> {
            *self.0.borrow_mut() += 1;
            Ok(())
        }
    }

    let count = Rc::new(RefCell::new(0));
    let mut book = OrderBook::new();
    // Registered before the failing observer: its fan-out call for the Add
    // event must have already completed before the failure aborts the rest.
    book.add_observer(Box::new(Counting(count.clone())));
    book.add_observer(Box::new(Failing));

    let mut factory = OrderFactory::new();
    let order = factory.create_limit(Side::Buy, 1, 10.0).unwrap();
    let result = book.add_order(order);

    assert!(result.is_err());
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn book_state_is_committed_even_though_observer_fan_out_for_add_fails() {
    let mut book = OrderBook::new();
    book.add_observer(Box::new(Failing));
    let mut factory = OrderFactory::new();

    let order = factory.create_limit(Side::Buy, 5, 10.0).unwrap();
    let _ = book.add_order(order);

    // The mutation already happened before the Add event was dispatched;
    // a failing observer does not roll it back.
    assert_eq!(book.bids().levels(true), vec![(10.0, 5)]);
}
