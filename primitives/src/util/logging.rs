use slog::{o, Discard, Drain, Logger};
use slog_term::{CompactFormat, TermDecorator};

pub use slog_async::Async;

/// Creates an asynchronous terminal [`Logger`] with all records
/// prefixed by the `service` key-value.
pub fn new_logger(prefix: &str) -> Logger {
    let decorator = TermDecorator::new().build();
    let drain = CompactFormat::new(decorator).build().fuse();
    let drain = Async::new(drain).build().fuse();

    Logger::root(drain, o!("service" => prefix.to_owned()))
}

/// A [`Logger`] which drops every record, used in tests.
pub fn discard_logger() -> Logger {
    Logger::root(Discard, o!())
}
