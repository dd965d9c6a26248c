//! Broker collaborators: the REST market-data client and the CSV
//! trade-log sink.

pub mod client;
pub mod csv_sink;
pub mod error;

pub use client::FyersGateway;
pub use csv_sink::CsvEventSink;
pub use error::GatewayError;
