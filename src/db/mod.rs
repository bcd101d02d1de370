mod connection;
mod log;
mod postgres;
mod query;

pub use connection::*;
pub use log::*;
pub use postgres::*;
pub use query::*;
