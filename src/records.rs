//! Financial records: value types and the record service contract
//!
//! The USSD flows only ever talk to [`RecordService`]; the SQLite adapter and
//! the test mock are interchangeable behind it.

mod traits;
mod types;

#[cfg(test)]
pub mod testing;

pub use traits::*;
pub use types::*;
