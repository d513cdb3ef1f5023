pub mod airline;
pub mod flights;
pub mod ordered;
pub mod passengers;

pub use airline::{Airline, Cancellation};
pub use flights::FlightRegistry;
pub use passengers::PassengerRegistry;

use crate::error::{Error, Result};

/// Trims `value`, rejecting it if nothing is left.
pub(crate) fn required(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyField(field));
    }
    Ok(trimmed.to_string())
}
