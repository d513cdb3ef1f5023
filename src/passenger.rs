use crate::error::{Error, Result};
use crate::flight::FlightId;
use crate::time::Date;
use std::fmt;
use std::str::FromStr;

pub const PASSPORT_NUM_LEN: usize = 9;

/// Normalized passport number: exactly 9 uppercase letters and/or digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassportNumber(String);

impl PassportNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PassportNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.len() != PASSPORT_NUM_LEN
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::InvalidPassport(s.to_string()));
        }
        Ok(PassportNumber(trimmed.to_ascii_uppercase()))
    }
}

impl fmt::Display for PassportNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A booking: a non-owning link to a flight in the flight registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub flight_id: FlightId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passenger {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
    pub passport: PassportNumber,
    pub miles: u32,
    /// Ordered by the referenced flights' departure, origin, destination.
    pub reservations: Vec<Reservation>,
}

impl Passenger {
    pub fn reservation_qty(&self) -> usize {
        self.reservations.len()
    }

    pub fn holds(&self, flight_id: &FlightId) -> bool {
        self.reservations.iter().any(|r| r.flight_id == *flight_id)
    }

    /// Sort key: first name, then last name.
    pub fn sort_key(&self) -> (String, String) {
        (self.first_name.clone(), self.last_name.clone())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewPassenger {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
    pub passport: String,
}

/// Mutable details of a passenger. Name and passport stay fixed.
#[derive(Debug, Clone)]
pub struct PassengerUpdate {
    pub last_name: String,
    pub birth_date: Date,
}
