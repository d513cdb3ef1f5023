use crate::error::{Error, Result};
use crate::time::{is_future, DateTime, FlightDuration};
use std::fmt;
use std::str::FromStr;

pub const FLIGHT_ID_LEN: usize = 6;
pub const MIN_PASSENGERS: u32 = 1;

/// Normalized flight identifier: 1-6 uppercase letters and/or digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlightId(String);

impl FlightId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FlightId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.len() > FLIGHT_ID_LEN
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::InvalidFlightId(s.to_string()));
        }
        Ok(FlightId(trimmed.to_ascii_uppercase()))
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    Scheduled,
    InFlight,
    Arrived,
}

impl FlightStatus {
    pub fn has_departed(&self) -> bool {
        !matches!(self, FlightStatus::Scheduled)
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightStatus::Scheduled => write!(f, "Scheduled"),
            FlightStatus::InFlight => write!(f, "In flight"),
            FlightStatus::Arrived => write!(f, "Arrived"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flight {
    pub id: FlightId,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime,
    pub arrival: DateTime,
    pub passenger_qty: u32,
    pub passenger_max: u32,
    pub bonus_miles: u32,
}

impl Flight {
    pub fn status(&self, now: &DateTime) -> FlightStatus {
        let departed = !is_future(now, &self.departure);
        let arrived = is_future(&self.arrival, now);
        match (departed, arrived) {
            (true, true) => FlightStatus::Arrived,
            (true, false) => FlightStatus::InFlight,
            // arrival always follows departure, so this only covers (false, false)
            (false, _) => FlightStatus::Scheduled,
        }
    }

    pub fn is_full(&self) -> bool {
        self.passenger_qty >= self.passenger_max
    }

    /// Sort key: departure, then origin, then destination.
    pub fn sort_key(&self) -> (DateTime, String, String) {
        (
            self.departure,
            self.origin.clone(),
            self.destination.clone(),
        )
    }

    /// One-line description used in listings and conflict messages.
    pub fn summary(&self) -> String {
        format!(
            "{} | {} to {} | {} - {}",
            self.id, self.origin, self.destination, self.departure, self.arrival
        )
    }
}

/// Input for adding a flight. Arrival is derived from `duration`.
#[derive(Debug, Clone)]
pub struct NewFlight {
    pub id: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime,
    pub duration: FlightDuration,
    pub passenger_max: u32,
    pub bonus_miles: u32,
}

/// Replacement schedule and capacity for an existing flight.
#[derive(Debug, Clone, Copy)]
pub struct FlightUpdate {
    pub departure: DateTime,
    pub duration: FlightDuration,
    pub passenger_max: u32,
}
