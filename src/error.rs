//! Error types for paxdesk.
//!
//! Every operation on the record store either commits completely or
//! returns one of these errors without touching any record.

use crate::flight::FlightId;
use crate::passenger::PassportNumber;
use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: ids, names, dates, capacities.
    Validation,
    /// The referenced flight, passenger or reservation does not exist.
    NotFound,
    /// The request clashes with existing records or the flight's state.
    Conflict,
    /// Unrecoverable: corrupt data files, dangling references, I/O.
    Fatal,
}

#[derive(Error, Debug)]
pub enum Error {
    // === Validation ===
    #[error("a valid flight ID has at most 6 letters and/or digits only, got '{0}'")]
    InvalidFlightId(String),

    #[error("a valid passport number has exactly 9 letters and/or digits, got '{0}'")]
    InvalidPassport(String),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("origin and destination must differ, both are '{0}'")]
    SameOriginDestination(String),

    #[error("'{input}' is not a valid {what}")]
    Malformed { what: &'static str, input: String },

    #[error("'{0}' is not a month name")]
    InvalidMonth(String),

    #[error("{day} is not a valid day of {month} {year}")]
    InvalidDay { day: u8, month: String, year: i32 },

    #[error("year {0} is before 1909")]
    InvalidYear(i32),

    #[error("{hours:02}:{minutes:02} is not a valid time of day")]
    InvalidTime { hours: u8, minutes: u8 },

    #[error("a flight lasts between 1 and 1130 minutes, got {0}")]
    InvalidDuration(u32),

    #[error("departure {0} is not in the future")]
    DepartureNotInFuture(String),

    #[error("birth date {0} is in the future")]
    BirthDateInFuture(String),

    #[error("passenger would be {age} years old, the limit is {max}")]
    AgeExceeded { age: u32, max: u32 },

    #[error("the maximum number of passengers must be at least {0}")]
    CapacityTooSmall(u32),

    #[error("cannot reduce capacity to {requested}, {booked} passengers already booked")]
    CapacityBelowBooked { requested: u32, booked: u32 },

    // === Not found ===
    #[error("flight {0} does not exist")]
    FlightNotFound(FlightId),

    #[error("passenger {0} does not exist")]
    PassengerNotFound(PassportNumber),

    #[error("passenger {passport} has no reservation on flight {flight}")]
    ReservationNotFound {
        passport: PassportNumber,
        flight: FlightId,
    },

    // === Conflict ===
    #[error("flight {0} already exists")]
    DuplicateFlight(FlightId),

    #[error("passenger with passport number {0} already exists")]
    DuplicatePassport(PassportNumber),

    #[error("passenger {passport} already reserved flight {flight}")]
    AlreadyReserved {
        passport: PassportNumber,
        flight: FlightId,
    },

    #[error("flight {0} is fully booked")]
    FullyBooked(FlightId),

    #[error("flight {0} has already departed")]
    AlreadyDeparted(FlightId),

    #[error("flight {0} is in the air")]
    FlightInProgress(FlightId),

    #[error("passengers have already booked flight {0}")]
    FlightHasPassengers(FlightId),

    #[error("schedule conflict\n  reserving:        {attempted}\n  conflicting with: {conflicting}")]
    ScheduleConflict {
        attempted: String,
        conflicting: String,
    },

    // === Fatal ===
    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("reservation references unknown flight {0}; data files were edited by hand")]
    MissingFlightReference(String),

    #[error("data files are inconsistent: {0}")]
    Inconsistent(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    ConfigValidation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFlightId(_)
            | Self::InvalidPassport(_)
            | Self::EmptyField(_)
            | Self::SameOriginDestination(_)
            | Self::Malformed { .. }
            | Self::InvalidMonth(_)
            | Self::InvalidDay { .. }
            | Self::InvalidYear(_)
            | Self::InvalidTime { .. }
            | Self::InvalidDuration(_)
            | Self::DepartureNotInFuture(_)
            | Self::BirthDateInFuture(_)
            | Self::AgeExceeded { .. }
            | Self::CapacityTooSmall(_)
            | Self::CapacityBelowBooked { .. }
            | Self::ConfigValidation(_) => ErrorKind::Validation,
            Self::FlightNotFound(_)
            | Self::PassengerNotFound(_)
            | Self::ReservationNotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateFlight(_)
            | Self::DuplicatePassport(_)
            | Self::AlreadyReserved { .. }
            | Self::FullyBooked(_)
            | Self::AlreadyDeparted(_)
            | Self::FlightInProgress(_)
            | Self::FlightHasPassengers(_)
            | Self::ScheduleConflict { .. } => ErrorKind::Conflict,
            Self::Parse { .. }
            | Self::MissingFlightReference(_)
            | Self::Inconsistent(_)
            | Self::Io { .. }
            | Self::ConfigLoad(_) => ErrorKind::Fatal,
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}
