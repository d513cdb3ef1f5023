//! Table rendering for the console shell.

use crate::flight::{Flight, FlightStatus};
use crate::passenger::Passenger;
use crate::time::DateTime;
use colored::Colorize;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

/// Tables longer than this go through the pager.
pub const PAGE_ROWS: usize = 20;

#[derive(Tabled)]
pub struct FlightRow {
    #[tabled(rename = "Flight")]
    id: String,
    #[tabled(rename = "Origin")]
    origin: String,
    #[tabled(rename = "Destination")]
    destination: String,
    #[tabled(rename = "Departure")]
    departure: String,
    #[tabled(rename = "Arrival")]
    arrival: String,
    #[tabled(rename = "Seats")]
    seats: String,
    #[tabled(rename = "Bonus miles")]
    bonus_miles: u32,
    #[tabled(rename = "Status")]
    status: String,
}

impl FlightRow {
    pub fn new(flight: &Flight, now: &DateTime) -> FlightRow {
        FlightRow {
            id: flight.id.to_string(),
            origin: flight.origin.clone(),
            destination: flight.destination.clone(),
            departure: flight.departure.to_string(),
            arrival: flight.arrival.to_string(),
            seats: format!("{}/{}", flight.passenger_qty, flight.passenger_max),
            bonus_miles: flight.bonus_miles,
            status: status_label(flight.status(now)),
        }
    }
}

#[derive(Tabled)]
pub struct PassengerRow {
    #[tabled(rename = "Passport")]
    passport: String,
    #[tabled(rename = "First name")]
    first_name: String,
    #[tabled(rename = "Last name")]
    last_name: String,
    #[tabled(rename = "Birth date")]
    birth_date: String,
    #[tabled(rename = "Reservations")]
    reservations: usize,
    #[tabled(rename = "Miles")]
    miles: u32,
}

impl From<&Passenger> for PassengerRow {
    fn from(p: &Passenger) -> Self {
        PassengerRow {
            passport: p.passport.to_string(),
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            birth_date: p.birth_date.to_string(),
            reservations: p.reservation_qty(),
            miles: p.miles,
        }
    }
}

fn status_label(status: FlightStatus) -> String {
    let label = status.to_string();
    match status {
        FlightStatus::Scheduled => label.green().to_string(),
        FlightStatus::InFlight => label.yellow().to_string(),
        FlightStatus::Arrived => label.dimmed().to_string(),
    }
}

/// Renders `rows` with the shell's table style.
pub fn render<T: Tabled>(rows: impl IntoIterator<Item = T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.with(Alignment::left());
    table.to_string()
}
