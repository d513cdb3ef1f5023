use crate::airline::{Airline, FlightRegistry, PassengerRegistry};
use crate::flight::{FlightId, NewFlight};
use crate::passenger::{NewPassenger, PassportNumber};
use crate::time::{Date, DateTime, FlightDuration, ManualClock};
use proptest::prelude::Strategy;
use proptest::prop_oneof;
use proptest::strategy::Just;

pub const NOW: &str = "1 May 2030 - 12:00";

pub fn dt(s: &str) -> DateTime {
    s.parse().unwrap()
}

pub fn date(s: &str) -> Date {
    s.parse().unwrap()
}

/// `days` days and `minutes` minutes after [`NOW`].
pub fn from_now(days: u32, minutes: u32) -> DateTime {
    dt(NOW).add_minutes(days * 1440 + minutes)
}

pub fn airline() -> (Airline, ManualClock) {
    let clock = ManualClock::new(dt(NOW));
    let airline = Airline::new(Box::new(clock.clone()), Airline::DEFAULT_MAX_AGE);
    (airline, clock)
}

pub fn new_flight(
    id: &str,
    origin: &str,
    destination: &str,
    departure: DateTime,
    duration_minutes: u32,
    passenger_max: u32,
    bonus_miles: u32,
) -> NewFlight {
    NewFlight {
        id: id.to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        departure,
        duration: FlightDuration::new(
            (duration_minutes / 60) as u8,
            (duration_minutes % 60) as u8,
        )
        .unwrap(),
        passenger_max,
        bonus_miles,
    }
}

pub fn add_flight(
    airline: &mut Airline,
    id: &str,
    origin: &str,
    destination: &str,
    departure: DateTime,
    duration_minutes: u32,
    passenger_max: u32,
    bonus_miles: u32,
) -> FlightId {
    airline
        .add_flight(new_flight(
            id,
            origin,
            destination,
            departure,
            duration_minutes,
            passenger_max,
            bonus_miles,
        ))
        .unwrap()
}

pub fn new_passenger(first_name: &str, last_name: &str, passport: &str) -> NewPassenger {
    NewPassenger {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        birth_date: date("15 June 1990"),
        passport: passport.to_string(),
    }
}

pub fn add_passenger(
    airline: &mut Airline,
    first_name: &str,
    last_name: &str,
    passport: &str,
) -> PassportNumber {
    airline
        .add_passenger(new_passenger(first_name, last_name, passport))
        .unwrap()
}

pub fn snapshot(airline: &Airline) -> (FlightRegistry, PassengerRegistry) {
    (airline.flights().clone(), airline.passengers().clone())
}

pub fn flight_order(airline: &Airline) -> Vec<String> {
    airline
        .flights()
        .iter()
        .map(|f| f.id.to_string())
        .collect()
}

pub fn reservation_order(airline: &Airline, passport: &str) -> Vec<String> {
    airline
        .passengers()
        .search(passport)
        .unwrap()
        .reservations
        .iter()
        .map(|r| r.flight_id.to_string())
        .collect()
}

pub fn arb_city() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("Manila"), Just("Tokyo"), Just("Cebu"), Just("Seoul")]
}
