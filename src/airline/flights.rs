use crate::airline::ordered::OrderedList;
use crate::airline::required;
use crate::error::{Error, Result};
use crate::flight::{Flight, FlightId, NewFlight, MIN_PASSENGERS};
use crate::time::{is_future, DateTime};
use std::slice;

/// All flights, ordered by departure, origin and destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightRegistry {
    flights: OrderedList<Flight>,
}

impl FlightRegistry {
    pub fn new() -> FlightRegistry {
        FlightRegistry::default()
    }

    /// Validates `new` against the registry and inserts it in order.
    pub fn add(&mut self, new: NewFlight, now: &DateTime) -> Result<FlightId> {
        let id: FlightId = new.id.parse()?;
        if self.flights.contains(&id) {
            return Err(Error::DuplicateFlight(id));
        }
        let origin = required("origin", &new.origin)?;
        let destination = required("destination", &new.destination)?;
        if origin.eq_ignore_ascii_case(&destination) {
            return Err(Error::SameOriginDestination(origin));
        }
        if !is_future(now, &new.departure) {
            return Err(Error::DepartureNotInFuture(new.departure.to_string()));
        }
        if new.passenger_max < MIN_PASSENGERS {
            return Err(Error::CapacityTooSmall(MIN_PASSENGERS));
        }

        self.insert(Flight {
            id: id.clone(),
            origin,
            destination,
            departure: new.departure,
            arrival: new.departure.add(new.duration),
            passenger_qty: 0,
            passenger_max: new.passenger_max,
            bonus_miles: new.bonus_miles,
        })?;
        Ok(id)
    }

    /// Inserts an already-built flight, rejecting duplicate ids.
    pub(crate) fn insert(&mut self, flight: Flight) -> Result<()> {
        if self.flights.contains(&flight.id) {
            return Err(Error::DuplicateFlight(flight.id));
        }
        self.flights.insert(flight);
        Ok(())
    }

    /// Looks up a flight by the id as typed by a user.
    pub fn search(&self, flight_id: &str) -> Result<&Flight> {
        let id: FlightId = flight_id.parse()?;
        self.get(&id)
    }

    pub fn get(&self, id: &FlightId) -> Result<&Flight> {
        self.flights
            .get(id)
            .ok_or_else(|| Error::FlightNotFound(id.clone()))
    }

    pub fn find(&self, id: &FlightId) -> Option<&Flight> {
        self.flights.get(id)
    }

    pub fn contains(&self, id: &FlightId) -> bool {
        self.flights.contains(id)
    }

    pub(crate) fn update<R>(&mut self, id: &FlightId, f: impl FnOnce(&mut Flight) -> R) -> Option<R> {
        self.flights.update(id, f)
    }

    /// For changes that leave the departure, origin and destination alone.
    pub(crate) fn update_in_place<R>(
        &mut self,
        id: &FlightId,
        f: impl FnOnce(&mut Flight) -> R,
    ) -> Option<R> {
        self.flights.update_in_place(id, f)
    }

    pub(crate) fn remove(&mut self, id: &FlightId) -> Option<Flight> {
        self.flights.remove(id)
    }

    pub fn iter(&self) -> slice::Iter<'_, Flight> {
        self.flights.iter()
    }

    /// Flights with at least one free seat.
    pub fn available(&self) -> impl Iterator<Item = &Flight> {
        self.iter().filter(|f| !f.is_full())
    }

    pub fn fully_booked(&self) -> impl Iterator<Item = &Flight> {
        self.iter().filter(|f| f.is_full())
    }

    /// Flights nobody has booked.
    pub fn empty(&self) -> impl Iterator<Item = &Flight> {
        self.iter().filter(|f| f.passenger_qty == 0)
    }

    pub fn is_sorted(&self) -> bool {
        self.flights.is_sorted()
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

impl<'a> IntoIterator for &'a FlightRegistry {
    type Item = &'a Flight;
    type IntoIter = slice::Iter<'a, Flight>;

    fn into_iter(self) -> Self::IntoIter {
        self.flights.iter()
    }
}
