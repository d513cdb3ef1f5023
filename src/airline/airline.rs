use crate::airline::flights::FlightRegistry;
use crate::airline::passengers::PassengerRegistry;
use crate::error::{Error, Result};
use crate::flight::{Flight, FlightId, FlightStatus, FlightUpdate, NewFlight, MIN_PASSENGERS};
use crate::passenger::{NewPassenger, Passenger, PassengerUpdate, PassportNumber, Reservation};
use crate::time::{is_future, ranges_conflict, Clock, DateTime};
use std::collections::HashSet;

/// Result of a reservation removal that went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    pub passport: PassportNumber,
    pub flight_id: FlightId,
    /// Zero when the flight had already arrived.
    pub miles_revoked: u32,
}

#[derive(Debug)]
pub struct Airline {
    flights: FlightRegistry,
    passengers: PassengerRegistry,
    clock: Box<dyn Clock>,
    max_age_years: u32,
}

impl Airline {
    pub const DEFAULT_MAX_AGE: u32 = 120;

    pub fn new(clock: Box<dyn Clock>, max_age_years: u32) -> Airline {
        Airline::with_records(
            FlightRegistry::new(),
            PassengerRegistry::new(),
            clock,
            max_age_years,
        )
    }

    pub fn with_records(
        flights: FlightRegistry,
        passengers: PassengerRegistry,
        clock: Box<dyn Clock>,
        max_age_years: u32,
    ) -> Airline {
        Airline {
            flights,
            passengers,
            clock,
            max_age_years,
        }
    }

    pub fn flights(&self) -> &FlightRegistry {
        &self.flights
    }

    pub fn passengers(&self) -> &PassengerRegistry {
        &self.passengers
    }

    pub fn now(&self) -> DateTime {
        self.clock.now()
    }

    pub fn max_age_years(&self) -> u32 {
        self.max_age_years
    }

    pub fn status(&self, flight: &Flight) -> FlightStatus {
        flight.status(&self.now())
    }

    pub fn flight_status(&self, flight_id: &str) -> Result<FlightStatus> {
        let flight = self.flights.search(flight_id)?;
        Ok(self.status(flight))
    }

    pub fn add_flight(&mut self, new: NewFlight) -> Result<FlightId> {
        let now = self.now();
        let id = self.flights.add(new, &now).inspect_err(|e| {
            tracing::debug!(error = %e, "add flight rejected");
        })?;
        tracing::info!(flight = %id, "flight added");
        self.check_invariants();
        Ok(id)
    }

    /// Replaces departure, duration and capacity, then moves the flight to its new place.
    pub fn edit_flight(&mut self, flight_id: &str, update: FlightUpdate) -> Result<()> {
        let now = self.now();
        let flight = self.flights.search(flight_id)?;
        let id = flight.id.clone();

        if flight.status(&now).has_departed() {
            return Err(Error::AlreadyDeparted(id));
        }
        if !is_future(&now, &update.departure) {
            return Err(Error::DepartureNotInFuture(update.departure.to_string()));
        }
        if update.passenger_max < MIN_PASSENGERS {
            return Err(Error::CapacityTooSmall(MIN_PASSENGERS));
        }
        if update.passenger_max < flight.passenger_qty {
            return Err(Error::CapacityBelowBooked {
                requested: update.passenger_max,
                booked: flight.passenger_qty,
            });
        }

        let edited = Flight {
            departure: update.departure,
            arrival: update.departure.add(update.duration),
            passenger_max: update.passenger_max,
            ..flight.clone()
        };
        for passport in self.passengers.holding(&id) {
            let passenger = self.passengers.get(&passport)?;
            if let Some(other) = self.find_conflict(passenger, &edited) {
                return Err(Error::ScheduleConflict {
                    attempted: edited.summary(),
                    conflicting: other.summary(),
                });
            }
        }

        self.flights.update(&id, |f| {
            f.departure = edited.departure;
            f.arrival = edited.arrival;
            f.passenger_max = edited.passenger_max;
        });
        tracing::info!(flight = %id, departure = %edited.departure, "flight edited");
        self.check_invariants();
        Ok(())
    }

    /// Deletes a flight once `confirm` agrees. Returns `None` if it declined.
    ///
    /// Flights that have not arrived can only go while nobody is booked.
    /// Arrived flights take their reservations with them, keeping the miles earned.
    pub fn delete_flight(
        &mut self,
        flight_id: &str,
        confirm: impl FnOnce(&Flight) -> bool,
    ) -> Result<Option<Flight>> {
        let flight = self.flights.search(flight_id)?;
        let id = flight.id.clone();
        let status = self.status(flight);

        if status != FlightStatus::Arrived && flight.passenger_qty > 0 {
            return Err(Error::FlightHasPassengers(id));
        }
        if !confirm(flight) {
            tracing::debug!(flight = %id, "delete flight declined");
            return Ok(None);
        }

        for passport in self.passengers.holding(&id) {
            self.passengers.update_in_place(&passport, |p| {
                p.reservations.retain(|r| r.flight_id != id);
            });
            self.flights.update_in_place(&id, |f| {
                f.passenger_qty = f.passenger_qty.saturating_sub(1);
            });
            tracing::info!(flight = %id, passport = %passport, "reservation dropped with arrived flight");
        }
        let removed = self.flights.remove(&id);
        tracing::info!(flight = %id, "flight deleted");
        self.check_invariants();
        Ok(removed)
    }

    pub fn add_passenger(&mut self, new: NewPassenger) -> Result<PassportNumber> {
        let today = self.now().date();
        let passport = self
            .passengers
            .add(new, &today, self.max_age_years)
            .inspect_err(|e| tracing::debug!(error = %e, "add passenger rejected"))?;
        tracing::info!(passport = %passport, "passenger added");
        self.check_invariants();
        Ok(passport)
    }

    pub fn edit_passenger(&mut self, passport: &str, update: PassengerUpdate) -> Result<()> {
        let today = self.now().date();
        self.passengers
            .edit(passport, update, &today, self.max_age_years)
            .inspect_err(|e| tracing::debug!(error = %e, "edit passenger rejected"))?;
        tracing::info!(passport = %passport.trim().to_ascii_uppercase(), "passenger edited");
        self.check_invariants();
        Ok(())
    }

    /// Books `flight_id` for the passenger and credits its bonus miles.
    pub fn book(&mut self, passport: &str, flight_id: &str) -> Result<()> {
        let passenger = self.passengers.search(passport)?;
        let flight = self.flights.search(flight_id)?;
        let passport = passenger.passport.clone();
        let id = flight.id.clone();

        if self.status(flight).has_departed() {
            return Err(Error::AlreadyDeparted(id));
        }
        if flight.is_full() {
            return Err(Error::FullyBooked(id));
        }
        if passenger.holds(&id) {
            return Err(Error::AlreadyReserved {
                passport,
                flight: id,
            });
        }
        if let Some(other) = self.find_conflict(passenger, flight) {
            tracing::debug!(flight = %id, conflicting = %other.id, "booking conflicts");
            return Err(Error::ScheduleConflict {
                attempted: flight.summary(),
                conflicting: other.summary(),
            });
        }

        let key = flight.sort_key();
        let bonus_miles = flight.bonus_miles;
        let position = passenger.reservations.partition_point(|r| {
            self.flights
                .find(&r.flight_id)
                .is_some_and(|f| f.sort_key() <= key)
        });

        self.passengers.update_in_place(&passport, |p| {
            p.reservations.insert(
                position,
                Reservation {
                    flight_id: id.clone(),
                },
            );
            p.miles = p.miles.saturating_add(bonus_miles);
        });
        self.flights.update_in_place(&id, |f| f.passenger_qty += 1);

        tracing::info!(flight = %id, passport = %passport, miles = bonus_miles, "reservation booked");
        self.check_invariants();
        Ok(())
    }

    /// Removes a reservation once `confirm` agrees. Returns `None` if it declined.
    ///
    /// Cancelling before departure revokes the bonus miles; clearing out an
    /// arrived flight does not. Flights in the air cannot be unbooked.
    pub fn cancel(
        &mut self,
        passport: &str,
        flight_id: &str,
        confirm: impl FnOnce(&Flight) -> bool,
    ) -> Result<Option<Cancellation>> {
        let passenger = self.passengers.search(passport)?;
        let flight = self.flights.search(flight_id)?;
        let passport = passenger.passport.clone();
        let id = flight.id.clone();

        if !passenger.holds(&id) {
            return Err(Error::ReservationNotFound {
                passport,
                flight: id,
            });
        }
        let status = self.status(flight);
        if status == FlightStatus::InFlight {
            return Err(Error::FlightInProgress(id));
        }
        if !confirm(flight) {
            tracing::debug!(flight = %id, passport = %passport, "cancellation declined");
            return Ok(None);
        }

        let miles_revoked = if status == FlightStatus::Scheduled {
            flight.bonus_miles
        } else {
            0
        };
        self.passengers.update_in_place(&passport, |p| {
            p.reservations.retain(|r| r.flight_id != id);
            p.miles = p.miles.saturating_sub(miles_revoked);
        });
        self.flights.update_in_place(&id, |f| {
            f.passenger_qty = f.passenger_qty.saturating_sub(1);
        });

        tracing::info!(flight = %id, passport = %passport, miles_revoked, "reservation removed");
        self.check_invariants();
        Ok(Some(Cancellation {
            passport,
            flight_id: id,
            miles_revoked,
        }))
    }

    /// The passenger's booked flights in reservation order.
    pub fn reservations(&self, passport: &str) -> Result<Vec<&Flight>> {
        let passenger = self.passengers.search(passport)?;
        passenger
            .reservations
            .iter()
            .map(|r| self.flights.get(&r.flight_id))
            .collect()
    }

    /// First reservation of `passenger`, other than `candidate` itself, whose
    /// interval overlaps the candidate's.
    fn find_conflict<'a>(&'a self, passenger: &Passenger, candidate: &Flight) -> Option<&'a Flight> {
        passenger
            .reservations
            .iter()
            .filter(|r| r.flight_id != candidate.id)
            .filter_map(|r| self.flights.find(&r.flight_id))
            .find(|f| {
                ranges_conflict(
                    &candidate.departure,
                    &candidate.arrival,
                    &f.departure,
                    &f.arrival,
                )
            })
    }

    /// Checks every cross-record invariant, reporting the first violation.
    pub fn verify(&self) -> Result<()> {
        if !self.flights.is_sorted() {
            return Err(Error::Inconsistent("flights are out of order".to_string()));
        }
        if !self.passengers.is_sorted() {
            return Err(Error::Inconsistent("passengers are out of order".to_string()));
        }

        let mut seen = HashSet::new();
        if let Some(f) = self.flights.iter().find(|f| !seen.insert(&f.id)) {
            return Err(Error::Inconsistent(format!("flight {} appears twice", f.id)));
        }
        let mut seen = HashSet::new();
        if let Some(p) = self.passengers.iter().find(|p| !seen.insert(&p.passport)) {
            return Err(Error::Inconsistent(format!("passport {} appears twice", p.passport)));
        }

        for flight in &self.flights {
            if flight.arrival <= flight.departure {
                return Err(Error::Inconsistent(format!(
                    "flight {} arrives before it departs",
                    flight.id
                )));
            }
            if flight.passenger_max < MIN_PASSENGERS || flight.passenger_qty > flight.passenger_max {
                return Err(Error::Inconsistent(format!(
                    "flight {} holds {} of {} seats",
                    flight.id, flight.passenger_qty, flight.passenger_max
                )));
            }
            let holders = self.passengers.iter().filter(|p| p.holds(&flight.id)).count();
            if usize::try_from(flight.passenger_qty).ok() != Some(holders) {
                return Err(Error::Inconsistent(format!(
                    "flight {} counts {} passengers but {} hold reservations",
                    flight.id, flight.passenger_qty, holders
                )));
            }
        }

        for passenger in &self.passengers {
            let mut booked = Vec::with_capacity(passenger.reservations.len());
            for reservation in &passenger.reservations {
                let Some(flight) = self.flights.find(&reservation.flight_id) else {
                    return Err(Error::Inconsistent(format!(
                        "passenger {} references unknown flight {}",
                        passenger.passport, reservation.flight_id
                    )));
                };
                if booked.iter().any(|b: &&Flight| b.id == flight.id) {
                    return Err(Error::Inconsistent(format!(
                        "passenger {} booked flight {} twice",
                        passenger.passport, flight.id
                    )));
                }
                if let Some(other) = booked.iter().find(|b| {
                    ranges_conflict(&b.departure, &b.arrival, &flight.departure, &flight.arrival)
                }) {
                    return Err(Error::Inconsistent(format!(
                        "passenger {} holds overlapping flights {} and {}",
                        passenger.passport, other.id, flight.id
                    )));
                }
                booked.push(flight);
            }
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        if let Err(e) = self.verify() {
            panic!("record invariant violated: {e}");
        }
    }

    #[cfg(not(debug_assertions))]
    fn check_invariants(&self) {}
}
