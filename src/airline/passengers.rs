use crate::airline::ordered::OrderedList;
use crate::airline::required;
use crate::error::{Error, Result};
use crate::flight::FlightId;
use crate::passenger::{NewPassenger, Passenger, PassengerUpdate, PassportNumber};
use crate::time::Date;
use std::slice;

/// All passengers, ordered by first name and last name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassengerRegistry {
    passengers: OrderedList<Passenger>,
}

/// Birth dates may not lie after `today` nor make the passenger older than `max_age`.
pub fn validate_birth_date(birth_date: &Date, today: &Date, max_age: u32) -> Result<()> {
    if birth_date > today {
        return Err(Error::BirthDateInFuture(birth_date.to_string()));
    }
    let age = birth_date.age_at(*today);
    if age > max_age {
        return Err(Error::AgeExceeded { age, max: max_age });
    }
    Ok(())
}

impl PassengerRegistry {
    pub fn new() -> PassengerRegistry {
        PassengerRegistry::default()
    }

    /// Validates `new` and inserts it in order. Miles start at zero.
    pub fn add(&mut self, new: NewPassenger, today: &Date, max_age: u32) -> Result<PassportNumber> {
        let first_name = required("first name", &new.first_name)?;
        let last_name = required("last name", &new.last_name)?;
        validate_birth_date(&new.birth_date, today, max_age)?;
        let passport: PassportNumber = new.passport.parse()?;
        if self.passengers.contains(&passport) {
            return Err(Error::DuplicatePassport(passport));
        }

        self.insert(Passenger {
            first_name,
            last_name,
            birth_date: new.birth_date,
            passport: passport.clone(),
            miles: 0,
            reservations: Vec::new(),
        })?;
        Ok(passport)
    }

    /// Replaces last name and birth date. The sort key is untouched, so no reordering.
    pub fn edit(
        &mut self,
        passport: &str,
        update: PassengerUpdate,
        today: &Date,
        max_age: u32,
    ) -> Result<()> {
        let passport = self.search(passport)?.passport.clone();
        let last_name = required("last name", &update.last_name)?;
        validate_birth_date(&update.birth_date, today, max_age)?;

        self.update_in_place(&passport, |p| {
            p.last_name = last_name;
            p.birth_date = update.birth_date;
        });
        Ok(())
    }

    pub(crate) fn insert(&mut self, passenger: Passenger) -> Result<()> {
        if self.passengers.contains(&passenger.passport) {
            return Err(Error::DuplicatePassport(passenger.passport));
        }
        self.passengers.insert(passenger);
        Ok(())
    }

    /// Looks up a passenger by the passport number as typed by a user.
    pub fn search(&self, passport: &str) -> Result<&Passenger> {
        let passport: PassportNumber = passport.parse()?;
        self.get(&passport)
    }

    pub fn get(&self, passport: &PassportNumber) -> Result<&Passenger> {
        self.passengers
            .get(passport)
            .ok_or_else(|| Error::PassengerNotFound(passport.clone()))
    }

    pub(crate) fn update_in_place<R>(
        &mut self,
        passport: &PassportNumber,
        f: impl FnOnce(&mut Passenger) -> R,
    ) -> Option<R> {
        self.passengers.update_in_place(passport, f)
    }

    /// Passports of everyone holding a reservation on `flight_id`.
    pub fn holding(&self, flight_id: &FlightId) -> Vec<PassportNumber> {
        self.iter()
            .filter(|p| p.holds(flight_id))
            .map(|p| p.passport.clone())
            .collect()
    }

    pub fn iter(&self) -> slice::Iter<'_, Passenger> {
        self.passengers.iter()
    }

    pub fn is_sorted(&self) -> bool {
        self.passengers.is_sorted()
    }

    pub fn len(&self) -> usize {
        self.passengers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }
}

impl<'a> IntoIterator for &'a PassengerRegistry {
    type Item = &'a Passenger;
    type IntoIter = slice::Iter<'a, Passenger>;

    fn into_iter(self) -> Self::IntoIter {
        self.passengers.iter()
    }
}
