//! Text-file persistence for flights and passengers.
//!
//! Both files start with a record count followed by one field per line.
//! Flights: id, origin, destination, departure, arrival, booked seats,
//! capacity, bonus miles. Passengers: last name, first name, passport,
//! birth date, reservation count, that many flight ids, miles.

use crate::airline::{Airline, FlightRegistry, PassengerRegistry, required};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::flight::{Flight, FlightId, MIN_PASSENGERS};
use crate::passenger::{Passenger, PassportNumber, Reservation};
use crate::time::Clock;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::iter::Enumerate;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
    flights_file: String,
    passengers_file: String,
    retention: u32,
}

impl Storage {
    pub fn new(
        dir: impl Into<PathBuf>,
        flights_file: impl Into<String>,
        passengers_file: impl Into<String>,
        retention: u32,
    ) -> Storage {
        Storage {
            dir: dir.into(),
            flights_file: flights_file.into(),
            passengers_file: passengers_file.into(),
            retention,
        }
    }

    pub fn from_config(config: &Config) -> Storage {
        Storage::new(
            &config.data_dir,
            &config.flights_file,
            &config.passengers_file,
            config.backup_retention,
        )
    }

    pub fn flights_path(&self) -> PathBuf {
        self.dir.join(&self.flights_file)
    }

    pub fn passengers_path(&self) -> PathBuf {
        self.dir.join(&self.passengers_file)
    }

    /// Reads both files. A missing file is created empty, so a first run
    /// starts with both registries empty. An existing file is never
    /// overwritten here.
    ///
    /// # Errors
    ///
    /// Every error is fatal: unreadable files, malformed or duplicate
    /// records, reservations of unknown flights, and seat counts that
    /// disagree with the reservations held.
    pub fn load(&self) -> Result<(FlightRegistry, PassengerRegistry)> {
        let flights_path = self.flights_path();
        let (flights, flight_lines) = match read_optional(&flights_path)? {
            Some(text) => parse_flights(&flights_path, &text)?,
            None => {
                tracing::info!(dir = %self.dir.display(), "no flights file found, starting empty");
                fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
                write_records(&flights_path, "0\n")?;
                (FlightRegistry::new(), HashMap::new())
            }
        };

        let passengers_path = self.passengers_path();
        let passengers = match read_optional(&passengers_path)? {
            Some(text) => parse_passengers(&passengers_path, &text, &flights)?,
            None => {
                write_records(&passengers_path, "0\n")?;
                PassengerRegistry::new()
            }
        };

        for flight in &flights {
            let holders = passengers.holding(&flight.id).len();
            if usize::try_from(flight.passenger_qty).ok() != Some(holders) {
                let line = flight_lines.get(&flight.id).copied().unwrap_or(0);
                return Err(Error::parse(
                    &flights_path,
                    line,
                    format!(
                        "flight {} records {} passengers but {} reservations exist",
                        flight.id, flight.passenger_qty, holders
                    ),
                ));
            }
        }

        tracing::info!(
            flights = flights.len(),
            passengers = passengers.len(),
            "records loaded"
        );
        Ok((flights, passengers))
    }

    /// Loads the records into an [`Airline`] and checks the cross-record invariants.
    ///
    /// # Errors
    ///
    /// See [`Storage::load`]. Overlapping reservations are reported as
    /// [`Error::Inconsistent`].
    pub fn load_airline(
        &self,
        clock: Box<dyn Clock>,
        max_age_years: u32,
    ) -> Result<Airline> {
        let (flights, passengers) = self.load()?;
        let airline = Airline::with_records(flights, passengers, clock, max_age_years);
        airline.verify()?;
        Ok(airline)
    }

    /// Rotates backups, then overwrites both files with the current records.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a backup cannot be moved or a file written.
    pub fn save(&self, airline: &Airline) -> Result<()> {
        self.rotate_backups(&self.flights_file)?;
        write_records(&self.flights_path(), &format_flights(airline.flights()))?;
        self.rotate_backups(&self.passengers_file)?;
        write_records(
            &self.passengers_path(),
            &format_passengers(airline.passengers()),
        )?;
        tracing::info!(
            flights = airline.flights().len(),
            passengers = airline.passengers().len(),
            "records saved"
        );
        Ok(())
    }

    pub fn backup_path(&self, file: &str, k: u32) -> PathBuf {
        self.dir.join(format!("backup_{k}_{file}"))
    }

    fn rotate_backups(&self, file: &str) -> Result<()> {
        let current = self.dir.join(file);
        if self.retention == 0 || !current.exists() {
            return Ok(());
        }
        for k in (1..self.retention).rev() {
            let from = self.backup_path(file, k);
            if from.exists() {
                let to = self.backup_path(file, k + 1);
                fs::rename(&from, &to).map_err(|e| Error::io(&from, e))?;
            }
        }
        let first = self.backup_path(file, 1);
        fs::rename(&current, &first).map_err(|e| Error::io(&current, e))?;
        tracing::debug!(file, retention = self.retention, "backups rotated");
        Ok(())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

fn write_records(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}

/// Field-per-line reader that reports positions as 1-based line numbers.
struct Fields<'a> {
    path: &'a Path,
    lines: Enumerate<std::str::Lines<'a>>,
    line: usize,
}

impl<'a> Fields<'a> {
    fn new(path: &'a Path, text: &'a str) -> Fields<'a> {
        Fields {
            path,
            lines: text.lines().enumerate(),
            line: 0,
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str> {
        match self.lines.next() {
            Some((n, line)) => {
                self.line = n + 1;
                Ok(line.trim_end_matches('\r'))
            }
            None => Err(Error::parse(
                self.path,
                self.line + 1,
                format!("unexpected end of file, expected {what}"),
            )),
        }
    }

    fn parse<T>(&mut self, what: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.next(what)?;
        raw.trim().parse().map_err(|e| self.error(format!("bad {what}: {e}")))
    }

    fn text(&mut self, what: &'static str) -> Result<String> {
        let raw = self.next(what)?;
        required(what, raw).map_err(|e| self.error(e.to_string()))
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.path, self.line, message)
    }

    /// Rejects anything but blank lines after the last record.
    fn finish(mut self) -> Result<()> {
        match self.lines.find(|(_, l)| !l.trim().is_empty()) {
            Some((n, _)) => Err(Error::parse(
                self.path,
                n + 1,
                "unexpected content after the last record",
            )),
            None => Ok(()),
        }
    }
}

fn parse_flights(
    path: &Path,
    text: &str,
) -> Result<(FlightRegistry, HashMap<FlightId, usize>)> {
    let mut fields = Fields::new(path, text);
    let count: usize = fields.parse("flight count")?;
    let mut flights = FlightRegistry::new();
    let mut lines = HashMap::new();

    for _ in 0..count {
        let id: FlightId = fields.parse("flight id")?;
        let start = fields.line;
        let origin = fields.text("origin")?;
        let destination = fields.text("destination")?;
        let departure = fields.parse("departure")?;
        let arrival = fields.parse("arrival")?;
        if arrival <= departure {
            return Err(fields.error(format!("flight {id} arrives before it departs")));
        }
        let passenger_qty: u32 = fields.parse("passenger count")?;
        let passenger_max: u32 = fields.parse("passenger capacity")?;
        if passenger_max < MIN_PASSENGERS || passenger_qty > passenger_max {
            return Err(fields.error(format!(
                "flight {id} holds {passenger_qty} of {passenger_max} seats"
            )));
        }
        let bonus_miles = fields.parse("bonus miles")?;

        flights
            .insert(Flight {
                id: id.clone(),
                origin,
                destination,
                departure,
                arrival,
                passenger_qty,
                passenger_max,
                bonus_miles,
            })
            .map_err(|e| Error::parse(path, start, e.to_string()))?;
        lines.insert(id, start);
    }
    fields.finish()?;
    Ok((flights, lines))
}

fn parse_passengers(path: &Path, text: &str, flights: &FlightRegistry) -> Result<PassengerRegistry> {
    let mut fields = Fields::new(path, text);
    let count: usize = fields.parse("passenger count")?;
    let mut passengers = PassengerRegistry::new();

    for _ in 0..count {
        let last_name = fields.text("last name")?;
        let start = fields.line;
        let first_name = fields.text("first name")?;
        let passport: PassportNumber = fields.parse("passport number")?;
        let birth_date = fields.parse("birth date")?;
        let reservation_qty: usize = fields.parse("reservation count")?;

        let mut booked: Vec<&Flight> = Vec::new();
        for _ in 0..reservation_qty {
            let id: FlightId = fields.parse("reserved flight id")?;
            let flight = flights
                .find(&id)
                .ok_or_else(|| Error::MissingFlightReference(id.to_string()))?;
            if booked.iter().any(|f| f.id == id) {
                return Err(fields.error(format!("passenger {passport} reserved {id} twice")));
            }
            booked.push(flight);
        }
        booked.sort_by_key(|f| f.sort_key());
        let miles = fields.parse("miles")?;

        passengers
            .insert(Passenger {
                first_name,
                last_name,
                birth_date,
                passport,
                miles,
                reservations: booked
                    .into_iter()
                    .map(|f| Reservation {
                        flight_id: f.id.clone(),
                    })
                    .collect(),
            })
            .map_err(|e| Error::parse(path, start, e.to_string()))?;
    }
    fields.finish()?;
    Ok(passengers)
}

fn format_flights(flights: &FlightRegistry) -> String {
    let mut out = format!("{}\n", flights.len());
    for f in flights {
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n",
            f.id,
            f.origin,
            f.destination,
            f.departure,
            f.arrival,
            f.passenger_qty,
            f.passenger_max,
            f.bonus_miles
        );
    }
    out
}

fn format_passengers(passengers: &PassengerRegistry) -> String {
    let mut out = format!("{}\n", passengers.len());
    for p in passengers {
        let _ = write!(
            out,
            "{}\n{}\n{}\n{}\n{}\n",
            p.last_name,
            p.first_name,
            p.passport,
            p.birth_date,
            p.reservation_qty()
        );
        for r in &p.reservations {
            let _ = writeln!(out, "{}", r.flight_id);
        }
        let _ = writeln!(out, "{}", p.miles);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::{FlightUpdate, NewFlight};
    use crate::passenger::NewPassenger;
    use crate::time::{DateTime, FlightDuration, ManualClock};
    use tempfile::TempDir;

    const NOW: &str = "1 May 2030 - 12:00";

    fn dt(s: &str) -> DateTime {
        s.parse().unwrap()
    }

    fn storage(dir: &TempDir, retention: u32) -> Storage {
        Storage::new(dir.path(), "flights.txt", "passengers.txt", retention)
    }

    fn load(storage: &Storage) -> Result<Airline> {
        storage.load_airline(Box::new(ManualClock::new(dt(NOW))), 120)
    }

    fn flight(id: &str, departure: &str, bonus_miles: u32) -> NewFlight {
        NewFlight {
            id: id.to_string(),
            origin: "Manila".to_string(),
            destination: "Tokyo".to_string(),
            departure: dt(departure),
            duration: FlightDuration::new(4, 0).unwrap(),
            passenger_max: 3,
            bonus_miles,
        }
    }

    fn passenger(first_name: &str, passport: &str) -> NewPassenger {
        NewPassenger {
            first_name: first_name.to_string(),
            last_name: "Cruz".to_string(),
            birth_date: "15 June 1990".parse().unwrap(),
            passport: passport.to_string(),
        }
    }

    fn sample() -> Airline {
        let mut airline = Airline::new(Box::new(ManualClock::new(dt(NOW))), 120);
        airline.add_flight(flight("AB123", "2 May 2030 - 08:00", 100)).unwrap();
        airline.add_flight(flight("CD456", "4 May 2030 - 08:00", 40)).unwrap();
        airline.add_passenger(passenger("Juan", "P12345678")).unwrap();
        airline.add_passenger(passenger("Ana", "P87654321")).unwrap();
        airline.book("P12345678", "CD456").unwrap();
        airline.book("P12345678", "AB123").unwrap();
        airline
    }

    #[test]
    fn test_first_run_creates_empty_files() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 5);

        let airline = load(&storage).unwrap();

        assert!(airline.flights().is_empty());
        assert!(airline.passengers().is_empty());
        assert_eq!("0\n", fs::read_to_string(storage.flights_path()).unwrap());
        assert_eq!("0\n", fs::read_to_string(storage.passengers_path()).unwrap());
    }

    #[test]
    fn test_saved_records_load_back() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 5);
        let airline = sample();

        storage.save(&airline).unwrap();
        let loaded = load(&storage).unwrap();

        assert_eq!(airline.flights(), loaded.flights());
        assert_eq!(airline.passengers(), loaded.passengers());
        let text = fs::read_to_string(storage.passengers_path()).unwrap();
        assert!(text.starts_with("2\nCruz\nAna\nP87654321\n15 June 1990\n0\n0\n"));
    }

    #[test]
    fn test_flight_file_layout() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        storage.save(&sample()).unwrap();

        let text = fs::read_to_string(storage.flights_path()).unwrap();
        let lines: Vec<&str> = text.lines().take(9).collect();
        assert_eq!(
            vec![
                "2",
                "AB123",
                "Manila",
                "Tokyo",
                "2 May 2030 - 08:00",
                "2 May 2030 - 12:00",
                "1",
                "3",
                "100"
            ],
            lines
        );
    }

    #[test]
    fn test_reservations_resorted_on_load() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        let mut airline = sample();
        airline
            .edit_flight(
                "AB123",
                FlightUpdate {
                    departure: dt("6 May 2030 - 08:00"),
                    duration: FlightDuration::new(4, 0).unwrap(),
                    passenger_max: 3,
                },
            )
            .unwrap();

        storage.save(&airline).unwrap();
        let loaded = load(&storage).unwrap();

        let order: Vec<_> = loaded
            .reservations("P12345678")
            .unwrap()
            .into_iter()
            .map(|f| f.id.to_string())
            .collect();
        assert_eq!(vec!["CD456", "AB123"], order);
    }

    #[test]
    fn test_missing_flight_reference_is_fatal() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        fs::write(storage.flights_path(), "0\n").unwrap();
        fs::write(
            storage.passengers_path(),
            "1\nCruz\nJuan\nP12345678\n15 June 1990\n1\nZZ9\n0\n",
        )
        .unwrap();

        let err = load(&storage).unwrap_err();
        assert!(matches!(err, Error::MissingFlightReference(ref id) if id == "ZZ9"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_duplicate_flight_reports_line() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        let record = "AB1\nManila\nTokyo\n2 May 2030 - 08:00\n2 May 2030 - 10:00\n0\n3\n0\n";
        fs::write(storage.flights_path(), format!("2\n{record}{record}")).unwrap();

        match load(&storage) {
            Err(Error::Parse { line, message, .. }) => {
                assert_eq!(10, line);
                assert!(message.contains("AB1"));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_field_reports_line() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        fs::write(
            storage.flights_path(),
            "1\nAB1\nManila\nTokyo\n31 Febuary 2030 - 08:00\n2 May 2030 - 10:00\n0\n3\n0\n",
        )
        .unwrap();

        let err = load(&storage).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 5, .. }));
        assert!(err.to_string().contains("flights.txt:5:"));
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        storage.save(&sample()).unwrap();

        let text = fs::read_to_string(storage.flights_path()).unwrap();
        fs::write(storage.flights_path(), &text[..text.len() / 2]).unwrap();

        let err = load(&storage).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_oversized_flight_count_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        fs::write(storage.flights_path(), "18446744073709551615\n").unwrap();

        assert!(matches!(load(&storage), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_oversized_reservation_count_is_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        fs::write(storage.flights_path(), "0\n").unwrap();
        fs::write(
            storage.passengers_path(),
            "1\nCruz\nJuan\nP12345678\n15 June 1990\n18446744073709551615\n",
        )
        .unwrap();

        assert!(matches!(load(&storage), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_first_run_keeps_existing_passengers_file() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        let seeded = "1\nCruz\nJuan\nP12345678\n15 June 1990\n0\n250\n";
        fs::write(storage.passengers_path(), seeded).unwrap();

        let airline = load(&storage).unwrap();

        assert_eq!(seeded, fs::read_to_string(storage.passengers_path()).unwrap());
        assert_eq!("0\n", fs::read_to_string(storage.flights_path()).unwrap());
        assert!(airline.flights().is_empty());
        let juan = airline.passengers().search("P12345678").unwrap();
        assert_eq!(250, juan.miles);
        assert_eq!(0, juan.reservation_qty());
    }

    #[test]
    fn test_seat_count_must_match_reservations() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        storage.save(&sample()).unwrap();

        let text = fs::read_to_string(storage.passengers_path()).unwrap();
        // Drop Juan's reservations, leaving the flights' seat counts behind.
        let edited = text.replace(
            "P12345678\n15 June 1990\n2\nAB123\nCD456\n",
            "P12345678\n15 June 1990\n0\n",
        );
        assert_ne!(text, edited);
        fs::write(storage.passengers_path(), edited).unwrap();

        assert!(matches!(load(&storage), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_overlapping_reservations_are_inconsistent() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        let flight = |id: &str| {
            format!("{id}\nManila\nTokyo\n2 May 2030 - 08:00\n2 May 2030 - 10:00\n1\n3\n0\n")
        };
        fs::write(
            storage.flights_path(),
            format!("2\n{}{}", flight("AB1"), flight("AB2")),
        )
        .unwrap();
        fs::write(
            storage.passengers_path(),
            "1\nCruz\nJuan\nP12345678\n15 June 1990\n2\nAB1\nAB2\n0\n",
        )
        .unwrap();

        assert!(matches!(load(&storage), Err(Error::Inconsistent(_))));
    }

    #[test]
    fn test_backup_rotation() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 2);
        let mut airline = sample();

        storage.save(&airline).unwrap();
        let first = fs::read_to_string(storage.flights_path()).unwrap();
        airline.add_flight(flight("EF789", "9 May 2030 - 08:00", 0)).unwrap();
        storage.save(&airline).unwrap();
        let second = fs::read_to_string(storage.flights_path()).unwrap();
        airline.delete_flight("EF789", |_| true).unwrap();
        storage.save(&airline).unwrap();

        let backup_1 = storage.backup_path("flights.txt", 1);
        let backup_2 = storage.backup_path("flights.txt", 2);
        assert_eq!(second, fs::read_to_string(&backup_1).unwrap());
        assert_eq!(first, fs::read_to_string(&backup_2).unwrap());
        assert!(!storage.backup_path("flights.txt", 3).exists());
        assert!(storage.backup_path("passengers.txt", 2).exists());
    }

    #[test]
    fn test_zero_retention_keeps_no_backups() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir, 0);
        storage.save(&sample()).unwrap();
        storage.save(&sample()).unwrap();

        assert!(!storage.backup_path("flights.txt", 1).exists());
    }
}
