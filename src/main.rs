use crate::airline::Airline;
use crate::config::Config;
use crate::error::Error;
use crate::flight::{Flight, FlightUpdate, NewFlight};
use crate::logging::{Verbosity, init_logging};
use crate::passenger::{NewPassenger, PassengerUpdate};
use crate::storage::Storage;
use crate::time::{Date, DateTime, FlightDuration, SystemClock};
use crate::view::{FlightRow, PAGE_ROWS, PassengerRow, render};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitCode, Stdio};
use std::str::FromStr;
use tabled::Tabled;

mod airline;
mod config;
mod error;
mod flight;
mod logging;
mod passenger;
mod storage;
mod time;
mod view;

#[derive(Parser)]
#[command(version, about = "Flight passenger management console")]
struct Args {
    /// Configuration file [default: ./paxdesk.toml]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the flight and passenger files
    #[arg(short, long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log more (-v: every change, -vv: everything)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only the command word is completed.
        if line.contains(char::is_whitespace) {
            return Ok((0, Vec::new()));
        }
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: format!("{} ", cmd),
            })
            .collect();
        Ok((0, candidates))
    }
}

type Shell = Editor<CompleteHelper, DefaultHistory>;

#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error(transparent)]
    Record(#[from] Error),
    #[error("input aborted")]
    Aborted,
    #[error("input error: {0}")]
    Readline(ReadlineError),
}

impl From<ReadlineError> for CommandError {
    fn from(err: ReadlineError) -> Self {
        match err {
            ReadlineError::Interrupted | ReadlineError::Eof => CommandError::Aborted,
            other => CommandError::Readline(other),
        }
    }
}

/// `Ok(true)` when the command changed records that must be saved.
type Outcome = Result<bool, CommandError>;

const COMMANDS: &[&str] = &[
    "flights",
    "flight",
    "add-flight",
    "edit-flight",
    "delete-flight",
    "passengers",
    "add-passenger",
    "edit-passenger",
    "book",
    "cancel",
    "reservations",
    "help",
    "exit",
];

fn error(msg: impl Display) {
    println!("{} {}", "[Error]".red().bold(), msg);
}

fn success(msg: impl Display) {
    println!("{} {}", "[Success]".green().bold(), msg);
}

fn info(msg: impl Display) {
    println!("{} {}", "[Info]".yellow().bold(), msg);
}

fn paginate(content: &str) -> std::io::Result<()> {
    let mut pager = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn())?;

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // Quitting the pager early closes the pipe.
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e);
            }
        }
    }

    // Wait for the user to close the pager before returning to the ">> " prompt
    pager.wait()?;
    Ok(())
}

fn show_table<T: Tabled>(rows: Vec<T>) {
    let long = rows.len() > PAGE_ROWS;
    let table = render(rows);
    if long {
        if let Err(e) = paginate(&table) {
            tracing::warn!(error = %e, "pager unavailable");
            println!("{}", table);
        }
    } else {
        println!("{}", table);
    }
}

fn ask(rl: &mut Shell, label: &str) -> Result<String, CommandError> {
    Ok(rl.readline(&format!("  {label}: "))?)
}

fn ask_parsed<T: FromStr<Err = Error>>(rl: &mut Shell, label: &str) -> Result<T, CommandError> {
    let input = ask(rl, label)?;
    Ok(input.trim().parse()?)
}

fn ask_number<T: FromStr>(rl: &mut Shell, label: &str, what: &'static str) -> Result<T, CommandError> {
    let input = ask(rl, label)?;
    match input.trim().parse() {
        Ok(n) => Ok(n),
        Err(_) => Err(Error::Malformed { what, input }.into()),
    }
}

fn ask_duration(rl: &mut Shell) -> Result<FlightDuration, CommandError> {
    let hours = ask_number(rl, "Duration hours", "number of hours")?;
    let minutes = ask_number(rl, "Duration minutes", "number of minutes")?;
    Ok(FlightDuration::new(hours, minutes)?)
}

/// Only an exact `Y` confirms.
fn confirm(rl: &mut Shell, question: &str) -> bool {
    matches!(rl.readline(&format!("{question} [Y/N]: ")), Ok(answer) if answer.trim() == "Y")
}

fn list_flights(airline: &Airline, filter: &str) -> Outcome {
    let flights = airline.flights();
    let selected: Vec<&Flight> = match filter {
        "all" => flights.iter().collect(),
        "available" => flights.available().collect(),
        "full" => flights.fully_booked().collect(),
        "empty" => flights.empty().collect(),
        other => {
            return Err(Error::Malformed {
                what: "listing (all, available, full, empty)",
                input: other.to_string(),
            }
            .into());
        }
    };
    if selected.is_empty() {
        info("No matching flights found.");
    } else {
        let now = airline.now();
        show_table(selected.into_iter().map(|f| FlightRow::new(f, &now)).collect());
    }
    Ok(false)
}

fn show_flight(airline: &Airline, flight_id: &str) -> Outcome {
    let flight = airline.flights().search(flight_id)?;
    show_table(vec![FlightRow::new(flight, &airline.now())]);

    let booked: Vec<PassengerRow> = airline
        .passengers()
        .iter()
        .filter(|p| p.holds(&flight.id))
        .map(PassengerRow::from)
        .collect();
    if booked.is_empty() {
        info(format!("No passengers booked on flight {}.", flight.id));
    } else {
        show_table(booked);
    }
    Ok(false)
}

fn add_flight(airline: &mut Airline, rl: &mut Shell) -> Outcome {
    let id = ask(rl, "Flight ID")?;
    let origin = ask(rl, "Origin")?;
    let destination = ask(rl, "Destination")?;
    let departure: DateTime = ask_parsed(rl, "Departure (D Month Y - HH:MM)")?;
    let duration = ask_duration(rl)?;
    let passenger_max = ask_number(rl, "Maximum passengers", "passenger count")?;
    let bonus_miles = ask_number(rl, "Bonus miles", "number of miles")?;

    let id = airline.add_flight(NewFlight {
        id,
        origin,
        destination,
        departure,
        duration,
        passenger_max,
        bonus_miles,
    })?;
    success(format!("Flight {id} added."));
    Ok(true)
}

fn edit_flight(airline: &mut Airline, rl: &mut Shell, flight_id: &str) -> Outcome {
    let flight = airline.flights().search(flight_id)?;
    show_table(vec![FlightRow::new(flight, &airline.now())]);

    let departure: DateTime = ask_parsed(rl, "New departure (D Month Y - HH:MM)")?;
    let duration = ask_duration(rl)?;
    let passenger_max = ask_number(rl, "Maximum passengers", "passenger count")?;

    airline.edit_flight(
        flight_id,
        FlightUpdate {
            departure,
            duration,
            passenger_max,
        },
    )?;
    success(format!("Flight {} updated.", flight_id.trim().to_ascii_uppercase()));
    Ok(true)
}

fn delete_flight(airline: &mut Airline, rl: &mut Shell, flight_id: &str) -> Outcome {
    let removed = airline.delete_flight(flight_id, |f| {
        confirm(rl, &format!("Delete flight {}?", f.summary()))
    })?;
    match removed {
        Some(flight) => {
            success(format!("Flight {} deleted.", flight.id));
            Ok(true)
        }
        None => {
            info("Nothing was deleted.");
            Ok(false)
        }
    }
}

fn list_passengers(airline: &Airline) -> Outcome {
    if airline.passengers().is_empty() {
        info("No passengers yet.");
    } else {
        show_table(airline.passengers().iter().map(PassengerRow::from).collect());
    }
    Ok(false)
}

fn add_passenger(airline: &mut Airline, rl: &mut Shell) -> Outcome {
    let first_name = ask(rl, "First name")?;
    let last_name = ask(rl, "Last name")?;
    let birth_date: Date = ask_parsed(rl, "Birth date (D Month Y)")?;
    let passport = ask(rl, "Passport number")?;

    let passport = airline.add_passenger(NewPassenger {
        first_name,
        last_name,
        birth_date,
        passport,
    })?;
    success(format!("Passenger {passport} added."));
    Ok(true)
}

fn edit_passenger(airline: &mut Airline, rl: &mut Shell, passport: &str) -> Outcome {
    let passenger = airline.passengers().search(passport)?;
    show_table(vec![PassengerRow::from(passenger)]);

    let last_name = ask(rl, "New last name")?;
    let birth_date: Date = ask_parsed(rl, "New birth date (D Month Y)")?;

    airline.edit_passenger(
        passport,
        PassengerUpdate {
            last_name,
            birth_date,
        },
    )?;
    success(format!("Passenger {} updated.", passport.trim().to_ascii_uppercase()));
    Ok(true)
}

fn book(airline: &mut Airline, passport: &str, flight_id: &str) -> Outcome {
    airline.book(passport, flight_id)?;
    let flight = airline.flights().search(flight_id)?;
    success(format!(
        "Booked {}, {} miles credited.",
        flight.summary(),
        flight.bonus_miles
    ));
    Ok(true)
}

fn cancel(airline: &mut Airline, rl: &mut Shell, passport: &str, flight_id: &str) -> Outcome {
    let cancelled = airline.cancel(passport, flight_id, |f| {
        confirm(rl, &format!("Cancel reservation on {}?", f.summary()))
    })?;
    match cancelled {
        Some(c) => {
            success(format!(
                "Reservation of {} on flight {} removed, {} miles revoked.",
                c.passport, c.flight_id, c.miles_revoked
            ));
            Ok(true)
        }
        None => {
            info("Reservation kept.");
            Ok(false)
        }
    }
}

fn list_reservations(airline: &Airline, passport: &str) -> Outcome {
    let flights = airline.reservations(passport)?;
    if flights.is_empty() {
        info("No reservations.");
    } else {
        let now = airline.now();
        show_table(flights.into_iter().map(|f| FlightRow::new(f, &now)).collect());
    }
    Ok(false)
}

fn print_help() {
    println!("\nAvailable Commands:");
    println!("  flights [filter]            - List flights: all (default), available, full, empty");
    println!("  flight <id>                 - Show one flight and its passengers");
    println!("  add-flight                  - Add a flight");
    println!("  edit-flight <id>            - Change departure, duration and capacity of a flight");
    println!("  delete-flight <id>          - Delete a flight");
    println!("  passengers                  - List passengers");
    println!("  add-passenger               - Add a passenger");
    println!("  edit-passenger <passport>   - Change last name and birth date of a passenger");
    println!("  book <passport> <id>        - Reserve a flight for a passenger");
    println!("  cancel <passport> <id>      - Remove a reservation");
    println!("  reservations <passport>     - List a passenger's reservations");
    println!("  help / ?                    - Show this help menu");
    println!("  exit / quit                 - Save and exit\n");
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(Verbosity::from_flags(args.verbose, args.quiet));

    let mut config = Config::load_from(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    let storage = Storage::from_config(&config);
    let mut airline = storage.load_airline(Box::new(SystemClock), config.max_age_years)?;
    println!(
        "Loaded {} flights and {} passengers from {}",
        airline.flights().len(),
        airline.passengers().len(),
        config.data_dir.display()
    );

    let rl_config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
    };

    let mut rl: Shell = Editor::with_config(rl_config)?;
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(">> ");
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                error(err);
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        rl.add_history_entry(trimmed)?;

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let outcome = match parts.as_slice() {
            ["flights"] => list_flights(&airline, "all"),
            ["flights", filter] => list_flights(&airline, filter),
            ["flight", id] => show_flight(&airline, id),
            ["add-flight"] => add_flight(&mut airline, &mut rl),
            ["edit-flight", id] => edit_flight(&mut airline, &mut rl, id),
            ["delete-flight", id] => delete_flight(&mut airline, &mut rl, id),
            ["passengers"] => list_passengers(&airline),
            ["add-passenger"] => add_passenger(&mut airline, &mut rl),
            ["edit-passenger", passport] => edit_passenger(&mut airline, &mut rl, passport),
            ["book", passport, id] => book(&mut airline, passport, id),
            ["cancel", passport, id] => cancel(&mut airline, &mut rl, passport, id),
            ["reservations", passport] => list_reservations(&airline, passport),
            ["help" | "?"] => {
                print_help();
                Ok(false)
            }
            ["exit" | "quit"] => break,
            [cmd, ..] if COMMANDS.contains(cmd) => {
                info(format!("Wrong arguments for {cmd}, type 'help' for usage."));
                Ok(false)
            }
            [cmd, ..] => {
                info(format!("Unknown command: {cmd}"));
                Ok(false)
            }
            [] => Ok(false),
        };

        match outcome {
            Ok(true) => {
                if let Err(e) = storage.save(&airline) {
                    error(e);
                }
            }
            Ok(false) => {}
            Err(CommandError::Aborted) => info("Command aborted."),
            Err(e) => error(e),
        }
    }

    storage.save(&airline)?;
    println!("Records saved. Goodbye.");
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error(e);
            ExitCode::FAILURE
        }
    }
}
