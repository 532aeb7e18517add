mod command;
mod console;
mod error;
pub mod output;

use std::io::{BufRead, Write};

use command::{CommandKind, Invocation, TimeCommand};

pub use command::USAGE;
pub use console::Console;
pub use error::ReplError;

use crate::catalog::{Catalog, CatalogError, CatalogSource};
use crate::predict::GroundStation;
use crate::store::{CurrentObject, DataDir};
use crate::tracker::{TrackedObject, TrackingSession};

const PROMPT: &str = "\nPress enter to see values, q to quit: ";

enum Flow {
    Continue,
    Quit,
}

/// The foreground command loop.
pub struct Repl<'a, R, W> {
    session: TrackingSession,
    store: &'a DataDir,
    source: &'a dyn CatalogSource,
    console: Console<R, W>,
}

impl<'a, R: BufRead, W: Write> Repl<'a, R, W> {
    pub fn new(
        session: TrackingSession,
        store: &'a DataDir,
        source: &'a dyn CatalogSource,
        console: Console<R, W>,
    ) -> Self {
        Self {
            session,
            store,
            source,
            console,
        }
    }

    /// Read and execute commands until `quit` or end of input.
    ///
    /// Command failures are printed and the loop carries on. Console failures
    /// and a broken session lock end it.
    pub fn run(&mut self) -> Result<(), ReplError> {
        loop {
            let Some(line) = self.console.read_line(PROMPT)? else {
                return Ok(());
            };

            match self.execute(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Ok(()),
                Err(e @ (ReplError::Io(_) | ReplError::Tracker(_))) => return Err(e),
                Err(ReplError::Aborted) => return Ok(()),
                Err(e) => writeln!(self.console.out(), "{e}")?,
            }
        }
    }

    fn execute(&mut self, line: &str) -> Result<Flow, ReplError> {
        let invocation = Invocation::parse(line);
        let name: &'static str = invocation.kind.into();
        log::debug!("Dispatching {} {:?}", name, invocation.args);

        match invocation.kind {
            CommandKind::Quit => return Ok(Flow::Quit),
            CommandKind::Help => write!(self.console.out(), "{USAGE}")?,
            CommandKind::ClearScreen => output::clear_screen(self.console.out())?,
            CommandKind::UpdateCatalog => self.update_catalog()?,
            CommandKind::ShowGround => {
                let ground = self.session.ground()?;
                output::print_ground(self.console.out(), &ground)?;
            }
            CommandKind::ChooseObject => self.choose_object(&invocation)?,
            CommandKind::ListObjects => {
                let catalog = self.store.load_catalog()?;
                let out = self.console.out();
                for name in catalog.names() {
                    writeln!(out, "{name}")?;
                }
            }
            CommandKind::ShowTime => {
                let snapshot = self.session.snapshot()?;
                output::print_time(self.console.out(), &snapshot)?;
            }
            CommandKind::ChangeGround => self.change_ground()?,
            CommandKind::AdjustTime => self.adjust_time(&invocation.args)?,
            CommandKind::ShowObject => {
                let snapshot = self.session.snapshot()?;
                output::print_object(self.console.out(), &snapshot)?;
            }
        }

        Ok(Flow::Continue)
    }

    fn update_catalog(&mut self) -> Result<(), ReplError> {
        writeln!(self.console.out(), "Updating your TLE...")?;
        match refresh_catalog(self.store, self.source) {
            Ok(_) => writeln!(self.console.out(), "Successfully updated your TLE!")?,
            Err(e) => {
                log::warn!("Catalog update failed: {}", e);
                writeln!(
                    self.console.out(),
                    "Unable to update TLE. Check your network connection"
                )?;
            }
        }
        Ok(())
    }

    fn choose_object(&mut self, invocation: &Invocation) -> Result<(), ReplError> {
        if invocation.args.is_empty() {
            return Err(ReplError::Usage("Must specify a station to change to".into()));
        }
        let wanted = invocation.rest();

        let catalog = self.store.load_catalog()?;
        let record = match catalog.find_exact(&wanted) {
            Ok(record) => record,
            Err(CatalogError::NotFound(_)) => {
                return Err(ReplError::Usage(format!(
                    "Unable to find a satellite named \"{wanted}\""
                )))
            }
            Err(e) => return Err(e.into()),
        };

        writeln!(self.console.out(), "Switching to satellite {}", record.name)?;
        let nickname = self
            .console
            .read_line("Enter a short name: ")?
            .ok_or(ReplError::Aborted)?;

        let object = TrackedObject::from_record(record, &nickname)?;
        self.store.save_current(&CurrentObject {
            full_name: object.full_name().to_string(),
            short_name: object.short_name().to_string(),
        })?;
        self.session.replace_object(object)?;
        Ok(())
    }

    fn change_ground(&mut self) -> Result<(), ReplError> {
        let station = prompt_ground(&mut self.console)?;
        self.store.save_ground(&station)?;
        self.session.replace_ground(station)?;

        let out = self.console.out();
        writeln!(out, "Your update of ground station info is complete.")?;
        output::print_ground(out, &station)?;
        Ok(())
    }

    fn adjust_time(&mut self, args: &[String]) -> Result<(), ReplError> {
        let command = TimeCommand::parse(args)?;
        let shifted = self.session.with_clock(|clock| match command {
            TimeCommand::Reset => {
                clock.reset();
                Ok(None)
            }
            TimeCommand::Freeze => {
                clock.freeze();
                Ok(None)
            }
            TimeCommand::Unfreeze => {
                clock.unfreeze();
                Ok(None)
            }
            TimeCommand::Shift(unit, amount) => clock.adjust_units(unit, amount).map(Some),
            TimeCommand::Adjust(by) => clock.adjust(by).map(|()| Some(by)),
        })??;

        let out = self.console.out();
        match (command, shifted) {
            (_, Some(by)) => writeln!(out, "Time moved by {}", output::signed(by))?,
            (TimeCommand::Reset, _) => writeln!(out, "Time is reset to 'now'")?,
            (TimeCommand::Freeze, _) => {
                writeln!(out, "Time is now frozen. Use 'time unfreeze' to undo this.")?
            }
            (TimeCommand::Unfreeze, _) => writeln!(out, "Time is now unfrozen.")?,
            (TimeCommand::Shift(..) | TimeCommand::Adjust(_), None) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
impl<R: BufRead> Repl<'_, R, Vec<u8>> {
    fn into_output(self) -> String {
        let (_, out) = self.console.into_parts();
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// Fetch the catalog, check that it parses and store it. The stored copy is
/// left alone on any failure. Returns the number of records.
pub fn refresh_catalog(store: &DataDir, source: &dyn CatalogSource) -> Result<usize, ReplError> {
    let text = source.fetch()?;
    let catalog = Catalog::parse(&text)?;
    store.save_catalog(&text)?;
    log::info!("Catalog updated with {} records", catalog.len());
    Ok(catalog.len())
}

/// Ask for a ground station in degrees.
pub fn prompt_ground<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
) -> Result<GroundStation, ReplError> {
    writeln!(console.out(), "Please enter information for your ground observer:")?;
    let latitude = read_number(console, "Latitude (°N), use (-) for °S: ", "latitude")?;
    let longitude = read_number(console, "Longitude (°E), use (-) for °W: ", "longitude")?;
    let mut elevation = read_number(console, "Elevation (meters): ", "elevation")?;
    let offset = read_number(console, "Timezone offset from UTC (+/-): ", "timezone")?;

    if elevation < 0.0 {
        writeln!(
            console.out(),
            "Warning: minimum supported elevation is 0 meters. Clamping value to 0."
        )?;
        elevation = 0.0;
    }

    Ok(GroundStation::from_degrees(
        latitude, longitude, elevation, offset,
    )?)
}

fn read_number<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    prompt: &str,
    field: &str,
) -> Result<f64, ReplError> {
    let line = console.read_line(prompt)?.ok_or(ReplError::Aborted)?;
    line.trim()
        .parse()
        .map_err(|_| ReplError::Usage(format!("Invalid {field}: {line}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::iss_record;
    use chrono::Duration;
    use tempfile::TempDir;

    struct FakeSource(Result<String, String>);

    impl CatalogSource for FakeSource {
        fn fetch(&self) -> Result<String, CatalogError> {
            self.0.clone().map_err(CatalogError::Network)
        }
    }

    fn catalog_text() -> String {
        let iss = iss_record();
        format!(
            "{name}\n{l1}\n{l2}\nISS DEORBIT TEST\n{l1}\n{l2}\n",
            name = iss.name,
            l1 = iss.line1,
            l2 = iss.line2
        )
    }

    fn fixture() -> (TempDir, DataDir, TrackingSession) {
        let tmp = tempfile::tempdir().unwrap();
        let store = DataDir::new(tmp.path().join("data"));
        store.create().unwrap();
        store.save_catalog(&catalog_text()).unwrap();

        let ground = GroundStation::new(0.610, -2.068, 95.0, -8.0).unwrap();
        let object = TrackedObject::from_record(&iss_record(), "ISS").unwrap();
        (tmp, store, TrackingSession::new(ground, object))
    }

    fn run(store: &DataDir, session: &TrackingSession, source: &FakeSource, input: &str) -> String {
        let console = Console::new(input.as_bytes(), Vec::new());
        let mut repl = Repl::new(session.clone(), store, source, console);
        repl.run().unwrap();
        repl.into_output()
    }

    fn offline() -> FakeSource {
        FakeSource(Err("offline".into()))
    }

    #[test]
    fn quit_stops_reading() {
        let (_tmp, store, session) = fixture();
        let out = run(&store, &session, &offline(), "q\ntime h 5\n");
        assert_eq!(session.snapshot().unwrap().displacement, Duration::zero());
        assert_eq!(out.matches("Press enter").count(), 1);
    }

    #[test]
    fn help_prints_usage() {
        let (_tmp, store, session) = fixture();
        let out = run(&store, &session, &offline(), "he\n");
        assert!(out.contains("list_stations"));
    }

    #[test]
    fn choose_swaps_and_persists() {
        let (_tmp, store, session) = fixture();
        let out = run(
            &store,
            &session,
            &offline(),
            "choose_station ISS DEORBIT TEST\nTest\n",
        );

        assert!(out.contains("Switching to satellite ISS DEORBIT TEST"));
        let object = session.object().unwrap();
        assert_eq!(object.full_name(), "ISS DEORBIT TEST");
        assert_eq!(object.display_name(), "Test");
        assert_eq!(
            store.load_current().unwrap(),
            CurrentObject {
                full_name: "ISS DEORBIT TEST".into(),
                short_name: "Test".into(),
            }
        );
    }

    #[test]
    fn choose_needs_exact_name() {
        let (_tmp, store, session) = fixture();
        let out = run(&store, &session, &offline(), "ch ISS\nch\n");
        assert!(out.contains("Unable to find a satellite named \"ISS\""));
        assert!(out.contains("Must specify a station"));
        assert_eq!(session.object().unwrap().full_name(), "ISS (ZARYA)");
    }

    #[test]
    fn lists_catalog_names() {
        let (_tmp, store, session) = fixture();
        let out = run(&store, &session, &offline(), "list\n");
        assert!(out.contains("ISS (ZARYA)\nISS DEORBIT TEST\n"));
    }

    #[test]
    fn time_commands_drive_the_clock() {
        let (_tmp, store, session) = fixture();
        run(&store, &session, &offline(), "time h 2\nt hour -1\ntime +30m\n");
        assert_eq!(
            session.snapshot().unwrap().displacement,
            Duration::minutes(90)
        );

        let out = run(&store, &session, &offline(), "time freeze\n");
        assert!(out.contains("frozen"));
        assert!(session.snapshot().unwrap().frozen);

        run(&store, &session, &offline(), "time reset\n");
        let snapshot = session.snapshot().unwrap();
        assert!(!snapshot.frozen);
        assert_eq!(snapshot.displacement, Duration::zero());
    }

    #[test]
    fn bad_time_argument_changes_nothing() {
        let (_tmp, store, session) = fixture();
        let out = run(&store, &session, &offline(), "time later\n");
        assert!(out.contains("Unknown time argument 'later'"));
        assert_eq!(session.snapshot().unwrap().displacement, Duration::zero());
    }

    #[test]
    fn oversized_time_shift_keeps_session_alive() {
        let (_tmp, store, session) = fixture();
        let out = run(
            &store,
            &session,
            &offline(),
            "time h 1\ntime d 200000000000\ntime d 100000000\ntime -999999999days\n",
        );

        assert_eq!(out.matches("time shift out of range").count(), 3);
        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.displacement, Duration::hours(1));
        assert!(!snapshot.frozen);
    }

    #[test]
    fn change_ground_clamps_and_persists() {
        let (_tmp, store, session) = fixture();
        let out = run(&store, &session, &offline(), "change\n51.5\n-0.12\n-10\n0\n");

        assert!(out.contains("Clamping value to 0"));
        assert!(out.contains("complete"));
        let ground = session.ground().unwrap();
        assert_eq!(ground.elevation_m(), 0.0);
        assert!((ground.latitude_deg() - 51.5).abs() < 1e-9);
        assert_eq!(store.load_ground().unwrap(), *ground);
    }

    #[test]
    fn invalid_ground_keeps_previous_station() {
        let (_tmp, store, session) = fixture();
        let before = *session.ground().unwrap();
        let out = run(&store, &session, &offline(), "change\n95\n0\n0\n0\nchange\nnorth\n0\n0\n0\n");

        assert!(out.contains("invalid latitude"));
        assert!(out.contains("Invalid latitude: north"));
        assert_eq!(*session.ground().unwrap(), before);
    }

    #[test]
    fn failed_update_keeps_old_catalog() {
        let (_tmp, store, session) = fixture();
        let out = run(&store, &session, &offline(), "update\n");
        assert!(out.contains("Check your network connection"));
        assert_eq!(store.load_catalog().unwrap().len(), 2);
    }

    #[test]
    fn malformed_download_is_not_saved() {
        let (_tmp, store, _session) = fixture();
        let source = FakeSource(Ok("ISS (ZARYA)\nL1\n".into()));
        assert!(matches!(
            refresh_catalog(&store, &source),
            Err(ReplError::Catalog(CatalogError::Format(_)))
        ));
        assert_eq!(store.load_catalog().unwrap().len(), 2);
    }

    #[test]
    fn successful_update_replaces_catalog() {
        let (_tmp, store, session) = fixture();
        let source = FakeSource(Ok("ISS (ZARYA)\nL1\nL2\n".into()));
        let out = run(&store, &session, &source, "u\n");
        assert!(out.contains("Successfully updated"));
        assert_eq!(store.load_catalog().unwrap().len(), 1);
    }

    #[test]
    fn show_object_before_refresh() {
        let (_tmp, store, session) = fixture();
        let out = run(&store, &session, &offline(), "\n");
        assert!(out.contains("ISS\nNo position has been computed yet"));
    }
}
