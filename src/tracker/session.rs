use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::catalog::OrbitalRecord;
use crate::predict::{
    Ephemeris, GroundStation, NoPassReason, PassWindow, Position, PredictError, Satellite,
};

use super::clock::VirtualClock;
use super::error::TrackerError;
use super::notifier::{deliver, Notify, PassNotifier};

/// The object currently being tracked.
#[derive(Debug)]
pub struct TrackedObject {
    full_name: String,
    short_name: String,
    satellite: Satellite,
}

impl TrackedObject {
    pub fn from_record(record: &OrbitalRecord, short_name: &str) -> Result<Self, PredictError> {
        Ok(Self {
            full_name: record.name.clone(),
            short_name: short_name.trim().to_string(),
            satellite: Satellite::from_record(record)?,
        })
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// The nickname, or the catalog name when no nickname was given.
    pub fn display_name(&self) -> &str {
        if self.short_name.is_empty() {
            &self.full_name
        } else {
            &self.short_name
        }
    }

    pub fn satellite(&self) -> &Satellite {
        &self.satellite
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutlook {
    Upcoming(PassWindow),
    Never(NoPassReason),
}

/// A consistent copy of the session state for printing.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub time: DateTime<Utc>,
    pub frozen: bool,
    pub displacement: Duration,
    pub ground: Arc<GroundStation>,
    pub object: Arc<TrackedObject>,
    pub position: Option<Position>,
    pub pass: Option<PassOutlook>,
}

#[derive(Debug)]
struct Shared {
    clock: VirtualClock,
    sim_time: DateTime<Utc>,
    ground: Arc<GroundStation>,
    object: Arc<TrackedObject>,
    notifier: PassNotifier,
    position: Option<Position>,
    pass: Option<PassOutlook>,
}

impl Shared {
    fn clear_cached(&mut self) {
        self.position = None;
        self.pass = None;
    }
}

/// Stop handle for a running refresh loop.
#[derive(Debug)]
pub struct RefreshWorker {
    stop_tx: oneshot::Sender<()>,
}

impl RefreshWorker {
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
    }
}

/// Shared session state, cloned into both the refresh loop and the command
/// loop. Ground station and tracked object are swapped whole, never edited.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    shared: Arc<StdMutex<Shared>>,
}

impl TrackingSession {
    pub fn new(ground: GroundStation, object: TrackedObject) -> Self {
        let clock = VirtualClock::new();
        Self {
            shared: Arc::new(StdMutex::new(Shared {
                sim_time: clock.now(),
                clock,
                ground: Arc::new(ground),
                object: Arc::new(object),
                notifier: PassNotifier::new(),
                position: None,
                pass: None,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Shared>, TrackerError> {
        Ok(self.shared.lock()?)
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, TrackerError> {
        let locked = self.lock()?;
        Ok(SessionSnapshot {
            time: locked.sim_time,
            frozen: locked.clock.is_frozen(),
            displacement: locked.clock.displacement(),
            ground: locked.ground.clone(),
            object: locked.object.clone(),
            position: locked.position,
            pass: locked.pass,
        })
    }

    pub fn ground(&self) -> Result<Arc<GroundStation>, TrackerError> {
        Ok(self.lock()?.ground.clone())
    }

    pub fn object(&self) -> Result<Arc<TrackedObject>, TrackerError> {
        Ok(self.lock()?.object.clone())
    }

    /// Run `f` against the clock under the session lock. The session time
    /// follows the clock immediately so `now` reflects the change.
    pub fn with_clock<R>(&self, f: impl FnOnce(&mut VirtualClock) -> R) -> Result<R, TrackerError> {
        let mut locked = self.lock()?;
        let result = f(&mut locked.clock);
        locked.sim_time = locked.clock.now();
        Ok(result)
    }

    pub fn replace_ground(&self, ground: GroundStation) -> Result<(), TrackerError> {
        let mut locked = self.lock()?;
        locked.ground = Arc::new(ground);
        locked.clear_cached();
        log::info!(
            "Ground station set to {:.4}°N {:.4}°E",
            ground.latitude_deg(),
            ground.longitude_deg()
        );
        Ok(())
    }

    pub fn replace_object(&self, object: TrackedObject) -> Result<(), TrackerError> {
        let mut locked = self.lock()?;
        log::info!(
            "Tracking {} (NORAD {}, elements from {}) instead of {}",
            object.full_name(),
            object.satellite().norad_id(),
            object.satellite().epoch().format("%Y-%m-%d %H:%M"),
            locked.object.full_name()
        );
        locked.object = Arc::new(object);
        locked.notifier = PassNotifier::new();
        locked.clear_cached();
        Ok(())
    }

    /// One refresh tick. Returns the notification text when the tracked object
    /// has just started passing overhead.
    pub fn refresh(&self, engine: &dyn Ephemeris) -> Result<Option<String>, TrackerError> {
        let (now, ground, object) = {
            let mut locked = self.lock()?;
            let now = locked.clock.now();
            locked.sim_time = now;
            (now, locked.ground.clone(), locked.object.clone())
        };

        // Propagation runs unlocked; commands never wait on a pass search.
        let position = engine.position(object.satellite(), &ground, now)?;
        let pass = match ground.next_pass_for(engine.as_predictor(), object.satellite(), now) {
            Ok(window) => PassOutlook::Upcoming(window),
            Err(PredictError::NoPass(reason)) => PassOutlook::Never(reason),
            Err(e) => return Err(e.into()),
        };

        let mut locked = self.lock()?;
        if !Arc::ptr_eq(&locked.object, &object) || !Arc::ptr_eq(&locked.ground, &ground) {
            log::debug!("Session changed during refresh, result dropped");
            return Ok(None);
        }
        locked.position = Some(position);
        locked.pass = Some(pass);

        if let PassOutlook::Upcoming(window) = pass {
            if locked.notifier.observe(window.rise, window.set) {
                return Ok(Some(format!(
                    "{} is currently passing overhead",
                    object.display_name()
                )));
            }
        }
        Ok(None)
    }

    /// Start the background refresh loop on `runtime`.
    ///
    /// The join handle resolves with the loop's error if a tick fails; there is
    /// no restart.
    pub fn spawn_refresh(
        &self,
        runtime: &Handle,
        engine: Arc<dyn Ephemeris>,
        notifier: Arc<dyn Notify>,
        period: std::time::Duration,
    ) -> (RefreshWorker, JoinHandle<Result<(), TrackerError>>) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let session = self.clone();
        let join = runtime.spawn(run_refresh_loop(session, engine, notifier, period, stop_rx));
        (RefreshWorker { stop_tx }, join)
    }
}

async fn run_refresh_loop(
    session: TrackingSession,
    engine: Arc<dyn Ephemeris>,
    notifier: Arc<dyn Notify>,
    period: std::time::Duration,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<(), TrackerError> {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    log::info!("Refresh loop started ({:?} period)", period);

    loop {
        let should_stop = tokio::select! {
            _ = ticker.tick() => false,
            _ = &mut stop_rx => true,
        };
        if should_stop {
            log::info!("Refresh loop stopped");
            return Ok(());
        }

        // The pass search is CPU bound; keep it off the async workers.
        let tick = tokio::task::spawn_blocking({
            let session = session.clone();
            let engine = engine.clone();
            move || session.refresh(engine.as_ref())
        });
        let message = match tick.await {
            Ok(result) => result?,
            Err(e) => match e.try_into_panic() {
                Ok(payload) => std::panic::resume_unwind(payload),
                Err(_) => {
                    log::info!("Refresh tick cancelled");
                    return Ok(());
                }
            },
        };
        if let Some(message) = message {
            deliver(notifier.as_ref(), &message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::iss_record;
    use crate::predict::{PassPredictor, Propagator};
    use crate::tracker::clock::TimeUnit;
    use crate::tracker::notifier::NotifyError;
    use std::collections::VecDeque;
    use std::thread;

    fn position() -> Position {
        Position {
            azimuth_deg: 120.0,
            altitude_deg: -10.0,
            range_km: 3000.0,
            sublat_deg: 12.0,
            sublong_deg: -40.0,
            height_km: 420.0,
        }
    }

    fn upcoming() -> Result<PassWindow, PredictError> {
        let now = Utc::now();
        Ok(PassWindow {
            rise: now + Duration::minutes(10),
            transit: now + Duration::minutes(14),
            set: now + Duration::minutes(18),
        })
    }

    fn overhead() -> Result<PassWindow, PredictError> {
        let now = Utc::now();
        Ok(PassWindow {
            rise: now + Duration::minutes(90),
            transit: now - Duration::minutes(1),
            set: now + Duration::minutes(3),
        })
    }

    fn never() -> Result<PassWindow, PredictError> {
        Err(PredictError::NoPass(NoPassReason::NeverRises))
    }

    #[derive(Default)]
    struct ScriptedEngine {
        passes: StdMutex<VecDeque<Result<PassWindow, PredictError>>>,
        fail_position: bool,
        seen: StdMutex<Vec<DateTime<Utc>>>,
    }

    impl ScriptedEngine {
        fn with(passes: Vec<Result<PassWindow, PredictError>>) -> Self {
            Self {
                passes: StdMutex::new(passes.into()),
                ..Default::default()
            }
        }
    }

    impl Propagator for ScriptedEngine {
        fn position(
            &self,
            _satellite: &Satellite,
            _station: &GroundStation,
            at: DateTime<Utc>,
        ) -> Result<Position, PredictError> {
            self.seen.lock().unwrap().push(at);
            if self.fail_position {
                return Err(PredictError::Propagation("decayed".into()));
            }
            Ok(position())
        }
    }

    impl PassPredictor for ScriptedEngine {
        fn next_pass(
            &self,
            _satellite: &Satellite,
            _station: &GroundStation,
            _at: DateTime<Utc>,
        ) -> Result<PassWindow, PredictError> {
            self.passes.lock().unwrap().pop_front().unwrap_or_else(upcoming)
        }
    }

    fn session() -> TrackingSession {
        let ground = GroundStation::new(0.610, -2.068, 95.0, -8.0).unwrap();
        let object = TrackedObject::from_record(&iss_record(), "ISS").unwrap();
        TrackingSession::new(ground, object)
    }

    #[test]
    fn display_name_falls_back_to_full_name() {
        let named = TrackedObject::from_record(&iss_record(), "ISS").unwrap();
        assert_eq!(named.display_name(), "ISS");
        let unnamed = TrackedObject::from_record(&iss_record(), "  ").unwrap();
        assert_eq!(unnamed.display_name(), "ISS (ZARYA)");
    }

    #[test]
    fn notifies_once_per_pass() {
        let session = session();
        let engine = ScriptedEngine::with(vec![
            upcoming(),
            upcoming(),
            overhead(),
            overhead(),
            upcoming(),
            overhead(),
        ]);

        let messages: Vec<_> = (0..6).map(|_| session.refresh(&engine).unwrap()).collect();
        assert_eq!(messages[0], None);
        assert_eq!(messages[1], None);
        assert_eq!(messages[2].as_deref(), Some("ISS is currently passing overhead"));
        assert_eq!(messages[3], None);
        assert_eq!(messages[4], None);
        assert!(messages[5].is_some());
    }

    #[test]
    fn no_pass_leaves_notifier_alone() {
        let session = session();
        let engine = ScriptedEngine::with(vec![overhead(), never(), overhead()]);

        assert!(session.refresh(&engine).unwrap().is_some());
        assert!(session.refresh(&engine).unwrap().is_none());
        assert_eq!(
            session.snapshot().unwrap().pass,
            Some(PassOutlook::Never(NoPassReason::NeverRises))
        );
        assert!(session.refresh(&engine).unwrap().is_none());
    }

    #[test]
    fn refresh_caches_position_and_pass() {
        let session = session();
        assert!(session.snapshot().unwrap().position.is_none());

        let engine = ScriptedEngine::default();
        session.refresh(&engine).unwrap();
        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.position, Some(position()));
        assert!(matches!(snapshot.pass, Some(PassOutlook::Upcoming(_))));
    }

    #[test]
    fn propagation_failure_is_an_error() {
        let session = session();
        let engine = ScriptedEngine {
            fail_position: true,
            ..Default::default()
        };
        assert!(matches!(
            session.refresh(&engine),
            Err(TrackerError::Predict(PredictError::Propagation(_)))
        ));
    }

    #[test]
    fn frozen_clock_pins_session_time() {
        let session = session();
        let engine = ScriptedEngine::default();
        session.with_clock(|clock| clock.freeze()).unwrap();

        session.refresh(&engine).unwrap();
        thread::sleep(std::time::Duration::from_millis(20));
        session.refresh(&engine).unwrap();

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen[0], seen[1]);
        assert_eq!(session.snapshot().unwrap().time, seen[0]);
    }

    #[test]
    fn displacement_reaches_the_engine() {
        let session = session();
        let engine = ScriptedEngine::default();
        session
            .with_clock(|clock| clock.adjust_units(TimeUnit::Day, 1))
            .unwrap()
            .unwrap();

        let before = Utc::now();
        session.refresh(&engine).unwrap();
        let seen = engine.seen.lock().unwrap()[0];
        assert!(seen >= before + Duration::days(1));
        assert!(seen < before + Duration::days(1) + Duration::minutes(1));
    }

    #[test]
    fn refused_shift_leaves_session_usable() {
        let session = session();
        let refused = session
            .with_clock(|clock| clock.adjust_units(TimeUnit::Day, 100_000_000))
            .unwrap();
        assert!(refused.is_err());

        let engine = ScriptedEngine::default();
        session.refresh(&engine).unwrap();
        assert_eq!(session.snapshot().unwrap().displacement, Duration::zero());
    }

    #[test]
    fn replacing_object_rearms_and_clears() {
        let session = session();
        let engine = ScriptedEngine::with(vec![overhead(), overhead()]);
        assert!(session.refresh(&engine).unwrap().is_some());

        let replacement = TrackedObject::from_record(&iss_record(), "Station").unwrap();
        session.replace_object(replacement).unwrap();
        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.object.display_name(), "Station");
        assert!(snapshot.position.is_none());

        assert_eq!(
            session.refresh(&engine).unwrap().as_deref(),
            Some("Station is currently passing overhead")
        );
    }

    #[test]
    fn replacing_ground_swaps_whole_value() {
        let session = session();
        let old = session.ground().unwrap();
        let new = GroundStation::from_degrees(-33.9, 18.4, 20.0, 2.0).unwrap();
        session.replace_ground(new).unwrap();

        assert_eq!(*session.ground().unwrap(), new);
        // Readers holding the old value keep a complete copy.
        assert_eq!(old.elevation_m(), 95.0);
    }

    #[test]
    fn concurrent_adjustments_are_not_lost() {
        let session = session();
        let engine = Arc::new(ScriptedEngine::default());

        let writer = {
            let session = session.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    session
                        .with_clock(|clock| clock.adjust_units(TimeUnit::Second, 1))
                        .unwrap()
                        .unwrap();
                }
            })
        };
        for _ in 0..50 {
            session.refresh(engine.as_ref()).unwrap();
        }
        writer.join().unwrap();

        assert_eq!(session.snapshot().unwrap().displacement, Duration::seconds(200));
    }

    struct Silent;

    impl Notify for Silent {
        fn notify(&self, _summary: &str) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn refresh_loop_stops_on_signal() {
        let session = session();
        let engine = Arc::new(ScriptedEngine::default());
        let (worker, join) = session.spawn_refresh(
            &Handle::current(),
            engine.clone(),
            Arc::new(Silent),
            std::time::Duration::from_millis(5),
        );

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        worker.stop();
        join.await.unwrap().unwrap();
        assert!(!engine.seen.lock().unwrap().is_empty());
    }

    struct SlowEngine(ScriptedEngine);

    impl Propagator for SlowEngine {
        fn position(
            &self,
            satellite: &Satellite,
            station: &GroundStation,
            at: DateTime<Utc>,
        ) -> Result<Position, PredictError> {
            thread::sleep(std::time::Duration::from_millis(200));
            self.0.position(satellite, station, at)
        }
    }

    impl PassPredictor for SlowEngine {
        fn next_pass(
            &self,
            satellite: &Satellite,
            station: &GroundStation,
            at: DateTime<Utc>,
        ) -> Result<PassWindow, PredictError> {
            self.0.next_pass(satellite, station, at)
        }
    }

    #[tokio::test]
    async fn slow_tick_does_not_stall_the_runtime() {
        let session = session();
        let engine = Arc::new(SlowEngine(ScriptedEngine::default()));
        let (worker, join) = session.spawn_refresh(
            &Handle::current(),
            engine.clone(),
            Arc::new(Silent),
            std::time::Duration::from_millis(5),
        );

        // Single-threaded runtime: this timer only fires on time if the tick
        // runs elsewhere.
        let started = std::time::Instant::now();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(started.elapsed() < std::time::Duration::from_millis(150));

        worker.stop();
        join.await.unwrap().unwrap();
        assert!(!engine.0.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_loop_dies_on_failure() {
        let session = session();
        let engine = Arc::new(ScriptedEngine {
            fail_position: true,
            ..Default::default()
        });
        let (_worker, join) = session.spawn_refresh(
            &Handle::current(),
            engine,
            Arc::new(Silent),
            std::time::Duration::from_millis(5),
        );

        let result = join.await.unwrap();
        assert!(matches!(result, Err(TrackerError::Predict(_))));
    }
}
