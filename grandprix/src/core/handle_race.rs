use crate::core::events::{SessionEvent, SessionStatus, SessionType};
use crate::core::qualifying::{simulate_qualifying, QualifyingResult};
use crate::core::race::Race;
use crate::core::test_session::{simulate_test_session, TestSessionResult};
use crate::error::SimError;
use crate::interfaces::live_interface::LiveUpdate;
use crate::interfaces::session_store::{SessionRecord, SessionStore};
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::SimPars;
use crate::pre::sim_constants::SimConstants;
use crate::pre::sim_opts::SessionSelection;
use flume::Sender;
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Random number generator of all simulations. Seeded runs are reproducible.
pub type SimRng = ChaCha8Rng;

pub fn create_rng(seed: Option<u64>) -> SimRng {
    match seed {
        Some(seed) => SimRng::seed_from_u64(seed),
        None => SimRng::from_entropy(),
    }
}

/// WeekendResult contains the results of all simulated sessions.
#[derive(Debug, Clone, Default)]
pub struct WeekendResult {
    pub qualifying: Option<QualifyingResult>,
    pub race: Option<RaceResult>,
    pub test_session: Option<TestSessionResult>,
}

/// Wrapper around the optional live channel. A listener that hangs up does not stop the
/// simulation, updates are dropped from then on.
struct LiveSender<'a> {
    tx: Option<&'a Sender<LiveUpdate>>,
}

impl<'a> LiveSender<'a> {
    fn new(tx: Option<&'a Sender<LiveUpdate>>) -> Self {
        LiveSender { tx }
    }

    fn is_active(&self) -> bool {
        self.tx.is_some()
    }

    fn send(&mut self, update: LiveUpdate) {
        if let Some(tx) = self.tx {
            if tx.send(update).is_err() {
                warn!("Live listener disconnected, continuing without live updates");
                self.tx = None;
            }
        }
    }

    fn send_events(&mut self, session_type: SessionType, events: &[SessionEvent]) {
        for event in events.iter() {
            self.send(LiveUpdate::Event {
                session_type,
                event: event.to_owned(),
            });
        }
    }
}

/// handle_qualifying simulates the qualifying of the weekend.
pub fn handle_qualifying<R: Rng + ?Sized>(
    sim_pars: &SimPars,
    sim_constants: &SimConstants,
    rng: &mut R,
    tx: Option<&Sender<LiveUpdate>>,
) -> Result<QualifyingResult, SimError> {
    info!(
        "Simulating qualifying at {} {} ({} cars)",
        sim_pars.race_pars.circuit_name,
        sim_pars.race_pars.season,
        sim_pars.entries.len()
    );

    let result = simulate_qualifying(
        &sim_pars.entries,
        sim_pars.race_pars.weather_quali,
        sim_constants,
        rng,
    )?;

    let mut live = LiveSender::new(tx);
    live.send_events(SessionType::Qualifying, &result.events);
    live.send(LiveUpdate::Finished {
        session_type: SessionType::Qualifying,
        status: result.status,
    });

    Ok(result)
}

/// handle_race creates and simulates a race on the basis of the inserted parameters, and returns
/// the results for post-processing. If a sender is inserted, the events are streamed lap by lap.
pub fn handle_race<R: Rng + ?Sized>(
    sim_pars: &SimPars,
    grid: &[u32],
    sim_constants: &SimConstants,
    rng: &mut R,
    tx: Option<&Sender<LiveUpdate>>,
) -> Result<RaceResult, SimError> {
    let mut race = Race::new(&sim_pars.race_pars, &sim_pars.entries, grid, sim_constants)?;
    info!(
        "Simulating race at {} {} ({} cars, {} laps)",
        race.circuit_name,
        race.season,
        race.competitors.len(),
        race.tot_no_laps
    );

    let mut live = LiveSender::new(tx);
    live.send_events(SessionType::Race, &race.events);

    while !race.get_all_finished() {
        let new_events = race.simulate_lap(rng).to_vec();

        if live.is_active() {
            live.send_events(SessionType::Race, &new_events);
            live.send(LiveUpdate::LapCompleted {
                lap: race.cur_lap,
                tot_no_laps: race.tot_no_laps,
                leader: race
                    .get_active_ranked()
                    .first()
                    .map(|&idx| race.competitors[idx].driver_id),
            });
        }
    }

    let result = RaceResult::assemble(&race, rng);
    match result.status {
        SessionStatus::Completed => {}
        SessionStatus::AllRetired => warn!("All cars retired, the race has no finisher"),
        SessionStatus::NoParticipants => warn!("The race has no participants"),
    }

    live.send(LiveUpdate::Finished {
        session_type: SessionType::Race,
        status: result.status,
    });

    Ok(result)
}

/// handle_test_session runs the test session of the parameter file with the car of its driver.
pub fn handle_test_session<R: Rng + ?Sized>(
    sim_pars: &SimPars,
    rng: &mut R,
) -> Result<TestSessionResult, SimError> {
    let pars = sim_pars
        .test_session
        .as_ref()
        .ok_or_else(|| SimError::invalid("the parameter file contains no test session"))?;
    let driver = sim_pars
        .entries
        .iter()
        .find(|entry| entry.driver_id == pars.driver_id)
        .ok_or(SimError::UnknownDriver(pars.driver_id))?;

    info!(
        "Simulating test session of {} ({} laps on {})",
        driver.name, pars.total_laps, pars.initial_tyre
    );
    simulate_test_session(driver, pars, rng)
}

fn commit_qualifying(
    store: &dyn SessionStore,
    race_id: u32,
    result: &QualifyingResult,
) -> Result<(), SimError> {
    store.commit(
        race_id,
        SessionRecord::Qualifying {
            events: result.events.to_owned(),
            grid: result.times.to_owned(),
        },
    )
}

fn commit_race(store: &dyn SessionStore, result: &RaceResult) -> Result<(), SimError> {
    store.commit(
        result.race_id,
        SessionRecord::Race {
            events: result.events.to_owned(),
            classification: result.classification.to_owned(),
        },
    )
}

/// handle_sessions simulates the selected sessions of a weekend. The results of every session are
/// committed to the store (if inserted) once the session is complete. A race without qualifying
/// starts from the grid in the parameters, else from the stored qualifying, else in entry order.
pub fn handle_sessions<R: Rng + ?Sized>(
    selection: SessionSelection,
    sim_pars: &SimPars,
    sim_constants: &SimConstants,
    rng: &mut R,
    tx: Option<&Sender<LiveUpdate>>,
    store: Option<&dyn SessionStore>,
) -> Result<WeekendResult, SimError> {
    let race_id = sim_pars.race_pars.race_id;
    let mut weekend = WeekendResult::default();

    if selection == SessionSelection::Test {
        weekend.test_session = Some(handle_test_session(sim_pars, rng)?);
        return Ok(weekend);
    }

    if selection != SessionSelection::Race {
        let quali = handle_qualifying(sim_pars, sim_constants, rng, tx)?;
        if let Some(store) = store {
            commit_qualifying(store, race_id, &quali)?;
        }
        weekend.qualifying = Some(quali);
    }

    if selection != SessionSelection::Qualifying {
        let grid = match (&weekend.qualifying, &sim_pars.race_pars.grid, store) {
            (Some(quali), _, _) => quali.grid.to_owned(),
            (None, Some(grid), _) => grid.to_owned(),
            (None, None, Some(store)) => store.starting_grid(race_id)?.unwrap_or_default(),
            (None, None, None) => Vec::new(),
        };

        let race = handle_race(sim_pars, &grid, sim_constants, rng, tx)?;
        if let Some(store) = store {
            commit_race(store, &race)?;
        }
        weekend.race = Some(race);
    }

    Ok(weekend)
}

/// spawn_sessions runs `handle_sessions` on a dedicated worker thread such that the caller is not
/// blocked. Live updates are sent through `tx` while the sessions are simulated.
pub fn spawn_sessions(
    selection: SessionSelection,
    sim_pars: SimPars,
    sim_constants: SimConstants,
    seed: Option<u64>,
    tx: Option<Sender<LiveUpdate>>,
    store: Option<Arc<dyn SessionStore>>,
) -> JoinHandle<Result<WeekendResult, SimError>> {
    thread::spawn(move || {
        let mut rng = create_rng(seed);
        handle_sessions(
            selection,
            &sim_pars,
            &sim_constants,
            &mut rng,
            tx.as_ref(),
            store.as_deref(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::competitor::CompetitorPars;
    use crate::core::race::RacePars;
    use crate::core::weather::WeatherCondition;
    use crate::interfaces::session_store::MemoryStore;

    fn sim_pars(no_entries: u32) -> SimPars {
        SimPars {
            race_pars: RacePars {
                race_id: 11,
                circuit_name: "Testring".to_owned(),
                season: 2024,
                tot_no_laps: 12,
                weather_quali: WeatherCondition::Dry,
                weather_race: WeatherCondition::Dry,
                weather_changes: vec![],
                grid: None,
            },
            entries: (1..=no_entries)
                .map(|driver_id| CompetitorPars {
                    driver_id,
                    team_id: (driver_id + 1) / 2,
                    name: format!("Driver {}", driver_id),
                    initials: String::new(),
                    skill: 70,
                    experience: 70,
                    consistency: 70,
                    aggression: 50,
                    components: vec![],
                    mechanics: vec![],
                    qualifying_tyre: None,
                    strategy: None,
                })
                .collect(),
            test_session: None,
        }
    }

    /// Driver ids of a race result sorted by their starting position.
    fn starting_order(race: &RaceResult) -> Vec<u32> {
        let mut rows: Vec<_> = race.classification.iter().collect();
        rows.sort_by_key(|row| row.grid_position);
        rows.iter().map(|row| row.driver_id).collect()
    }

    #[test]
    fn seeded_weekends_are_reproducible() {
        let pars = sim_pars(6);
        let sim_constants = SimConstants::default();

        let run = |seed| {
            let mut rng = create_rng(Some(seed));
            handle_sessions(
                SessionSelection::Weekend,
                &pars,
                &sim_constants,
                &mut rng,
                None,
                None,
            )
            .unwrap()
        };

        let (a, b) = (run(3), run(3));
        let (race_a, race_b) = (a.race.unwrap(), b.race.unwrap());
        assert_eq!(race_a.classification, race_b.classification);
        assert_eq!(race_a.events, race_b.events);
        assert_eq!(a.qualifying.unwrap().grid, b.qualifying.unwrap().grid);
    }

    #[test]
    fn race_starts_from_qualifying_order() {
        let pars = sim_pars(6);
        let mut rng = create_rng(Some(8));
        let weekend = handle_sessions(
            SessionSelection::Weekend,
            &pars,
            &SimConstants::default(),
            &mut rng,
            None,
            None,
        )
        .unwrap();

        let grid = weekend.qualifying.unwrap().grid;
        let race = weekend.race.unwrap();
        let start = race
            .events
            .iter()
            .find(|e| e.kind == crate::core::events::EventKind::Start);
        assert!(start.is_some());
        assert_eq!(starting_order(&race), grid);
    }

    #[test]
    fn worker_streams_updates_and_commits_once() {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn SessionStore> = store.clone();
        let (tx, rx) = flume::unbounded();

        let handle = spawn_sessions(
            SessionSelection::Weekend,
            sim_pars(4),
            SimConstants::default(),
            Some(21),
            Some(tx),
            Some(shared),
        );

        let updates: Vec<LiveUpdate> = rx.iter().collect();
        let weekend = handle.join().unwrap().unwrap();

        let finished = updates
            .iter()
            .filter(|u| matches!(u, LiveUpdate::Finished { .. }))
            .count();
        assert_eq!(finished, 2);
        let laps = updates
            .iter()
            .filter(|u| matches!(u, LiveUpdate::LapCompleted { .. }))
            .count();
        assert_eq!(laps as u32, weekend.race.as_ref().unwrap().tot_no_laps);

        assert_eq!(store.no_sessions().unwrap(), 2);
        let stored = store.load(11, SessionType::Race).unwrap().unwrap();
        assert_eq!(stored.events(), weekend.race.unwrap().events.as_slice());
        assert_eq!(
            store.starting_grid(11).unwrap().unwrap(),
            weekend.qualifying.unwrap().grid
        );
    }

    #[test]
    fn race_only_uses_stored_grid() {
        let store = MemoryStore::new();
        let pars = sim_pars(3);
        let mut rng = create_rng(Some(2));

        handle_sessions(
            SessionSelection::Qualifying,
            &pars,
            &SimConstants::default(),
            &mut rng,
            None,
            Some(&store),
        )
        .unwrap();
        let grid = store.starting_grid(11).unwrap().unwrap();

        let weekend = handle_sessions(
            SessionSelection::Race,
            &pars,
            &SimConstants::default(),
            &mut rng,
            None,
            Some(&store),
        )
        .unwrap();
        assert!(weekend.qualifying.is_none());
        assert_eq!(starting_order(&weekend.race.unwrap()), grid);
    }

    #[test]
    fn parameter_grid_beats_stored_grid() {
        let store = MemoryStore::new();
        let mut pars = sim_pars(4);
        let mut rng = create_rng(Some(6));

        handle_sessions(
            SessionSelection::Qualifying,
            &pars,
            &SimConstants::default(),
            &mut rng,
            None,
            Some(&store),
        )
        .unwrap();

        let mut grid = store.starting_grid(11).unwrap().unwrap();
        grid.reverse();
        pars.race_pars.grid = Some(grid.to_owned());

        let weekend = handle_sessions(
            SessionSelection::Race,
            &pars,
            &SimConstants::default(),
            &mut rng,
            None,
            Some(&store),
        )
        .unwrap();
        assert_eq!(starting_order(&weekend.race.unwrap()), grid);
    }

    #[test]
    fn race_without_any_grid_starts_in_entry_order() {
        let pars = sim_pars(5);
        let mut rng = create_rng(Some(13));
        let weekend = handle_sessions(
            SessionSelection::Race,
            &pars,
            &SimConstants::default(),
            &mut rng,
            None,
            None,
        )
        .unwrap();

        let race = weekend.race.unwrap();
        assert_eq!(starting_order(&race), vec![1, 2, 3, 4, 5]);
        assert!(race
            .classification
            .iter()
            .all(|row| row.grid_position == row.driver_id));
    }

    #[test]
    fn test_session_runs_alone_and_is_not_committed() {
        let store = MemoryStore::new();
        let mut pars = sim_pars(3);
        pars.test_session = Some(crate::core::test_session::TestSessionPars {
            driver_id: 2,
            total_laps: 15,
            initial_tyre: crate::core::tyre::TyreCompound::Medium,
            weather: WeatherCondition::Dry,
        });

        let mut rng = create_rng(Some(4));
        let weekend = handle_sessions(
            SessionSelection::Test,
            &pars,
            &SimConstants::default(),
            &mut rng,
            None,
            Some(&store),
        )
        .unwrap();

        assert!(weekend.qualifying.is_none() && weekend.race.is_none());
        let test_session = weekend.test_session.unwrap();
        assert_eq!(test_session.driver_id, 2);
        assert_eq!(test_session.laps.len(), 15);
        assert_eq!(store.no_sessions().unwrap(), 0);
    }

    #[test]
    fn test_session_needs_a_known_driver() {
        let mut pars = sim_pars(2);
        let mut rng = create_rng(Some(4));
        assert!(matches!(
            handle_test_session(&pars, &mut rng),
            Err(SimError::InvalidInput(_))
        ));

        pars.test_session = Some(crate::core::test_session::TestSessionPars {
            driver_id: 8,
            total_laps: 5,
            initial_tyre: crate::core::tyre::TyreCompound::Soft,
            weather: WeatherCondition::Dry,
        });
        assert_eq!(
            handle_test_session(&pars, &mut rng),
            Err(SimError::UnknownDriver(8))
        );
    }

    #[test]
    fn empty_weekend_is_not_an_error() {
        let mut rng = create_rng(Some(1));
        let weekend = handle_sessions(
            SessionSelection::Weekend,
            &sim_pars(0),
            &SimConstants::default(),
            &mut rng,
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            weekend.qualifying.unwrap().status,
            SessionStatus::NoParticipants
        );
        assert_eq!(weekend.race.unwrap().status, SessionStatus::NoParticipants);
    }
}
