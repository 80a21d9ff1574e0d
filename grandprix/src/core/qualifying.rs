use crate::core::attributes::{car_performance, qualifying_car_effect, qualifying_driver_effect};
use crate::core::competitor::{check_entries, CompetitorPars};
use crate::core::events::{EventKind, SessionEvent, SessionStatus};
use crate::core::tyre::{default_for, TyreCompound};
use crate::core::weather::WeatherCondition;
use crate::error::SimError;
use crate::pre::sim_constants::SimConstants;
use helpers::general::{argsort, format_laptime, SortOrder};
use log::{debug, info};
use rand::Rng;
use serde::Serialize;

/// QualifyingTime contains the lap times of one driver in every stage they took part in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualifyingTime {
    pub driver_id: u32,
    pub compound: TyreCompound,
    pub position: u32,
    pub q1: f64,
    pub q2: Option<f64>,
    pub q3: Option<f64>,
}

/// QualifyingResult contains the starting grid as list of driver ids (index 0 is pole position).
#[derive(Debug, Clone, Serialize)]
pub struct QualifyingResult {
    pub status: SessionStatus,
    pub weather: WeatherCondition,
    pub grid: Vec<u32>,
    pub times: Vec<QualifyingTime>,
    pub events: Vec<SessionEvent>,
}

impl QualifyingResult {
    pub fn pole(&self) -> Option<u32> {
        self.grid.first().copied()
    }

    /// print_grid prints the starting grid together with the best time of every stage.
    pub fn print_grid(&self) {
        println!("RESULT: Qualifying ({}, {:?})", self.weather, self.status);
        println!(
            "{:>3}  {:>6} {:<12} {:>10} {:>10} {:>10}",
            "pos", "driver", "tyre", "q1", "q2", "q3"
        );

        for time in self.times.iter() {
            println!(
                "{:>3}  {:>6} {:<12} {:>10} {:>10} {:>10}",
                time.position,
                time.driver_id,
                time.compound.as_str(),
                format_laptime(time.q1),
                time.q2.map_or_else(|| "-".to_owned(), format_laptime),
                time.q3.map_or_else(|| "-".to_owned(), format_laptime)
            );
        }
    }
}

/// calc_quali_laptime returns the time of a single push lap.
fn calc_quali_laptime<R: Rng + ?Sized>(
    entry: &CompetitorPars,
    compound: TyreCompound,
    weather: WeatherCondition,
    sim_constants: &SimConstants,
    rng: &mut R,
) -> f64 {
    let car = car_performance(&entry.components);

    let mut laptime = sim_constants.quali_base_time + compound.qualifying_offset(weather)
        - qualifying_driver_effect(entry.skill, entry.experience)
        - qualifying_car_effect(car.strength);

    // unsuitable tyres make the lap a lottery
    match weather {
        WeatherCondition::LightRain if compound.is_dry() => laptime += rng.gen_range(2.0..5.0),
        WeatherCondition::HeavyRain if compound != TyreCompound::ExtremeWet => {
            laptime += rng.gen_range(5.0..10.0)
        }
        _ => {}
    }

    if !weather.is_dry() {
        laptime += rng.gen_range(-1.0..3.0);
    }

    laptime + rng.gen_range(-0.5..0.5)
}

/// Helper for one elimination stage. Returns the sorted indices of all participants.
fn sort_stage(participants: &[usize], laptimes: &[f64]) -> Vec<usize> {
    let stage_times: Vec<f64> = participants.iter().map(|&idx| laptimes[idx]).collect();
    argsort(&stage_times, SortOrder::Ascending)
        .into_iter()
        .map(|i| participants[i])
        .collect()
}

/// simulate_qualifying runs the three knockout stages. The slowest cars drop out after Q1 and Q2
/// (cut-offs configurable, default 15 and 10), the remaining ten decide the top of the grid in Q3.
/// Stages with fewer participants than the cut-off simply carry everyone forward.
pub fn simulate_qualifying<R: Rng + ?Sized>(
    entries: &[CompetitorPars],
    weather: WeatherCondition,
    sim_constants: &SimConstants,
    rng: &mut R,
) -> Result<QualifyingResult, SimError> {
    check_entries(entries)?;

    if entries.is_empty() {
        info!("Qualifying has no participants");
        return Ok(QualifyingResult {
            status: SessionStatus::NoParticipants,
            weather,
            grid: Vec::new(),
            times: Vec::new(),
            events: Vec::new(),
        });
    }

    let mut events = Vec::new();
    let mut compounds = Vec::with_capacity(entries.len());
    for entry in entries.iter() {
        compounds.push(entry.qualifying_compound()?.unwrap_or_else(|| default_for(weather)));
    }

    // Q1 --------------------------------------------------------------------------------------
    let q1_times: Vec<f64> = entries
        .iter()
        .zip(compounds.iter())
        .map(|(entry, &compound)| calc_quali_laptime(entry, compound, weather, sim_constants, rng))
        .collect();

    let all: Vec<usize> = (0..entries.len()).collect();
    let q1_order = sort_stage(&all, &q1_times);
    announce_stage(1, &q1_order, entries, &q1_times, &mut events);

    let no_q2 = q1_order.len().min(sim_constants.q1_cutoff);
    let (q2_part, q1_out) = q1_order.split_at(no_q2);
    announce_eliminations(1, q1_out, no_q2, entries, &mut events);

    // Q2 --------------------------------------------------------------------------------------
    let mut q2_times = vec![f64::INFINITY; entries.len()];
    for &idx in q2_part.iter() {
        q2_times[idx] = q1_times[idx] - rng.gen_range(0.05..0.6);
    }

    let q2_order = sort_stage(q2_part, &q2_times);
    announce_stage(2, &q2_order, entries, &q2_times, &mut events);

    let no_q3 = q2_order.len().min(sim_constants.q2_cutoff);
    let (q3_part, q2_out) = q2_order.split_at(no_q3);
    announce_eliminations(2, q2_out, no_q3, entries, &mut events);

    // Q3 --------------------------------------------------------------------------------------
    let mut q3_times = vec![f64::INFINITY; entries.len()];
    for &idx in q3_part.iter() {
        q3_times[idx] = q2_times[idx] - rng.gen_range(0.05..0.4);
    }

    let q3_order = sort_stage(q3_part, &q3_times);
    announce_stage(3, &q3_order, entries, &q3_times, &mut events);

    if let Some(&pole_idx) = q3_order.first() {
        events.push(SessionEvent::new(
            3,
            EventKind::Pole,
            format!(
                "{} takes pole position with {}",
                entries[pole_idx].name,
                format_laptime(q3_times[pole_idx])
            ),
            Some(entries[pole_idx].driver_id),
        ));
    }

    // final grid: Q3 order, then Q2 and Q1 eliminations in their stage order
    let grid_idxs: Vec<usize> = q3_order
        .iter()
        .chain(q2_out.iter())
        .chain(q1_out.iter())
        .copied()
        .collect();

    let times = grid_idxs
        .iter()
        .enumerate()
        .map(|(pos, &idx)| QualifyingTime {
            driver_id: entries[idx].driver_id,
            compound: compounds[idx],
            position: pos as u32 + 1,
            q1: q1_times[idx],
            q2: Some(q2_times[idx]).filter(|t| t.is_finite()),
            q3: Some(q3_times[idx]).filter(|t| t.is_finite()),
        })
        .collect();

    info!(
        "Qualifying finished ({} participants, {} conditions)",
        entries.len(),
        weather
    );

    Ok(QualifyingResult {
        status: SessionStatus::Completed,
        weather,
        grid: grid_idxs.iter().map(|&idx| entries[idx].driver_id).collect(),
        times,
        events,
    })
}

fn announce_stage(
    stage: u32,
    order: &[usize],
    entries: &[CompetitorPars],
    laptimes: &[f64],
    events: &mut Vec<SessionEvent>,
) {
    for (pos, &idx) in order.iter().enumerate() {
        debug!(
            "Q{} P{} {} {}",
            stage,
            pos + 1,
            entries[idx].name,
            format_laptime(laptimes[idx])
        );
        events.push(SessionEvent::new(
            stage,
            EventKind::LapTime,
            format!(
                "Q{}: {} sets a {} (P{})",
                stage,
                entries[idx].name,
                format_laptime(laptimes[idx]),
                pos + 1
            ),
            Some(entries[idx].driver_id),
        ));
    }
}

fn announce_eliminations(
    stage: u32,
    eliminated: &[usize],
    no_advancing: usize,
    entries: &[CompetitorPars],
    events: &mut Vec<SessionEvent>,
) {
    for (i, &idx) in eliminated.iter().enumerate() {
        events.push(SessionEvent::new(
            stage,
            EventKind::Elimination,
            format!(
                "{} is eliminated in Q{} and starts P{}",
                entries[idx].name,
                stage,
                no_advancing + i + 1
            ),
            Some(entries[idx].driver_id),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn entry(driver_id: u32, skill: u8) -> CompetitorPars {
        CompetitorPars {
            driver_id,
            team_id: (driver_id + 1) / 2,
            name: format!("Driver {}", driver_id),
            initials: format!("D{:02}", driver_id),
            skill,
            experience: skill,
            consistency: 70,
            aggression: 50,
            components: vec![],
            mechanics: vec![],
            qualifying_tyre: None,
            strategy: None,
        }
    }

    fn field(n: u32) -> Vec<CompetitorPars> {
        (1..=n).map(|i| entry(i, 50 + (i % 40) as u8)).collect()
    }

    fn count(events: &[SessionEvent], kind: EventKind, stage: u32) -> usize {
        events
            .iter()
            .filter(|e| e.kind == kind && e.lap == stage)
            .count()
    }

    #[test]
    fn grid_is_a_permutation_of_all_entrants() {
        let sim_constants = SimConstants::default();
        for n in [1, 3, 10, 12, 15, 16, 20, 24] {
            let mut rng = ChaCha8Rng::seed_from_u64(n as u64);
            let entries = field(n);
            let result =
                simulate_qualifying(&entries, WeatherCondition::Dry, &sim_constants, &mut rng)
                    .unwrap();

            assert_eq!(result.status, SessionStatus::Completed);
            assert_eq!(result.grid.len(), n as usize);
            let ids: HashSet<u32> = result.grid.iter().copied().collect();
            assert_eq!(ids, (1..=n).collect::<HashSet<u32>>());
        }
    }

    #[test]
    fn stage_sizes_shrink() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let sim_constants = SimConstants::default();
        let result =
            simulate_qualifying(&field(20), WeatherCondition::Dry, &sim_constants, &mut rng)
                .unwrap();

        assert_eq!(count(&result.events, EventKind::LapTime, 1), 20);
        assert_eq!(count(&result.events, EventKind::LapTime, 2), 15);
        assert_eq!(count(&result.events, EventKind::LapTime, 3), 10);
        assert_eq!(count(&result.events, EventKind::Elimination, 1), 5);
        assert_eq!(count(&result.events, EventKind::Elimination, 2), 5);
        assert_eq!(count(&result.events, EventKind::Pole, 3), 1);

        let pole = result.pole().unwrap();
        let pole_event = result
            .events
            .iter()
            .find(|e| e.kind == EventKind::Pole)
            .unwrap();
        assert_eq!(pole_event.driver_id, Some(pole));

        for time in result.times.iter() {
            match time.position {
                1..=10 => assert!(time.q3.is_some()),
                11..=15 => assert!(time.q2.is_some() && time.q3.is_none()),
                _ => assert!(time.q2.is_none()),
            }
            if let (Some(q2), Some(q3)) = (time.q2, time.q3) {
                assert!(q3 < q2 && q2 < time.q1);
            }
        }
    }

    #[test]
    fn small_field_carries_everyone_forward() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let sim_constants = SimConstants::default();
        let result =
            simulate_qualifying(&field(6), WeatherCondition::LightRain, &sim_constants, &mut rng)
                .unwrap();

        assert_eq!(count(&result.events, EventKind::LapTime, 3), 6);
        assert_eq!(count(&result.events, EventKind::Elimination, 1), 0);
        assert!(result.times.iter().all(|t| t.compound == TyreCompound::Wet));
    }

    #[test]
    fn no_participants_is_not_an_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = simulate_qualifying(
            &[],
            WeatherCondition::Dry,
            &SimConstants::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(result.status, SessionStatus::NoParticipants);
        assert!(result.grid.is_empty());
        assert!(result.events.is_empty());
    }

    #[test]
    fn invalid_qualifying_tyre_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut entries = field(3);
        entries[1].qualifying_tyre = Some("slick".to_owned());
        assert!(simulate_qualifying(
            &entries,
            WeatherCondition::Dry,
            &SimConstants::default(),
            &mut rng
        )
        .is_err());
    }

    #[test]
    fn better_drivers_qualify_ahead_on_average() {
        let sim_constants = SimConstants::default();
        let entries = vec![entry(1, 95), entry(2, 40)];
        let mut ahead = 0;
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result =
                simulate_qualifying(&entries, WeatherCondition::Dry, &sim_constants, &mut rng)
                    .unwrap();
            if result.pole() == Some(1) {
                ahead += 1;
            }
        }
        assert_eq!(ahead, 50);
    }
}
