use grandprix::core::competitor::{CompetitorPars, CompetitorStatus};
use grandprix::core::events::{EventKind, SessionEvent, SessionStatus};
use grandprix::core::handle_race::create_rng;
use grandprix::core::race::{Race, RacePars};
use grandprix::core::strategy::{SegmentPars, StrategyPars};
use grandprix::core::tyre::TyreCompound;
use grandprix::core::weather::{WeatherChange, WeatherCondition};
use grandprix::post::points::MAX_POINTS_PER_RACE;
use grandprix::post::race_result::RaceResult;
use grandprix::pre::sim_constants::SimConstants;

fn race_pars(tot_no_laps: u32) -> RacePars {
    RacePars {
        race_id: 1,
        circuit_name: "Testring".to_owned(),
        season: 2024,
        tot_no_laps,
        weather_quali: WeatherCondition::Dry,
        weather_race: WeatherCondition::Dry,
        weather_changes: vec![],
        grid: None,
    }
}

fn entry(driver_id: u32) -> CompetitorPars {
    CompetitorPars {
        driver_id,
        team_id: (driver_id + 1) / 2,
        name: format!("Driver {}", driver_id),
        initials: String::new(),
        skill: 55 + (driver_id * 7 % 40) as u8,
        experience: 50 + (driver_id * 3 % 40) as u8,
        consistency: 75,
        aggression: 40 + (driver_id * 5 % 50) as u8,
        components: vec![],
        mechanics: vec![],
        qualifying_tyre: None,
        strategy: None,
    }
}

fn strategy(segments: &[(&str, i64)], heavy_rain_strategy: &str) -> StrategyPars {
    StrategyPars {
        name: None,
        segments: segments
            .iter()
            .map(|&(tyre, laps)| SegmentPars {
                tyre: tyre.to_owned(),
                laps,
            })
            .collect(),
        rain_strategy: "continue".to_owned(),
        heavy_rain_strategy: heavy_rain_strategy.to_owned(),
        dry_strategy: "continue".to_owned(),
    }
}

fn dry_constants() -> SimConstants {
    SimConstants {
        weather_change_probability: 0.0,
        ..SimConstants::default()
    }
}

fn pit_events(events: &[SessionEvent], driver_id: u32) -> Vec<&SessionEvent> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::PitStop && e.driver_id == Some(driver_id))
        .collect()
}

#[test]
fn full_field_without_strategies_runs_on_hard_tyres() {
    let mut rng = create_rng(Some(2024));
    let entries: Vec<CompetitorPars> = (1..=20).map(entry).collect();
    let mut race = Race::new(&race_pars(50), &entries, &[], &dry_constants()).unwrap();

    for competitor in race.competitors.iter() {
        assert_eq!(competitor.tyre.compound, TyreCompound::Hard);
    }

    race.simulate_race(&mut rng);
    let result = RaceResult::assemble(&race, &mut rng);

    assert_eq!(result.classification.len(), 20);
    let positions: Vec<u32> = result.classification.iter().map(|r| r.position).collect();
    assert_eq!(positions, (1..=20).collect::<Vec<u32>>());

    if result.status != SessionStatus::AllRetired {
        let winners = result
            .classification
            .iter()
            .filter(|r| r.position == 1 && !r.dnf)
            .count();
        assert_eq!(winners, 1);
    }

    assert!(race
        .lap_records
        .iter()
        .all(|r| r.compound == TyreCompound::Hard));
}

#[test]
fn three_stop_plan_pits_twice() {
    for seed in 0..10 {
        let mut rng = create_rng(Some(seed));
        let mut entries: Vec<CompetitorPars> = (1..=6).map(entry).collect();
        entries[0].strategy = Some(strategy(
            &[("soft", 10), ("medium", 20), ("hard", 20)],
            "continue",
        ));

        let mut race = Race::new(&race_pars(50), &entries, &[], &dry_constants()).unwrap();
        race.simulate_race(&mut rng);

        let competitor = race
            .competitors
            .iter()
            .find(|c| c.driver_id == 1)
            .unwrap();
        if competitor.status == CompetitorStatus::Dnf {
            continue;
        }

        let pits = pit_events(&race.events, 1);
        assert_eq!(pits.len(), 2, "seed {}", seed);
        assert!(pits[0].lap >= 10);
        assert!(pits[1].lap >= 30);
        assert_eq!(competitor.pit_stops, 2);
        assert_eq!(competitor.tyre.compound, TyreCompound::Hard);
    }
}

#[test]
fn heavy_rain_forces_a_single_stop_in_the_same_lap() {
    let change_lap = 8;
    let mut rng = create_rng(Some(77));

    let mut pars = race_pars(30);
    pars.weather_changes = vec![WeatherChange {
        lap: change_lap,
        from: WeatherCondition::Dry,
        to: WeatherCondition::HeavyRain,
        probability: 1.0,
    }];

    let mut entries: Vec<CompetitorPars> = (1..=4).map(entry).collect();
    entries[0].strategy = Some(strategy(&[("soft", 30)], "immediate_pit"));

    let mut race = Race::new(&pars, &entries, &[], &dry_constants()).unwrap();
    race.simulate_race(&mut rng);

    let competitor = race
        .competitors
        .iter()
        .find(|c| c.driver_id == 1)
        .unwrap();
    if competitor.dnf_lap.map_or(false, |lap| lap <= change_lap) {
        return;
    }

    let weather_event = race
        .events
        .iter()
        .find(|e| e.kind == EventKind::Weather)
        .unwrap();
    assert_eq!(weather_event.lap, change_lap);

    let forced: Vec<&SessionEvent> = pit_events(&race.events, 1)
        .into_iter()
        .filter(|e| e.description.contains("weather change"))
        .collect();
    assert_eq!(forced.len(), 1);
    assert_eq!(forced[0].lap, change_lap);
    assert!(forced[0].description.contains("extreme_wet"));

    let record = race
        .lap_records
        .iter()
        .find(|r| r.driver_id == 1 && r.lap == change_lap)
        .unwrap();
    assert!(record.pitted);
    assert_eq!(record.compound, TyreCompound::ExtremeWet);
}

#[test]
fn wear_is_reset_by_pit_stops() {
    let mut rng = create_rng(Some(5));
    let mut entries: Vec<CompetitorPars> = (1..=8).map(entry).collect();
    for entry in entries.iter_mut().take(4) {
        entry.strategy = Some(strategy(
            &[("soft", 8), ("medium", 12), ("soft", 8), ("hard", 22)],
            "continue",
        ));
    }

    let mut race = Race::new(&race_pars(50), &entries, &[], &dry_constants()).unwrap();
    race.simulate_race(&mut rng);

    // post-lap wear is bounded by a single lap on the new set
    for record in race.lap_records.iter().filter(|r| r.pitted) {
        let max_wear = record.compound.wear_rate(WeatherCondition::Dry) * (4.0 / 3.0) * 1.15;
        assert!(record.wear <= max_wear + 1e-9);
    }

    // within a stint wear never decreases
    for driver_id in 1..=8 {
        let records: Vec<_> = race
            .lap_records
            .iter()
            .filter(|r| r.driver_id == driver_id)
            .collect();
        for pair in records.windows(2) {
            assert!(pair[1].racetime > pair[0].racetime);
            if !pair[1].pitted {
                assert!(pair[1].wear >= pair[0].wear);
            }
        }
    }
}

#[test]
fn retired_cars_stay_silent() {
    let sim_constants = SimConstants {
        max_failure_risk: 0.05,
        early_lap_damping: 1.0,
        ..dry_constants()
    };

    for seed in 0..5 {
        let mut rng = create_rng(Some(seed));
        let mut entries: Vec<CompetitorPars> = (1..=10).map(entry).collect();
        for entry in entries.iter_mut() {
            entry.components = vec![grandprix::core::attributes::CarComponent {
                component_type: grandprix::core::attributes::ComponentType::Brakes,
                strength: 60,
                reliability: 2,
            }];
        }

        let mut race = Race::new(&race_pars(60), &entries, &[], &sim_constants).unwrap();
        race.simulate_race(&mut rng);

        for competitor in race.competitors.iter() {
            let dnf_lap = match competitor.dnf_lap {
                Some(lap) => lap,
                None => continue,
            };

            assert!(race
                .events
                .iter()
                .filter(|e| e.driver_id == Some(competitor.driver_id))
                .all(|e| e.lap <= dnf_lap));
            assert!(race
                .events
                .iter()
                .filter(|e| e.driver_id == Some(competitor.driver_id) && e.lap == dnf_lap)
                .all(|e| e.kind == EventKind::Dnf
                    || e.kind == EventKind::Spin
                    || e.kind == EventKind::OffTrack
                    || e.kind == EventKind::FastLap));
            assert!(race
                .lap_records
                .iter()
                .filter(|r| r.driver_id == competitor.driver_id)
                .all(|r| r.lap < dnf_lap));
        }
    }
}

#[test]
fn points_are_bounded_and_dnfs_score_nothing() {
    for seed in 0..10 {
        let mut rng = create_rng(Some(seed));
        let entries: Vec<CompetitorPars> = (1..=20).map(entry).collect();
        let sim_constants = SimConstants {
            max_failure_risk: 0.01 + seed as f64 * 0.002,
            ..SimConstants::default()
        };

        let mut race = Race::new(&race_pars(40), &entries, &[], &sim_constants).unwrap();
        race.simulate_race(&mut rng);
        let result = RaceResult::assemble(&race, &mut rng);

        assert!(result.total_points() <= MAX_POINTS_PER_RACE);
        assert!(result.classification.iter().filter(|r| r.fastest_lap).count() <= 1);
        for row in result.classification.iter().filter(|r| r.dnf) {
            assert_eq!(row.points, 0);
            assert!(!row.fastest_lap);
        }
    }
}
