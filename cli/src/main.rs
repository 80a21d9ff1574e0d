use anyhow::Context;
use clap::Parser;
use grandprix::core::handle_race::{create_rng, handle_sessions, spawn_sessions, WeekendResult};
use grandprix::error::SimError;
use grandprix::interfaces::live_interface::LiveUpdate;
use grandprix::interfaces::session_store::{MemoryStore, SessionStore};
use grandprix::post::race_result::{write_events_csv, RaceClassification};
use grandprix::post::standings::calc_driver_standings;
use grandprix::pre::read_sim_pars::{read_sim_constants, read_sim_pars, SimPars};
use grandprix::pre::sim_constants::SimConstants;
use grandprix::pre::sim_opts::{SessionSelection, SimOpts};
use log::{debug, info, LevelFilter};
use rand::RngCore;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// export_results writes the results of all simulated sessions as CSV files into `out_dir`.
fn export_results(weekend: &WeekendResult, out_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir).context(format!(
        "Failed to create output directory {}!",
        out_dir.display()
    ))?;

    if let Some(quali) = &weekend.qualifying {
        write_events_csv(&quali.events, &out_dir.join("qualifying_events.csv"))?;

        let path = out_dir.join("qualifying_times.csv");
        let mut wtr = csv::Writer::from_path(&path).context(format!(
            "Failed to create qualifying file {}!",
            path.display()
        ))?;
        for time in quali.times.iter() {
            wtr.serialize(time)
                .context("Failed to write qualifying time!")?;
        }
        wtr.flush()?;
    }

    if let Some(race) = &weekend.race {
        race.write_classification_csv(&out_dir.join("race_classification.csv"))?;
        race.write_lap_records_csv(&out_dir.join("race_laps.csv"))?;
        race.write_events_csv(&out_dir.join("race_events.csv"))?;
    }

    if let Some(test_session) = &weekend.test_session {
        let path = out_dir.join("test_laps.csv");
        let mut wtr = csv::Writer::from_path(&path).context(format!(
            "Failed to create test session file {}!",
            path.display()
        ))?;
        for lap in test_session.laps.iter() {
            wtr.serialize(lap).context("Failed to write test lap!")?;
        }
        wtr.flush()?;
    }

    info!("Results exported to {}", out_dir.display());
    Ok(())
}

/// print_weekend prints the results of all simulated sessions to the console output.
fn print_weekend(weekend: &WeekendResult) {
    if let Some(quali) = &weekend.qualifying {
        quali.print_grid();
    }
    if let Some(race) = &weekend.race {
        race.print_classification();
    }
    if let Some(test_session) = &weekend.test_session {
        test_session.print_laps();
    }
}

/// run_single simulates the selected sessions once. In live mode the simulation runs on a worker
/// thread and the event feed is printed while it arrives.
fn run_single(
    sim_opts: &SimOpts,
    sim_pars: &SimPars,
    sim_constants: &SimConstants,
) -> anyhow::Result<WeekendResult> {
    let store = Arc::new(MemoryStore::new());

    let weekend = if sim_opts.live {
        let (tx, rx) = flume::unbounded();
        let shared: Arc<dyn SessionStore> = store.clone();

        let handle = spawn_sessions(
            sim_opts.session,
            sim_pars.to_owned(),
            sim_constants.to_owned(),
            sim_opts.seed,
            Some(tx),
            Some(shared),
        );

        for update in rx.iter() {
            match update {
                LiveUpdate::Event {
                    session_type,
                    event,
                } => println!("{:<10} {}", session_type, event),
                LiveUpdate::LapCompleted {
                    lap,
                    tot_no_laps,
                    leader,
                } => debug!(
                    "Lap {}/{} completed, leader: {}",
                    lap,
                    tot_no_laps,
                    leader.map_or_else(|| "-".to_owned(), |id| id.to_string())
                ),
                LiveUpdate::Finished {
                    session_type,
                    status,
                } => info!("Session {} finished ({:?})", session_type, status),
            }
        }

        handle
            .join()
            .map_err(|_| anyhow::anyhow!("Simulation thread panicked!"))??
    } else {
        let mut rng = create_rng(sim_opts.seed);
        handle_sessions(
            sim_opts.session,
            sim_pars,
            sim_constants,
            &mut rng,
            None,
            Some(store.as_ref()),
        )?
    };

    debug!("{} session(s) committed", store.no_sessions()?);
    Ok(weekend)
}

/// run_batch simulates the selected sessions `no_sim_runs` times in parallel and prints the
/// average outcome per driver.
fn run_batch(
    sim_opts: &SimOpts,
    sim_pars: &SimPars,
    sim_constants: &SimConstants,
) -> anyhow::Result<()> {
    let base_seed = sim_opts
        .seed
        .unwrap_or_else(|| create_rng(None).next_u64());
    info!(
        "Running {} simulations in parallel (base seed {})",
        sim_opts.no_sim_runs, base_seed
    );

    let weekends = (0..sim_opts.no_sim_runs)
        .into_par_iter()
        .map(|run| {
            let mut rng = create_rng(Some(base_seed.wrapping_add(run as u64)));
            handle_sessions(
                sim_opts.session,
                sim_pars,
                sim_constants,
                &mut rng,
                None,
                None,
            )
        })
        .collect::<Result<Vec<WeekendResult>, SimError>>()?;

    let no_runs = weekends.len() as f64;

    let mut poles: HashMap<u32, u32> = HashMap::new();
    for pole in weekends
        .iter()
        .filter_map(|weekend| weekend.qualifying.as_ref())
        .filter_map(|quali| quali.pole())
    {
        *poles.entry(pole).or_insert(0) += 1;
    }

    let classifications: Vec<&[RaceClassification]> = weekends
        .iter()
        .filter_map(|weekend| weekend.race.as_ref())
        .map(|race| race.classification.as_slice())
        .collect();

    if classifications.is_empty() {
        println!("RESULT: Pole positions in {} runs", weekends.len());
        let mut poles: Vec<(u32, u32)> = poles.into_iter().collect();
        poles.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        for (driver_id, count) in poles.iter() {
            println!(
                "{:>6} {:>6.1}%",
                driver_id,
                *count as f64 / no_runs * 100.0
            );
        }
        return Ok(());
    }

    println!("RESULT: Average outcome of {} runs", weekends.len());
    println!(
        "{:>3}  {:<24} {:>8} {:>7} {:>7} {:>7} {:>7}",
        "pos", "driver", "avg pts", "win %", "pod %", "pole %", "dnf %"
    );
    for standing in calc_driver_standings(classifications) {
        println!(
            "{:>3}  {:<24} {:>8.2} {:>7.1} {:>7.1} {:>7.1} {:>7.1}",
            standing.position,
            standing.name,
            standing.points as f64 / no_runs,
            standing.wins as f64 / no_runs * 100.0,
            standing.podiums as f64 / no_runs * 100.0,
            *poles.get(&standing.driver_id).unwrap_or(&0) as f64 / no_runs * 100.0,
            standing.dnfs as f64 / no_runs * 100.0
        );
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    helpers::logger::init(if sim_opts.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    })
    .context("Failed to initialize the logger!")?;

    // get simulation parameters
    info!(
        "Reading simulation parameters from {}",
        sim_opts.parfile_path.display()
    );
    let sim_pars = read_sim_pars(&sim_opts.parfile_path)?;

    let sim_constants = match &sim_opts.constants_path {
        Some(constants_path) => {
            info!(
                "Reading simulation constants from {}",
                constants_path.display()
            );
            read_sim_constants(constants_path)?
        }
        None => SimConstants::default(),
    };

    // EXECUTION -----------------------------------------------------------------------------------
    let t_start = Instant::now();

    if sim_opts.no_sim_runs > 1 && sim_opts.session != SessionSelection::Test {
        run_batch(&sim_opts, &sim_pars, &sim_constants)?;
    } else {
        let weekend = run_single(&sim_opts, &sim_pars, &sim_constants)?;

        // POST-PROCESSING -------------------------------------------------------------------------
        print_weekend(&weekend);

        if let Some(out_dir) = &sim_opts.output_dir {
            export_results(&weekend, out_dir)?;
        }
    }

    info!("Execution time: {}ms", t_start.elapsed().as_millis());

    Ok(())
}
