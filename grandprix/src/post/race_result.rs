use crate::core::competitor::CompetitorStatus;
use crate::core::events::{SessionEvent, SessionStatus};
use crate::core::race::{LapRecord, Race};
use crate::core::weather::WeatherCondition;
use crate::post::points::{race_points, POINTS_TABLE};
use anyhow::Context;
use helpers::general::{argmin, format_laptime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// RaceClassification is the final result row of one car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceClassification {
    pub position: u32,
    pub grid_position: u32,
    pub driver_id: u32,
    pub team_id: u32,
    pub name: String,
    pub points: u32,
    pub fastest_lap: bool,
    pub dnf: bool,
    pub dnf_reason: Option<String>,
    pub dnf_lap: Option<u32>,
    pub total_time: f64,
    pub laps_completed: u32,
    pub pit_stops: u32,
    pub best_lap: Option<f64>,
}

/// RaceResult contains all race information that is required for post-processing the results. It
/// is assembled once after the race and not changed afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct RaceResult {
    pub race_id: u32,
    pub season: u32,
    pub circuit_name: String,
    pub tot_no_laps: u32,
    pub status: SessionStatus,
    pub classification: Vec<RaceClassification>,
    pub events: Vec<SessionEvent>,
    pub lap_records: Vec<LapRecord>,
    pub weather_history: Vec<WeatherCondition>,
}

impl RaceResult {
    /// assemble creates the result of a finished race. The fastest lap bonus goes to the winner
    /// with probability `fastest_lap_winner_bias`, otherwise to the quickest single lap within the
    /// points.
    pub fn assemble<R: Rng + ?Sized>(race: &Race, rng: &mut R) -> RaceResult {
        let order = race.get_classification_order();

        let finishers: Vec<usize> = order
            .iter()
            .copied()
            .filter(|&idx| race.competitors[idx].status == CompetitorStatus::Finished)
            .collect();

        let fastest_lap_idx = if finishers.is_empty() {
            None
        } else if rng.gen::<f64>() < race.sim_constants().fastest_lap_winner_bias {
            Some(finishers[0])
        } else {
            let candidates: Vec<usize> = finishers
                .iter()
                .copied()
                .take(POINTS_TABLE.len())
                .collect();
            let best_laps: Vec<f64> = candidates
                .iter()
                .map(|&idx| race.competitors[idx].best_lap.unwrap_or(f64::INFINITY))
                .collect();
            argmin(&best_laps).map(|i| candidates[i])
        };

        let classification = order
            .iter()
            .enumerate()
            .map(|(pos, &idx)| {
                let competitor = &race.competitors[idx];
                let position = pos as u32 + 1;
                let dnf = competitor.status != CompetitorStatus::Finished;
                let fastest_lap = fastest_lap_idx == Some(idx);

                RaceClassification {
                    position,
                    grid_position: competitor.grid_position,
                    driver_id: competitor.driver_id,
                    team_id: competitor.team_id,
                    name: competitor.name.to_owned(),
                    points: race_points(position, dnf, fastest_lap),
                    fastest_lap,
                    dnf,
                    dnf_reason: competitor.dnf_reason.to_owned(),
                    dnf_lap: competitor.dnf_lap,
                    total_time: competitor.total_time,
                    laps_completed: competitor.laps_completed,
                    pit_stops: competitor.pit_stops,
                    best_lap: competitor.best_lap,
                }
            })
            .collect();

        RaceResult {
            race_id: race.race_id,
            season: race.season,
            circuit_name: race.circuit_name.to_owned(),
            tot_no_laps: race.tot_no_laps,
            status: race.status(),
            classification,
            events: race.events.to_owned(),
            lap_records: race.lap_records.to_owned(),
            weather_history: race.weather.history().to_vec(),
        }
    }

    pub fn winner(&self) -> Option<&RaceClassification> {
        self.classification.first().filter(|row| !row.dnf)
    }

    pub fn total_points(&self) -> u32 {
        self.classification.iter().map(|row| row.points).sum()
    }

    /// write_classification_csv writes the final classification to a CSV file.
    pub fn write_classification_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_path(path).context(format!(
            "Failed to create classification file {}!",
            path.display()
        ))?;
        for row in self.classification.iter() {
            wtr.serialize(row)
                .context("Failed to write classification row!")?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// write_lap_records_csv writes the lap-by-lap state of all cars to a CSV file.
    pub fn write_lap_records_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_path(path).context(format!(
            "Failed to create lap record file {}!",
            path.display()
        ))?;
        for record in self.lap_records.iter() {
            wtr.serialize(record).context("Failed to write lap record!")?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// write_events_csv writes the event feed to a CSV file.
    pub fn write_events_csv(&self, path: &Path) -> anyhow::Result<()> {
        write_events_csv(&self.events, path)
    }

    /// print_classification prints the final classification to the console output.
    pub fn print_classification(&self) {
        println!(
            "RESULT: {} {} ({} laps, {:?})",
            self.circuit_name, self.season, self.tot_no_laps, self.status
        );
        println!(
            "{:>3}  {:<24} {:>4} {:>12} {:>10} {:>5} {:>4}",
            "pos", "driver", "laps", "time", "best", "pits", "pts"
        );

        for row in self.classification.iter() {
            let time = if row.dnf {
                format!(
                    "DNF ({})",
                    row.dnf_reason.as_deref().unwrap_or("unknown")
                )
            } else {
                format_laptime(row.total_time)
            };
            println!(
                "{:>3}  {:<24} {:>4} {:>12} {:>10} {:>5} {:>4}{}",
                row.position,
                row.name,
                row.laps_completed,
                time,
                row.best_lap.map_or_else(|| "-".to_owned(), format_laptime),
                row.pit_stops,
                row.points,
                if row.fastest_lap { " (FL)" } else { "" }
            );
        }
    }
}

/// write_events_csv writes an event feed to a CSV file.
pub fn write_events_csv(events: &[SessionEvent], path: &Path) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path).context(format!(
        "Failed to create event file {}!",
        path.display()
    ))?;
    for event in events.iter() {
        wtr.serialize(event).context("Failed to write event!")?;
    }
    wtr.flush()?;
    Ok(())
}
