use crate::core::competitor::{check_entries, Competitor, CompetitorPars, CompetitorStatus};
use crate::core::events::{EventKind, SessionEvent, SessionStatus};
use crate::core::strategy::PitReason;
use crate::core::tyre::{default_for, is_appropriate, TyreCompound};
use crate::core::weather::{Weather, WeatherChange, WeatherCondition};
use crate::error::SimError;
use crate::pre::sim_constants::SimConstants;
use helpers::general::format_laptime;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// * `race_id` - Unique id of the race weekend
/// * `circuit_name` - Name of the circuit, e.g. Monza
/// * `season` - Season
/// * `tot_no_laps` - Total number of laps
/// * `weather_quali` - Track condition during qualifying
/// * `weather_race` - Track condition at the start of the race
/// * `weather_changes` - Forecast changes during the race
/// * `grid` - Starting order as list of driver ids (if not set, qualifying decides it)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RacePars {
    pub race_id: u32,
    #[serde(default)]
    pub circuit_name: String,
    pub season: u32,
    pub tot_no_laps: u32,
    #[serde(default)]
    pub weather_quali: WeatherCondition,
    #[serde(default)]
    pub weather_race: WeatherCondition,
    #[serde(default)]
    pub weather_changes: Vec<WeatherChange>,
    #[serde(default)]
    pub grid: Option<Vec<u32>>,
}

/// LapRecord is the state of a competitor at the end of a lap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapRecord {
    pub lap: u32,
    pub driver_id: u32,
    pub position: u32,
    pub compound: TyreCompound,
    pub wear: f64,
    pub laptime: f64,
    pub racetime: f64,
    pub pitted: bool,
}

#[derive(Debug)]
pub struct Race {
    pub race_id: u32,
    pub circuit_name: String,
    pub season: u32,
    pub tot_no_laps: u32,
    pub cur_lap: u32,
    pub weather: Weather,
    sim_constants: SimConstants,
    pub competitors: Vec<Competitor>,
    pub events: Vec<SessionEvent>,
    pub lap_records: Vec<LapRecord>,
    retire_order: Vec<usize>,
    race_finished: bool,
}

impl Race {
    /// new creates the race. `grid` contains the driver ids in starting order, entries missing in
    /// the grid start behind in the order of `entries`.
    pub fn new(
        race_pars: &RacePars,
        entries: &[CompetitorPars],
        grid: &[u32],
        sim_constants: &SimConstants,
    ) -> Result<Race, SimError> {
        if race_pars.tot_no_laps == 0 {
            return Err(SimError::invalid("race without laps"));
        }
        check_entries(entries)?;

        // determine starting order
        let mut grid_order: Vec<usize> = Vec::with_capacity(entries.len());
        let mut seen = HashSet::with_capacity(grid.len());
        for driver_id in grid.iter() {
            if !seen.insert(*driver_id) {
                return Err(SimError::invalid(format!(
                    "driver {} appears twice on the grid",
                    driver_id
                )));
            }
            let idx = entries
                .iter()
                .position(|entry| entry.driver_id == *driver_id)
                .ok_or(SimError::UnknownDriver(*driver_id))?;
            grid_order.push(idx);
        }
        for (idx, entry) in entries.iter().enumerate() {
            if !seen.contains(&entry.driver_id) {
                grid_order.push(idx);
            }
        }

        // create competitors in grid order
        let mut competitors = Vec::with_capacity(entries.len());
        for (pos, &idx) in grid_order.iter().enumerate() {
            competitors.push(Competitor::new(
                &entries[idx],
                pos as u32 + 1,
                race_pars.weather_race,
            )?);
        }

        let mut race = Race {
            race_id: race_pars.race_id,
            circuit_name: race_pars.circuit_name.to_owned(),
            season: race_pars.season,
            tot_no_laps: race_pars.tot_no_laps,
            cur_lap: 0,
            weather: Weather::new(
                race_pars.weather_race,
                &race_pars.weather_changes,
                sim_constants.weather_change_probability,
            ),
            sim_constants: sim_constants.to_owned(),
            competitors,
            events: Vec::new(),
            lap_records: Vec::new(),
            retire_order: Vec::new(),
            race_finished: false,
        };

        if race.competitors.is_empty() {
            race.race_finished = true;
        } else {
            race.events.push(SessionEvent::new(
                0,
                EventKind::Start,
                format!(
                    "Lights out at {}: {} cars, {} laps, {} conditions",
                    race.circuit_name,
                    race.competitors.len(),
                    race.tot_no_laps,
                    race.weather.condition()
                ),
                None,
            ));
        }

        Ok(race)
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// simulate_lap simulates the next lap and returns the events emitted during it.
    pub fn simulate_lap<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &[SessionEvent] {
        let first_new_event = self.events.len();

        if self.race_finished {
            return &self.events[first_new_event..];
        }

        self.cur_lap += 1;

        // weather is shared by all cars
        let prev_weather = self.weather.update(self.cur_lap, rng);
        let weather = self.weather.condition();
        if let Some(prev_weather) = prev_weather {
            info!(
                "Lap {}: weather changes from {} to {}",
                self.cur_lap, prev_weather, weather
            );
            self.events.push(SessionEvent::new(
                self.cur_lap,
                EventKind::Weather,
                format!("Weather changes from {} to {}", prev_weather, weather),
                None,
            ));
        }

        let no_comps = self.competitors.len();
        let t_start: Vec<f64> = self.competitors.iter().map(|c| c.total_time).collect();
        let mut t_penalties = vec![0.0; no_comps];
        let mut pitted = vec![false; no_comps];

        let active = self.get_active_ranked();
        self.handle_flavor_event(&active, &mut t_penalties, rng);
        self.handle_failures(&active, rng);

        let active = self.get_active_ranked();
        if active.is_empty() {
            info!("Lap {}: all cars retired, race ends", self.cur_lap);
            self.race_finished = true;
            return &self.events[first_new_event..];
        }

        self.handle_strategies(&active, weather, prev_weather.is_some(), &mut pitted, rng);
        self.handle_laptimes(&active, weather, &t_penalties, rng);
        self.handle_overtakes(rng);
        self.handle_backstop_pits(weather, &mut pitted, rng);

        // classification at the end of the lap
        self.update_positions();

        for &idx in self.get_active_ranked().iter() {
            let competitor = &self.competitors[idx];
            self.lap_records.push(LapRecord {
                lap: self.cur_lap,
                driver_id: competitor.driver_id,
                position: competitor.position,
                compound: competitor.tyre.compound,
                wear: competitor.tyre.wear(),
                laptime: competitor.total_time - t_start[idx],
                racetime: competitor.total_time,
                pitted: pitted[idx],
            });
        }

        if let Some(&leader) = self.get_active_ranked().first() {
            debug!(
                "Lap {}/{}: leader {} ({}), {} conditions",
                self.cur_lap,
                self.tot_no_laps,
                self.competitors[leader].name,
                format_laptime(self.competitors[leader].total_time),
                weather
            );
        }

        if self.cur_lap >= self.tot_no_laps {
            self.handle_finish();
        }

        &self.events[first_new_event..]
    }

    /// simulate_race simulates all remaining laps.
    pub fn simulate_race<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        while !self.race_finished {
            self.simulate_lap(rng);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // RACE SIMULATOR PARTS ------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// Fast laps, spins and off-track excursions of a random car.
    fn handle_flavor_event<R: Rng + ?Sized>(
        &mut self,
        active: &[usize],
        t_penalties: &mut [f64],
        rng: &mut R,
    ) {
        if rng.gen::<f64>() >= self.sim_constants.flavor_event_probability {
            return;
        }

        let idx = match active.choose(rng) {
            Some(&idx) => idx,
            None => return,
        };

        // negative constants are reported by check_constants and count as no loss
        let t_spin = self.sim_constants.t_spin.max(0.0);
        let t_off_track = self.sim_constants.t_off_track.max(0.0);

        let (kind, t_loss) = match rng.gen_range(0..3) {
            0 => (EventKind::FastLap, 0.0),
            1 => (EventKind::Spin, t_spin + rng.gen_range(0.0..=t_spin / 2.0)),
            _ => (
                EventKind::OffTrack,
                t_off_track + rng.gen_range(0.0..=t_off_track / 2.0),
            ),
        };

        let competitor = &mut self.competitors[idx];
        let description = match kind {
            EventKind::FastLap => format!("{} is on a flying lap", competitor.name),
            EventKind::Spin => format!("{} spins and loses {:.1}s", competitor.name, t_loss),
            _ => format!(
                "{} goes off track and loses {:.1}s",
                competitor.name, t_loss
            ),
        };

        if kind != EventKind::FastLap {
            competitor.add_incident();
            t_penalties[idx] += t_loss;
        }

        self.events.push(SessionEvent::new(
            self.cur_lap,
            kind,
            description,
            Some(competitor.driver_id),
        ));
    }

    /// Mechanical failures. The risk is damped once teammates or a large part of the field retired
    /// such that failures do not pile up.
    fn handle_failures<R: Rng + ?Sized>(&mut self, active: &[usize], rng: &mut R) {
        let no_comps = self.competitors.len() as f64;

        for &idx in active.iter() {
            let team_id = self.competitors[idx].team_id;
            let teammate_retired = self
                .competitors
                .iter()
                .any(|c| c.team_id == team_id && c.status == CompetitorStatus::Dnf);
            let field_retired =
                self.retire_order.len() as f64 / no_comps >= self.sim_constants.field_retired_fraction;

            let mut risk = self.competitors[idx].failure_risk(self.cur_lap, self.tot_no_laps);
            if teammate_retired {
                risk *= self.sim_constants.teammate_retired_damping;
            }
            if field_retired {
                risk *= self.sim_constants.field_retired_damping;
            }
            risk = risk.min(self.sim_constants.max_failure_risk);
            if self.cur_lap <= self.sim_constants.early_laps {
                risk *= self.sim_constants.early_lap_damping;
            }

            if rng.gen::<f64>() < risk {
                let component = self.competitors[idx].failed_component(rng);
                let reason = format!("{} failure", component);
                let competitor = &mut self.competitors[idx];
                competitor.retire(self.cur_lap, &reason);
                self.retire_order.push(idx);

                info!(
                    "Lap {}: {} retires ({})",
                    self.cur_lap, competitor.name, reason
                );
                self.events.push(SessionEvent::new(
                    self.cur_lap,
                    EventKind::Dnf,
                    format!("{} retires with {}", competitor.name, reason),
                    Some(competitor.driver_id),
                ));
            }
        }
    }

    /// Planned stops and reactions to weather changes.
    fn handle_strategies<R: Rng + ?Sized>(
        &mut self,
        active: &[usize],
        weather: WeatherCondition,
        weather_changed: bool,
        pitted: &mut [bool],
        rng: &mut R,
    ) {
        for &idx in active.iter() {
            let competitor = &mut self.competitors[idx];
            let compound = competitor.tyre.compound;
            let wear = competitor.tyre.wear();

            if let Some(decision) = competitor.sh.on_lap(compound, wear, weather, weather_changed) {
                self.perform_pitstop(idx, decision.compound, decision.reason, rng);
                pitted[idx] = true;
            }
        }
    }

    fn handle_laptimes<R: Rng + ?Sized>(
        &mut self,
        active: &[usize],
        weather: WeatherCondition,
        t_penalties: &[f64],
        rng: &mut R,
    ) {
        for &idx in active.iter() {
            let laptime = self.competitors[idx].calc_laptime(weather, &self.sim_constants, rng)
                + t_penalties[idx];
            self.competitors[idx].drive_lap(laptime, weather, rng);
        }
    }

    /// Adjacent cars within the overtaking window may swap places. Every car is involved in at most
    /// one swap per lap.
    fn handle_overtakes<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let order = self.get_active_ranked();
        let mut swapped = vec![false; self.competitors.len()];

        for pair in order.windows(2) {
            let (idx_front, idx_rear) = (pair[0], pair[1]);
            if swapped[idx_front] || swapped[idx_rear] {
                continue;
            }

            let front = &self.competitors[idx_front];
            let rear = &self.competitors[idx_rear];
            if rear.total_time - front.total_time >= self.sim_constants.overtake_window {
                continue;
            }

            let skill_adv = rear.skill() as f64 - front.skill() as f64;
            let wear_adv = front.tyre.wear() - rear.tyre.wear();
            let p_overtake = (self.sim_constants.overtake_base_probability
                + skill_adv * self.sim_constants.overtake_skill_factor
                + wear_adv * self.sim_constants.overtake_wear_factor
                + rear.aggression as f64 * self.sim_constants.overtake_aggression_factor)
                .min(self.sim_constants.overtake_max_probability)
                .max(0.0);

            if rng.gen::<f64>() < p_overtake {
                let t_front = front.total_time;
                let description = format!("{} overtakes {}", rear.name, front.name);
                let driver_id = rear.driver_id;

                self.competitors[idx_rear].total_time = t_front - self.sim_constants.t_overtake_gap;
                self.competitors[idx_front].total_time += self.sim_constants.t_overtake_loser;
                swapped[idx_front] = true;
                swapped[idx_rear] = true;

                self.events.push(SessionEvent::new(
                    self.cur_lap,
                    EventKind::Overtake,
                    description,
                    Some(driver_id),
                ));
            }
        }
    }

    /// Cars without further planned stops may come in for fresh tyres once theirs are worn out.
    fn handle_backstop_pits<R: Rng + ?Sized>(
        &mut self,
        weather: WeatherCondition,
        pitted: &mut [bool],
        rng: &mut R,
    ) {
        for idx in self.get_active_ranked() {
            let competitor = &self.competitors[idx];
            if competitor.tyre.wear() <= self.sim_constants.backstop_wear
                || competitor.sh.laps_since_pit() < self.sim_constants.backstop_min_gap
                || !competitor.sh.on_final_stint()
            {
                continue;
            }

            if rng.gen::<f64>() < self.sim_constants.backstop_pit_probability {
                let compound = if is_appropriate(competitor.tyre.compound, weather) {
                    competitor.tyre.compound
                } else {
                    default_for(weather)
                };
                self.competitors[idx].sh.record_unplanned_pit();
                self.perform_pitstop(idx, compound, PitReason::Worn, rng);
                pitted[idx] = true;
            }
        }
    }

    fn handle_finish(&mut self) {
        for competitor in self.competitors.iter_mut() {
            competitor.finish();
        }
        self.race_finished = true;

        if let Some(winner) = self
            .competitors
            .iter()
            .find(|c| c.status == CompetitorStatus::Finished && c.position == 1)
        {
            info!(
                "{} wins after {} laps in {}",
                winner.name,
                self.tot_no_laps,
                format_laptime(winner.total_time)
            );
            self.events.push(SessionEvent::new(
                self.cur_lap,
                EventKind::Finish,
                format!("{} takes the chequered flag", winner.name),
                Some(winner.driver_id),
            ));
        }
    }

    fn perform_pitstop<R: Rng + ?Sized>(
        &mut self,
        idx: usize,
        compound: TyreCompound,
        reason: PitReason,
        rng: &mut R,
    ) {
        let competitor = &mut self.competitors[idx];
        let old_compound = competitor.tyre.compound;
        let t_standstill = competitor.perform_pitstop(compound, &self.sim_constants, rng);

        let cause = match reason {
            PitReason::Scheduled => "planned stop",
            PitReason::Worn => "worn tyres",
            PitReason::Weather => "weather change",
        };

        debug!(
            "Lap {}: {} pits ({}), {} -> {}",
            self.cur_lap, competitor.name, cause, old_compound, compound
        );
        self.events.push(SessionEvent::new(
            self.cur_lap,
            EventKind::PitStop,
            format!(
                "{} pits for {} tyres ({}, {:.1}s)",
                competitor.name, compound, cause, t_standstill
            ),
            Some(competitor.driver_id),
        ));
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn get_all_finished(&self) -> bool {
        self.race_finished
    }

    pub fn sim_constants(&self) -> &SimConstants {
        &self.sim_constants
    }

    pub fn status(&self) -> SessionStatus {
        if self.competitors.is_empty() {
            SessionStatus::NoParticipants
        } else if self
            .competitors
            .iter()
            .all(|c| c.status == CompetitorStatus::Dnf)
        {
            SessionStatus::AllRetired
        } else {
            SessionStatus::Completed
        }
    }

    /// get_active_ranked returns the indices of all running cars ordered by race time. Ties are
    /// broken by the grid position.
    pub fn get_active_ranked(&self) -> Vec<usize> {
        let mut idxs: Vec<usize> = (0..self.competitors.len())
            .filter(|&idx| self.competitors[idx].status != CompetitorStatus::Dnf)
            .collect();

        idxs.sort_by(|&a, &b| {
            let (ca, cb) = (&self.competitors[a], &self.competitors[b]);
            ca.total_time
                .total_cmp(&cb.total_time)
                .then(ca.grid_position.cmp(&cb.grid_position))
        });

        idxs
    }

    /// get_classification_order returns all cars in classification order: cars still in the race
    /// by race time, then retired cars by laps completed and order of retirement.
    pub fn get_classification_order(&self) -> Vec<usize> {
        let mut order = self.get_active_ranked();

        let mut retired = self.retire_order.to_owned();
        retired.sort_by(|&a, &b| {
            self.competitors[b]
                .laps_completed
                .cmp(&self.competitors[a].laps_completed)
        });
        order.extend(retired);

        order
    }

    fn update_positions(&mut self) {
        for (pos, idx) in self.get_classification_order().into_iter().enumerate() {
            self.competitors[idx].position = pos as u32 + 1;
        }
    }
}
