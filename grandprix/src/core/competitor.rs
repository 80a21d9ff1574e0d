use crate::core::attributes::{
    car_pace, car_performance, crew_reliability_bonus, driver_pace, pit_crew_offset,
    CarComponent, CarPerformance, MechanicPars,
};
use crate::core::strategy::{StrategyHandler, StrategyPars};
use crate::core::tyre::{Tyre, TyreCompound};
use crate::core::weather::WeatherCondition;
use crate::error::SimError;
use crate::pre::sim_constants::SimConstants;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Generic failure attribution used if no single component can be blamed.
pub const GENERIC_FAILURE: &str = "system";

/// * `driver_id` - Unique driver id
/// * `team_id` - Team of the driver, two drivers of the same team are teammates
/// * `name` - Driver name, e.g. Valtteri Bottas
/// * `initials` - Driver initials, e.g. BOT
/// * `skill`, `experience`, `consistency`, `aggression` - Driver attributes (0-100)
/// * `components` - Current car components of the team
/// * `mechanics` - Pit crew of the team
/// * `qualifying_tyre` - Compound used in qualifying (default depends on the weather)
/// * `strategy` - Race strategy (cars without strategy run on default tyres)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CompetitorPars {
    pub driver_id: u32,
    pub team_id: u32,
    pub name: String,
    #[serde(default)]
    pub initials: String,
    pub skill: u8,
    pub experience: u8,
    #[serde(default = "default_consistency")]
    pub consistency: u8,
    #[serde(default = "default_aggression")]
    pub aggression: u8,
    #[serde(default)]
    pub components: Vec<CarComponent>,
    #[serde(default)]
    pub mechanics: Vec<MechanicPars>,
    #[serde(default)]
    pub qualifying_tyre: Option<String>,
    #[serde(default)]
    pub strategy: Option<StrategyPars>,
}

fn default_consistency() -> u8 {
    70
}

fn default_aggression() -> u8 {
    50
}

impl CompetitorPars {
    /// validate checks all attribute ranges and the strategy of the entry.
    pub fn validate(&self) -> Result<(), SimError> {
        let attributes = [
            ("skill", self.skill),
            ("experience", self.experience),
            ("consistency", self.consistency),
            ("aggression", self.aggression),
        ];
        for (name, value) in attributes.iter() {
            if *value > 100 {
                return Err(SimError::invalid(format!(
                    "{} of driver {} is {} (max. 100)",
                    name, self.driver_id, value
                )));
            }
        }

        for component in self.components.iter() {
            if component.strength > 100 || component.reliability > 100 {
                return Err(SimError::invalid(format!(
                    "{} of team {} out of range",
                    component.component_type, self.team_id
                )));
            }
        }

        for mechanic in self.mechanics.iter() {
            if mechanic.pit_stop_skill > 100 || mechanic.reliability_skill > 100 {
                return Err(SimError::invalid(format!(
                    "mechanic of team {} out of range",
                    self.team_id
                )));
            }
        }

        self.qualifying_compound()?;
        if let Some(strategy) = &self.strategy {
            strategy.validate()?;
        }

        Ok(())
    }

    pub fn qualifying_compound(&self) -> Result<Option<TyreCompound>, SimError> {
        self.qualifying_tyre
            .as_deref()
            .map(|tyre| tyre.parse())
            .transpose()
    }
}

/// check_entries validates all entries of a session and rejects duplicate driver ids.
pub fn check_entries(entries: &[CompetitorPars]) -> Result<(), SimError> {
    let mut driver_ids = HashSet::with_capacity(entries.len());

    for entry in entries.iter() {
        if !driver_ids.insert(entry.driver_id) {
            return Err(SimError::invalid(format!(
                "driver {} entered twice",
                entry.driver_id
            )));
        }
        entry.validate()?;
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitorStatus {
    Running,
    Finished,
    Dnf,
}

/// Competitor is the state of one car/driver pair during a race session.
#[derive(Debug, Clone)]
pub struct Competitor {
    pub driver_id: u32,
    pub team_id: u32,
    pub name: String,
    pub initials: String,
    skill: u8,
    experience: u8,
    consistency: u8,
    pub aggression: u8,
    components: Vec<CarComponent>,
    pub perf: CarPerformance,
    t_pit_crew: f64,
    pub tyre: Tyre,
    pub total_time: f64,
    pub incidents: u32,
    pub status: CompetitorStatus,
    pub dnf_reason: Option<String>,
    pub dnf_lap: Option<u32>,
    pub pit_stops: u32,
    pub grid_position: u32,
    pub position: u32,
    pub best_lap: Option<f64>,
    pub laps_completed: u32,
    pub sh: StrategyHandler,
}

impl Competitor {
    /// new creates the race state of an entry. Cars start on the first segment of their strategy
    /// or on the default compound for the starting condition.
    pub fn new(
        pars: &CompetitorPars,
        grid_position: u32,
        weather: WeatherCondition,
    ) -> Result<Competitor, SimError> {
        pars.validate()?;

        let strategy = pars.strategy.as_ref().map(|s| s.validate()).transpose()?;
        let sh = StrategyHandler::new(strategy);
        let start_compound = sh.start_compound(weather);

        let mut perf = car_performance(&pars.components);
        perf.reliability =
            (perf.reliability + crew_reliability_bonus(&pars.mechanics)).clamp(0.0, 100.0);

        Ok(Competitor {
            driver_id: pars.driver_id,
            team_id: pars.team_id,
            name: pars.name.to_owned(),
            initials: pars.initials.to_owned(),
            skill: pars.skill,
            experience: pars.experience,
            consistency: pars.consistency,
            aggression: pars.aggression,
            components: pars.components.to_owned(),
            perf,
            t_pit_crew: pit_crew_offset(&pars.mechanics),
            tyre: Tyre::new(start_compound),
            total_time: 0.0,
            incidents: 0,
            status: CompetitorStatus::Running,
            dnf_reason: None,
            dnf_lap: None,
            pit_stops: 0,
            grid_position,
            position: grid_position,
            best_lap: None,
            laps_completed: 0,
            sh,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == CompetitorStatus::Running
    }

    pub fn skill(&self) -> u8 {
        self.skill
    }

    /// calc_basic_laptime returns the lap time without random influences.
    pub fn calc_basic_laptime(&self, weather: WeatherCondition) -> f64 {
        self.tyre.compound.base_laptime(weather)
            + driver_pace(self.skill, self.experience)
            + car_pace(self.perf.strength)
            + self.tyre.t_add_tyre()
    }

    /// calc_laptime returns the lap time of the current lap including the driver's variation.
    /// Less consistent drivers vary more, the variation is bounded by `max_lap_jitter`.
    pub fn calc_laptime<R: Rng + ?Sized>(
        &self,
        weather: WeatherCondition,
        sim_constants: &SimConstants,
        rng: &mut R,
    ) -> f64 {
        let std_dev = (100.0 - self.consistency as f64) / 100.0 * sim_constants.lap_jitter_scale;

        let random_factor = match Normal::new(0.0, std_dev) {
            Ok(normal) if std_dev > 0.0 => normal
                .sample(rng)
                .clamp(-sim_constants.max_lap_jitter, sim_constants.max_lap_jitter),
            _ => 0.0,
        };

        (self.calc_basic_laptime(weather) + random_factor).max(sim_constants.min_lap_time)
    }

    /// drive_lap adds the lap time and ages the tyres by one lap.
    pub fn drive_lap<R: Rng + ?Sized>(
        &mut self,
        laptime: f64,
        weather: WeatherCondition,
        rng: &mut R,
    ) {
        let skill_factor = 1.0 + (100.0 - self.skill as f64) / 300.0;
        let wear_increment =
            self.tyre.compound.wear_rate(weather) * skill_factor * rng.gen_range(0.85..1.15);
        self.tyre.drive_lap(wear_increment);

        self.total_time += laptime;
        self.laps_completed += 1;
        self.best_lap = Some(match self.best_lap {
            Some(best) => best.min(laptime),
            None => laptime,
        });
    }

    /// perform_pitstop mounts a fresh set of the given compound and returns the time lost.
    pub fn perform_pitstop<R: Rng + ?Sized>(
        &mut self,
        compound: TyreCompound,
        sim_constants: &SimConstants,
        rng: &mut R,
    ) -> f64 {
        let jitter = if sim_constants.pit_jitter > 0.0 {
            rng.gen_range(0.0..sim_constants.pit_jitter)
        } else {
            0.0
        };
        let t_standstill = (sim_constants.pit_base_time + self.t_pit_crew + jitter).max(0.0);

        self.tyre = Tyre::new(compound);
        self.total_time += t_standstill;
        self.pit_stops += 1;

        t_standstill
    }

    /// add_incident counts a spin or an excursion. The time lost is part of the lap time.
    pub fn add_incident(&mut self) {
        self.incidents += 1;
    }

    pub fn retire(&mut self, lap: u32, reason: &str) {
        self.status = CompetitorStatus::Dnf;
        self.dnf_lap = Some(lap);
        self.dnf_reason = Some(reason.to_owned());
    }

    pub fn finish(&mut self) {
        if self.is_active() {
            self.status = CompetitorStatus::Finished;
        }
    }

    /// failure_risk returns the base probability of a mechanical failure in the current lap, before
    /// any damping of the race situation is applied.
    pub fn failure_risk(&self, cur_lap: u32, tot_no_laps: u32) -> f64 {
        let mut risk = (100.0 - self.perf.reliability) / 10000.0;

        // late race stress in the last three laps
        if tot_no_laps >= 3 && cur_lap > tot_no_laps - 3 {
            risk += (cur_lap - (tot_no_laps - 3)) as f64 / 3.0 * 0.005;
        }

        risk += self.incidents.saturating_sub(2) as f64 * 0.0005;

        // catastrophically bad components
        risk += self
            .components
            .iter()
            .filter(|c| c.reliability < 10)
            .map(|c| (10 - c.reliability) as f64 * 0.0001)
            .sum::<f64>();

        risk
    }

    /// failed_component attributes a mechanical failure. Most failures are generic, otherwise the
    /// component of bad reliability with the highest sampled risk is blamed.
    pub fn failed_component<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        if self.components.is_empty() {
            return GENERIC_FAILURE.to_owned();
        }

        if rng.gen::<f64>() < 0.8 {
            return GENERIC_FAILURE.to_owned();
        }

        let mut worst: Option<(f64, &CarComponent)> = None;
        for component in self.components.iter() {
            let unreliability = (100 - component.reliability) as f64;
            let risk = if component.reliability < 20 {
                unreliability * (0.3 + 0.7 * rng.gen::<f64>())
            } else {
                unreliability * 0.005 * rng.gen::<f64>()
            };

            if risk > 5.0 && worst.map_or(true, |(r, _)| risk > r) {
                worst = Some((risk, component));
            }
        }

        worst
            .map(|(_, component)| component.component_type.to_string())
            .unwrap_or_else(|| GENERIC_FAILURE.to_owned())
    }
}
