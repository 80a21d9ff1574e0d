use crate::core::attributes::{car_pace, car_performance, driver_pace};
use crate::core::competitor::CompetitorPars;
use crate::core::tyre::{is_appropriate, wear_penalty, Tyre, TyreCompound};
use crate::core::weather::WeatherCondition;
use crate::error::SimError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// From this lap on the track condition of a single lap may deviate from the session condition.
const CONDITION_SWING_FROM_LAP: u32 = 6;
const CONDITION_SWING_PROBABILITY: f64 = 0.1;

/// Incidents are only possible on tyres worn beyond this value or on the wrong compound.
const INCIDENT_WEAR_THRESHOLD: f64 = 80.0;

/// * `driver_id` - Driver that runs the test
/// * `total_laps` - Number of laps of the test session
/// * `initial_tyre` - Compound mounted at the start of the session
/// * `weather` - Track condition of the session
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TestSessionPars {
    pub driver_id: u32,
    pub total_laps: u32,
    pub initial_tyre: TyreCompound,
    pub weather: WeatherCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Spin,
    OffTrack,
    LockUp,
    Puncture,
    AeroLoss,
    Aquaplaning,
    ZeroVisibility,
}

impl IncidentKind {
    const DRY: [IncidentKind; 5] = [
        IncidentKind::Spin,
        IncidentKind::OffTrack,
        IncidentKind::LockUp,
        IncidentKind::Puncture,
        IncidentKind::AeroLoss,
    ];
    const WET_ONLY: [IncidentKind; 2] = [IncidentKind::Aquaplaning, IncidentKind::ZeroVisibility];

    pub fn severity(self) -> Severity {
        match self {
            IncidentKind::OffTrack | IncidentKind::LockUp => Severity::Low,
            IncidentKind::Spin | IncidentKind::AeroLoss | IncidentKind::ZeroVisibility => {
                Severity::Medium
            }
            IncidentKind::Puncture | IncidentKind::Aquaplaning => Severity::High,
        }
    }

    /// t_base_loss returns the minimum time loss (s) of the incident.
    pub fn t_base_loss(self) -> f64 {
        match self {
            IncidentKind::Spin => 3.0,
            IncidentKind::OffTrack => 2.0,
            IncidentKind::LockUp => 1.5,
            IncidentKind::Puncture => 15.0,
            IncidentKind::AeroLoss => 5.0,
            IncidentKind::Aquaplaning => 10.0,
            IncidentKind::ZeroVisibility => 6.0,
        }
    }

    /// forces_tyre_change returns true if the car cannot continue on its current set.
    pub fn forces_tyre_change(self) -> bool {
        matches!(self, IncidentKind::Puncture | IncidentKind::Aquaplaning)
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            IncidentKind::Spin => "spin",
            IncidentKind::OffTrack => "off track",
            IncidentKind::LockUp => "lock-up",
            IncidentKind::Puncture => "puncture",
            IncidentKind::AeroLoss => "aero loss",
            IncidentKind::Aquaplaning => "aquaplaning",
            IncidentKind::ZeroVisibility => "zero visibility",
        };
        f.pad(name)
    }
}

/// TestLap is the record of a single test lap. `compound` and `wear` describe the set mounted at
/// the end of the lap, i.e. after a tyre change in this lap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestLap {
    pub lap: u32,
    pub weather: WeatherCondition,
    pub compound: TyreCompound,
    pub laptime: f64,
    pub wear: f64,
    pub incident: Option<IncidentKind>,
    pub t_lost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestSessionResult {
    pub driver_id: u32,
    pub laps: Vec<TestLap>,
}

impl TestSessionResult {
    pub fn no_incidents(&self) -> usize {
        self.laps.iter().filter(|lap| lap.incident.is_some()).count()
    }

    pub fn t_lost_total(&self) -> f64 {
        self.laps.iter().map(|lap| lap.t_lost).sum()
    }

    pub fn best_lap(&self) -> Option<f64> {
        self.laps.iter().map(|lap| lap.laptime).reduce(f64::min)
    }

    /// print_laps prints the lap table of the test session to the console output.
    pub fn print_laps(&self) {
        println!("RESULT: Test session of driver {}", self.driver_id);
        println!(
            "{:>4}  {:<10} {:<12} {:>9} {:>6}  {}",
            "lap", "weather", "tyre", "time", "wear", "incident"
        );
        for lap in self.laps.iter() {
            println!(
                "{:>4}  {:<10} {:<12} {:>9.3} {:>6.1}  {}",
                lap.lap,
                lap.weather.as_str(),
                lap.compound.as_str(),
                lap.laptime,
                lap.wear,
                lap.incident
                    .map_or_else(String::new, |kind| format!("{} (+{:.1}s)", kind, lap.t_lost))
            );
        }
        println!(
            "{} incident(s), {:.1}s lost in total",
            self.no_incidents(),
            self.t_lost_total()
        );
    }
}

/// session_tyre returns the compound mounted after a forced tyre change in the given condition.
/// On a dry track the test continues on the softest compound.
pub fn session_tyre(weather: WeatherCondition) -> TyreCompound {
    match weather {
        WeatherCondition::Dry => TyreCompound::Soft,
        WeatherCondition::LightRain => TyreCompound::Wet,
        WeatherCondition::HeavyRain => TyreCompound::ExtremeWet,
    }
}

/// next_tyre returns the compound that replaces a worn-out set. On a dry track the slicks are
/// tested in rotation, in the rain the wet compounds alternate.
pub fn next_tyre(compound: TyreCompound, weather: WeatherCondition) -> TyreCompound {
    if !weather.is_dry() {
        return match compound {
            TyreCompound::Wet => TyreCompound::ExtremeWet,
            _ => TyreCompound::Wet,
        };
    }

    match compound {
        TyreCompound::Soft => TyreCompound::Medium,
        TyreCompound::Medium => TyreCompound::Hard,
        _ => TyreCompound::Soft,
    }
}

/// incident_chance returns the probability (0-1) of an incident in the current lap.
pub fn incident_chance(
    wear: f64,
    consistency: u8,
    compound: TyreCompound,
    weather: WeatherCondition,
) -> f64 {
    let mut chance = if wear > 120.0 {
        0.4
    } else if wear > 100.0 {
        0.25
    } else if wear > 90.0 {
        0.15
    } else if wear > INCIDENT_WEAR_THRESHOLD {
        0.08
    } else {
        0.0
    };

    if !is_appropriate(compound, weather) {
        chance *= 3.0;
    }

    chance *= match compound {
        TyreCompound::Soft => 1.3,
        TyreCompound::Medium => 1.1,
        _ => 1.0,
    };

    chance * (1.0 + (100.0 - consistency as f64) / 100.0 * 0.5)
}

/// possible_incidents returns the incidents that may happen at the given wear. Heavily worn
/// tyres rule out the harmless ones.
pub fn possible_incidents(wear: f64, weather: WeatherCondition) -> Vec<IncidentKind> {
    let min_severity = if wear > 120.0 {
        Severity::High
    } else if wear > 100.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    let wet: &[IncidentKind] = if weather.is_dry() {
        &[]
    } else {
        &IncidentKind::WET_ONLY
    };

    IncidentKind::DRY
        .iter()
        .chain(wet.iter())
        .copied()
        .filter(|kind| kind.severity() >= min_severity)
        .collect()
}

/// simulate_test_session drives a single car through a test session. The car changes tyres after
/// a puncture or aquaplaning and whenever a set is worn out, there are no pit losses.
pub fn simulate_test_session<R: Rng + ?Sized>(
    driver: &CompetitorPars,
    pars: &TestSessionPars,
    rng: &mut R,
) -> Result<TestSessionResult, SimError> {
    driver.validate()?;
    if driver.driver_id != pars.driver_id {
        return Err(SimError::UnknownDriver(pars.driver_id));
    }
    if pars.total_laps == 0 {
        return Err(SimError::invalid("a test session needs at least one lap"));
    }

    let t_pace = driver_pace(driver.skill, driver.experience)
        + car_pace(car_performance(&driver.components).strength);
    let skill_factor = 1.0 + (100.0 - driver.skill as f64) / 200.0;

    let mut tyre = Tyre::new(pars.initial_tyre);
    let mut laps = Vec::with_capacity(pars.total_laps as usize);

    for lap in 1..=pars.total_laps {
        let weather = if lap >= CONDITION_SWING_FROM_LAP
            && rng.gen::<f64>() < CONDITION_SWING_PROBABILITY
        {
            *WeatherCondition::ALL.choose(rng).unwrap_or(&pars.weather)
        } else {
            pars.weather
        };

        // the warm-up state is that of the set at the start of the lap
        let t_warmup = tyre.t_add_warmup();
        tyre.drive_lap(tyre.compound.wear_rate(weather) * skill_factor + rng.gen_range(0.0..3.0));

        let mut laptime =
            tyre.compound.base_laptime(weather) + t_pace + t_warmup + wear_penalty(tyre.wear());

        let mut incident = None;
        let mut t_lost = 0.0;
        if tyre.wear() > INCIDENT_WEAR_THRESHOLD || !is_appropriate(tyre.compound, weather) {
            let chance = incident_chance(tyre.wear(), driver.consistency, tyre.compound, weather);
            if rng.gen::<f64>() < chance {
                if let Some(&kind) = possible_incidents(tyre.wear(), weather).choose(rng) {
                    t_lost = kind.t_base_loss() * (1.0 + rng.gen_range(0.0..0.5));
                    laptime += t_lost;
                    incident = Some(kind);

                    if kind.forces_tyre_change() {
                        tyre = Tyre::new(session_tyre(weather));
                    }
                }
            }
        }

        if incident.is_none() && tyre.is_worn_out() {
            tyre = Tyre::new(next_tyre(tyre.compound, weather));
        }

        laps.push(TestLap {
            lap,
            weather,
            compound: tyre.compound,
            laptime,
            wear: tyre.wear(),
            incident,
            t_lost,
        });
    }

    Ok(TestSessionResult {
        driver_id: driver.driver_id,
        laps,
    })
}
