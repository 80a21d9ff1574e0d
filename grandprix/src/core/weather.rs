use crate::error::SimError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Dry,
    LightRain,
    HeavyRain,
}

impl Default for WeatherCondition {
    fn default() -> Self {
        WeatherCondition::Dry
    }
}

impl WeatherCondition {
    pub const ALL: [WeatherCondition; 3] = [
        WeatherCondition::Dry,
        WeatherCondition::LightRain,
        WeatherCondition::HeavyRain,
    ];

    pub fn is_dry(self) -> bool {
        matches!(self, WeatherCondition::Dry)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeatherCondition::Dry => "dry",
            WeatherCondition::LightRain => "light_rain",
            WeatherCondition::HeavyRain => "heavy_rain",
        }
    }

    /// others returns the two conditions the weather can switch to from the current one.
    pub fn others(self) -> [WeatherCondition; 2] {
        match self {
            WeatherCondition::Dry => [WeatherCondition::LightRain, WeatherCondition::HeavyRain],
            WeatherCondition::LightRain => [WeatherCondition::Dry, WeatherCondition::HeavyRain],
            WeatherCondition::HeavyRain => [WeatherCondition::Dry, WeatherCondition::LightRain],
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WeatherCondition {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dry" => Ok(WeatherCondition::Dry),
            "light_rain" => Ok(WeatherCondition::LightRain),
            "heavy_rain" => Ok(WeatherCondition::HeavyRain),
            other => Err(SimError::invalid(format!(
                "unknown weather condition '{}'",
                other
            ))),
        }
    }
}

/// * `lap` - Lap at the start of which the change is evaluated
/// * `from` - Condition that must be active for the change to happen
/// * `to` - Condition after the change
/// * `probability` - Probability that the forecast change actually happens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherChange {
    pub lap: u32,
    pub from: WeatherCondition,
    pub to: WeatherCondition,
    #[serde(default = "default_change_probability")]
    pub probability: f64,
}

fn default_change_probability() -> f64 {
    1.0
}

/// Weather holds the single condition shared by all cars of a session. Only the race simulator
/// mutates it, once per lap.
#[derive(Debug, Clone)]
pub struct Weather {
    condition: WeatherCondition,
    scheduled: Vec<WeatherChange>,
    change_probability: f64,
    history: Vec<WeatherCondition>,
}

impl Weather {
    pub fn new(
        initial: WeatherCondition,
        scheduled: &[WeatherChange],
        change_probability: f64,
    ) -> Weather {
        let mut scheduled = scheduled.to_vec();
        scheduled.sort_by_key(|change| change.lap);

        Weather {
            condition: initial,
            scheduled,
            change_probability,
            history: Vec::new(),
        }
    }

    pub fn condition(&self) -> WeatherCondition {
        self.condition
    }

    /// history contains the condition of every simulated lap (index 0 is lap 1).
    pub fn history(&self) -> &[WeatherCondition] {
        &self.history
    }

    /// update evaluates the weather for the given lap and returns the previous condition if it
    /// changed. A forecast change scheduled for the lap takes precedence over the random roll.
    /// The first lap always starts with the initial condition.
    pub fn update<R: Rng + ?Sized>(&mut self, lap: u32, rng: &mut R) -> Option<WeatherCondition> {
        let prev = self.condition;

        if lap > 1 {
            let scheduled = self
                .scheduled
                .iter()
                .find(|change| change.lap == lap && change.from == prev)
                .copied();

            if let Some(change) = scheduled {
                if change.to != prev && rng.gen::<f64>() < change.probability {
                    self.condition = change.to;
                }
            } else if rng.gen::<f64>() < self.change_probability {
                self.condition = *prev
                    .others()
                    .choose(rng)
                    .unwrap_or(&prev);
            }
        }

        self.history.push(self.condition);

        if self.condition != prev {
            Some(prev)
        } else {
            None
        }
    }
}
