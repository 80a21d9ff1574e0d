use crate::core::weather::WeatherCondition;
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wear is an accumulator in percent of a nominal tyre life. Worn-out tyres keep running up to
/// this value, beyond it wear is capped.
pub const MAX_TYRE_WEAR: f64 = 150.0;

/// Wear multiplier for dry compounds on a wet track.
const WRONG_CONDITION_WEAR_FACTOR: f64 = 1.5;

/// Lap time loss (s) per remaining warm-up lap of a fresh set.
pub const WARMUP_PENALTY_PER_LAP: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TyreCompound {
    Soft,
    Medium,
    Hard,
    Wet,
    ExtremeWet,
}

/// Static characteristics of a compound as shown to the teams.
/// * `dry_performance` - Relative grip on a dry track (0-100)
/// * `wet_performance` - Relative grip on a wet track (0-100)
/// * `durability` - Wear (percent of nominal life) at which the set is worn out
/// * `warmup_laps` - Laps until the tyre reaches its working window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompoundData {
    pub dry_performance: u8,
    pub wet_performance: u8,
    pub durability: u8,
    pub warmup_laps: u8,
}

impl TyreCompound {
    pub const ALL: [TyreCompound; 5] = [
        TyreCompound::Soft,
        TyreCompound::Medium,
        TyreCompound::Hard,
        TyreCompound::Wet,
        TyreCompound::ExtremeWet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TyreCompound::Soft => "soft",
            TyreCompound::Medium => "medium",
            TyreCompound::Hard => "hard",
            TyreCompound::Wet => "wet",
            TyreCompound::ExtremeWet => "extreme_wet",
        }
    }

    /// is_dry returns true for slick compounds.
    pub fn is_dry(self) -> bool {
        matches!(
            self,
            TyreCompound::Soft | TyreCompound::Medium | TyreCompound::Hard
        )
    }

    pub fn data(self) -> CompoundData {
        let (dry_performance, wet_performance, durability, warmup_laps) = match self {
            TyreCompound::Soft => (100, 45, 120, 2),
            TyreCompound::Medium => (85, 35, 130, 3),
            TyreCompound::Hard => (70, 25, 140, 4),
            TyreCompound::Wet => (45, 85, 150, 1),
            TyreCompound::ExtremeWet => (30, 100, 150, 1),
        };
        CompoundData {
            dry_performance,
            wet_performance,
            durability,
            warmup_laps,
        }
    }

    /// wear_rate returns the nominal wear per lap in the given conditions.
    pub fn wear_rate(self, weather: WeatherCondition) -> f64 {
        let rate = match self {
            TyreCompound::Soft => 6.0,
            TyreCompound::Medium => 4.0,
            TyreCompound::Hard => 2.5,
            TyreCompound::Wet => 3.0,
            TyreCompound::ExtremeWet => 2.0,
        };

        if self.is_dry() && !weather.is_dry() {
            rate * WRONG_CONDITION_WEAR_FACTOR
        } else {
            rate
        }
    }

    /// base_laptime returns the race lap time (s) on fresh tyres of this compound, including the
    /// time loss caused by the track condition.
    pub fn base_laptime(self, weather: WeatherCondition) -> f64 {
        let dry_time = match self {
            TyreCompound::Soft => 76.0,
            TyreCompound::Medium => 78.0,
            TyreCompound::Hard => 80.0,
            TyreCompound::Wet => 84.0,
            TyreCompound::ExtremeWet => 88.0,
        };

        let weather_loss = match (weather, self) {
            (WeatherCondition::Dry, _) => 0.0,
            (WeatherCondition::LightRain, TyreCompound::Wet) => 0.5,
            (WeatherCondition::LightRain, TyreCompound::ExtremeWet) => 2.0,
            (WeatherCondition::LightRain, _) => 6.0,
            (WeatherCondition::HeavyRain, TyreCompound::Wet) => 3.0,
            (WeatherCondition::HeavyRain, TyreCompound::ExtremeWet) => 1.0,
            (WeatherCondition::HeavyRain, _) => 12.0,
        };

        dry_time + weather_loss
    }

    /// qualifying_offset returns the deterministic lap time delta (s) of a single qualifying lap
    /// on this compound relative to a hard tyre on a dry track.
    pub fn qualifying_offset(self, weather: WeatherCondition) -> f64 {
        let dry_offset = match self {
            TyreCompound::Soft => -2.0,
            TyreCompound::Medium => -1.0,
            TyreCompound::Hard => 0.0,
            TyreCompound::Wet => 8.0,
            TyreCompound::ExtremeWet => 12.0,
        };

        match (weather, self) {
            (WeatherCondition::Dry, _) => dry_offset,
            (WeatherCondition::LightRain, TyreCompound::Wet) => 2.0,
            (WeatherCondition::LightRain, TyreCompound::ExtremeWet) => 4.0,
            (WeatherCondition::LightRain, _) => dry_offset + 15.0,
            (WeatherCondition::HeavyRain, TyreCompound::Wet) => dry_offset + 8.0,
            (WeatherCondition::HeavyRain, TyreCompound::ExtremeWet) => 3.0,
            (WeatherCondition::HeavyRain, _) => dry_offset + 25.0,
        }
    }
}

impl fmt::Display for TyreCompound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TyreCompound {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "soft" => Ok(TyreCompound::Soft),
            "medium" => Ok(TyreCompound::Medium),
            "hard" => Ok(TyreCompound::Hard),
            "wet" => Ok(TyreCompound::Wet),
            "extreme_wet" => Ok(TyreCompound::ExtremeWet),
            other => Err(SimError::invalid(format!("unknown tyre compound '{}'", other))),
        }
    }
}

/// is_appropriate returns true if the compound may be run in the given condition: slicks only on
/// a dry track, intermediates (wet) only in light rain, full wets in any rain.
pub fn is_appropriate(compound: TyreCompound, weather: WeatherCondition) -> bool {
    match weather {
        WeatherCondition::Dry => compound.is_dry(),
        WeatherCondition::LightRain => {
            matches!(compound, TyreCompound::Wet | TyreCompound::ExtremeWet)
        }
        WeatherCondition::HeavyRain => matches!(compound, TyreCompound::ExtremeWet),
    }
}

/// default_for returns the compound mounted by cars without a strategy.
pub fn default_for(weather: WeatherCondition) -> TyreCompound {
    match weather {
        WeatherCondition::Dry => TyreCompound::Hard,
        WeatherCondition::LightRain => TyreCompound::Wet,
        WeatherCondition::HeavyRain => TyreCompound::ExtremeWet,
    }
}

/// wear_penalty returns the lap time loss (s) caused by the current tyre wear.
pub fn wear_penalty(wear: f64) -> f64 {
    if wear <= 20.0 {
        0.0
    } else if wear <= 40.0 {
        (wear - 20.0) * 0.05
    } else if wear <= 60.0 {
        1.0 + (wear - 40.0) * 0.08
    } else if wear <= 80.0 {
        2.6 + (wear - 60.0) * 0.12
    } else if wear <= 100.0 {
        5.0 + (wear - 80.0) * 0.25
    } else if wear <= 120.0 {
        10.0 + (wear - 100.0) * 0.5
    } else {
        20.0 + (wear - 120.0)
    }
}

/// Tyre is the set currently mounted on a car.
#[derive(Debug, Clone)]
pub struct Tyre {
    pub compound: TyreCompound,
    wear: f64,
    age_cur_stint: u32,
}

impl Tyre {
    pub fn new(compound: TyreCompound) -> Tyre {
        Tyre {
            compound,
            wear: 0.0,
            age_cur_stint: 0,
        }
    }

    pub fn wear(&self) -> f64 {
        self.wear
    }

    /// age_cur_stint returns the number of laps driven on this set.
    pub fn age_cur_stint(&self) -> u32 {
        self.age_cur_stint
    }

    /// drive_lap ages the tyre by one lap. Negative increments are ignored such that wear never
    /// decreases within a stint.
    pub fn drive_lap(&mut self, wear_increment: f64) {
        self.wear = (self.wear + wear_increment.max(0.0)).min(MAX_TYRE_WEAR);
        self.age_cur_stint += 1;
    }

    /// is_worn_out returns true once the wear reached the durability of the compound.
    pub fn is_worn_out(&self) -> bool {
        self.wear >= self.compound.data().durability as f64
    }

    /// t_add_warmup returns the time loss of a set that is not yet in its working window.
    pub fn t_add_warmup(&self) -> f64 {
        let warmup_laps = self.compound.data().warmup_laps as u32;
        warmup_laps.saturating_sub(self.age_cur_stint) as f64 * WARMUP_PENALTY_PER_LAP
    }

    /// t_add_tyre returns the current time loss due to tyre wear and warm-up.
    pub fn t_add_tyre(&self) -> f64 {
        wear_penalty(self.wear) + self.t_add_warmup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn appropriateness_follows_condition() {
        for compound in [TyreCompound::Soft, TyreCompound::Medium, TyreCompound::Hard] {
            assert!(is_appropriate(compound, WeatherCondition::Dry));
            assert!(!is_appropriate(compound, WeatherCondition::LightRain));
            assert!(!is_appropriate(compound, WeatherCondition::HeavyRain));
        }
        assert!(!is_appropriate(TyreCompound::Wet, WeatherCondition::Dry));
        assert!(is_appropriate(TyreCompound::Wet, WeatherCondition::LightRain));
        assert!(!is_appropriate(TyreCompound::Wet, WeatherCondition::HeavyRain));
        assert!(!is_appropriate(TyreCompound::ExtremeWet, WeatherCondition::Dry));
        assert!(is_appropriate(TyreCompound::ExtremeWet, WeatherCondition::LightRain));
        assert!(is_appropriate(TyreCompound::ExtremeWet, WeatherCondition::HeavyRain));
    }

    #[test]
    fn defaults_are_appropriate() {
        for weather in WeatherCondition::ALL {
            assert!(is_appropriate(default_for(weather), weather));
        }
        assert_eq!(default_for(WeatherCondition::Dry), TyreCompound::Hard);
    }

    #[test]
    fn compound_table_is_ordered() {
        let soft = TyreCompound::Soft.data();
        let hard = TyreCompound::Hard.data();
        assert!(soft.dry_performance > hard.dry_performance);
        assert!(soft.durability < hard.durability);
        assert!(soft.warmup_laps < hard.warmup_laps);

        let best_wet = TyreCompound::ALL
            .iter()
            .max_by_key(|compound| compound.data().wet_performance)
            .copied();
        assert_eq!(best_wet, Some(TyreCompound::ExtremeWet));
    }

    #[test]
    fn slicks_wear_faster_in_the_rain() {
        assert_relative_eq!(TyreCompound::Soft.wear_rate(WeatherCondition::Dry), 6.0);
        assert_relative_eq!(TyreCompound::Soft.wear_rate(WeatherCondition::LightRain), 9.0);
        assert_relative_eq!(TyreCompound::Wet.wear_rate(WeatherCondition::HeavyRain), 3.0);
    }

    #[test]
    fn wear_penalty_is_continuous_and_increasing() {
        let mut prev = wear_penalty(0.0);
        let mut wear = 0.5;
        while wear <= MAX_TYRE_WEAR {
            let cur = wear_penalty(wear);
            assert!(cur >= prev);
            assert!(cur - prev < 1.0);
            prev = cur;
            wear += 0.5;
        }
        assert_relative_eq!(wear_penalty(80.0), 5.0);
        assert_relative_eq!(wear_penalty(100.0), 10.0);
    }

    #[test]
    fn tyre_wear_is_capped_and_monotone() {
        let mut tyre = Tyre::new(TyreCompound::Soft);
        tyre.drive_lap(100.0);
        tyre.drive_lap(-5.0);
        assert_relative_eq!(tyre.wear(), 100.0);
        tyre.drive_lap(100.0);
        assert_relative_eq!(tyre.wear(), MAX_TYRE_WEAR);
        assert_eq!(tyre.age_cur_stint(), 3);
    }

    #[test]
    fn fresh_tyres_lose_time_until_warmed_up() {
        let mut tyre = Tyre::new(TyreCompound::Hard);
        assert_relative_eq!(tyre.t_add_tyre(), 4.0 * WARMUP_PENALTY_PER_LAP);

        tyre.drive_lap(0.0);
        tyre.drive_lap(0.0);
        assert_relative_eq!(tyre.t_add_tyre(), 2.0 * WARMUP_PENALTY_PER_LAP);

        tyre.drive_lap(0.0);
        tyre.drive_lap(0.0);
        assert_relative_eq!(tyre.t_add_tyre(), 0.0);

        let wet = Tyre::new(TyreCompound::Wet);
        assert!(wet.t_add_warmup() < Tyre::new(TyreCompound::Soft).t_add_warmup());
    }

    #[test]
    fn durability_marks_worn_out_sets() {
        let mut soft = Tyre::new(TyreCompound::Soft);
        soft.drive_lap(119.0);
        assert!(!soft.is_worn_out());
        soft.drive_lap(1.0);
        assert!(soft.is_worn_out());

        let mut wet = Tyre::new(TyreCompound::Wet);
        wet.drive_lap(140.0);
        assert!(!wet.is_worn_out());
        assert!(TyreCompound::ALL
            .iter()
            .all(|c| c.data().durability as f64 <= MAX_TYRE_WEAR));
    }

    #[test]
    fn unknown_compound_is_rejected() {
        assert_eq!("Extreme_Wet".parse::<TyreCompound>(), Ok(TyreCompound::ExtremeWet));
        assert!(matches!(
            "intermediate".parse::<TyreCompound>(),
            Err(SimError::InvalidInput(_))
        ));
    }
}
