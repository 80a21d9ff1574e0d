use crate::core::tyre::{default_for, is_appropriate, TyreCompound};
use crate::core::weather::WeatherCondition;
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tyre wear above which cars without a strategy come in for fresh tyres.
pub const NO_STRATEGY_PIT_WEAR: f64 = 85.0;

/// ContingencyAction is the reaction of a team to a change of the track condition while the
/// mounted tyre does not suit the new condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContingencyAction {
    /// Stay out and wait for the next scheduled stop
    Continue,
    /// Switch to a suitable compound at the next scheduled stop
    NextPit,
    PitWet,
    PitExtreme,
    /// Pit now for the compound matching the new condition
    ImmediatePit,
    PitSoft,
    PitMedium,
}

impl ContingencyAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ContingencyAction::Continue => "continue",
            ContingencyAction::NextPit => "next_pit",
            ContingencyAction::PitWet => "pit_wet",
            ContingencyAction::PitExtreme => "pit_extreme",
            ContingencyAction::ImmediatePit => "immediate_pit",
            ContingencyAction::PitSoft => "pit_soft",
            ContingencyAction::PitMedium => "pit_medium",
        }
    }

    /// forced_compound returns the compound mounted by an immediate stop, or None if the action
    /// does not force a stop.
    pub fn forced_compound(self, weather: WeatherCondition) -> Option<TyreCompound> {
        match self {
            ContingencyAction::Continue | ContingencyAction::NextPit => None,
            ContingencyAction::PitWet => Some(TyreCompound::Wet),
            ContingencyAction::PitExtreme => Some(TyreCompound::ExtremeWet),
            ContingencyAction::ImmediatePit => Some(default_for(weather)),
            ContingencyAction::PitSoft => Some(TyreCompound::Soft),
            ContingencyAction::PitMedium => Some(TyreCompound::Medium),
        }
    }
}

impl fmt::Display for ContingencyAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContingencyAction {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(ContingencyAction::Continue),
            "next_pit" => Ok(ContingencyAction::NextPit),
            "pit_wet" => Ok(ContingencyAction::PitWet),
            "pit_extreme" => Ok(ContingencyAction::PitExtreme),
            "immediate_pit" => Ok(ContingencyAction::ImmediatePit),
            "pit_soft" => Ok(ContingencyAction::PitSoft),
            "pit_medium" => Ok(ContingencyAction::PitMedium),
            other => Err(SimError::invalid(format!(
                "unknown contingency action '{}'",
                other
            ))),
        }
    }
}

/// Contingency holds one reaction per track condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contingency {
    pub rain: ContingencyAction,
    pub heavy_rain: ContingencyAction,
    pub dry: ContingencyAction,
}

impl Default for Contingency {
    fn default() -> Self {
        Contingency {
            rain: ContingencyAction::Continue,
            heavy_rain: ContingencyAction::Continue,
            dry: ContingencyAction::Continue,
        }
    }
}

impl Contingency {
    /// fallback is used by cars without a strategy: they always pit for the default compound.
    pub fn fallback() -> Contingency {
        Contingency {
            rain: ContingencyAction::ImmediatePit,
            heavy_rain: ContingencyAction::ImmediatePit,
            dry: ContingencyAction::ImmediatePit,
        }
    }

    pub fn for_condition(&self, weather: WeatherCondition) -> ContingencyAction {
        match weather {
            WeatherCondition::Dry => self.dry,
            WeatherCondition::LightRain => self.rain,
            WeatherCondition::HeavyRain => self.heavy_rain,
        }
    }
}

/// * `tyre` - Compound name, one of soft, medium, hard, wet, extreme_wet
/// * `laps` - Planned number of laps on the compound
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SegmentPars {
    pub tyre: String,
    pub laps: i64,
}

/// StrategyPars is the strategy as authored by a team, before validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyPars {
    #[serde(default)]
    pub name: Option<String>,
    pub segments: Vec<SegmentPars>,
    #[serde(default = "default_action")]
    pub rain_strategy: String,
    #[serde(default = "default_action")]
    pub heavy_rain_strategy: String,
    #[serde(default = "default_action")]
    pub dry_strategy: String,
}

fn default_action() -> String {
    "continue".to_owned()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub compound: TyreCompound,
    pub laps: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub segments: Vec<Segment>,
    pub contingency: Contingency,
}

impl StrategyPars {
    /// validate converts the authored strategy into a typed strategy. Segments without laps,
    /// unknown compounds and contingencies that would mount an unsuitable tyre are rejected.
    pub fn validate(&self) -> Result<Strategy, SimError> {
        if self.segments.is_empty() {
            return Err(SimError::invalid("strategy without segments"));
        }

        let mut segments = Vec::with_capacity(self.segments.len());
        for (i, segment) in self.segments.iter().enumerate() {
            if segment.laps <= 0 || segment.laps > u32::MAX as i64 {
                return Err(SimError::invalid(format!(
                    "segment {} plans {} laps",
                    i + 1,
                    segment.laps
                )));
            }
            segments.push(Segment {
                compound: segment.tyre.parse()?,
                laps: segment.laps as u32,
            });
        }

        let contingency = Contingency {
            rain: self.rain_strategy.parse()?,
            heavy_rain: self.heavy_rain_strategy.parse()?,
            dry: self.dry_strategy.parse()?,
        };

        for weather in WeatherCondition::ALL {
            let action = contingency.for_condition(weather);
            if let Some(compound) = action.forced_compound(weather) {
                if !is_appropriate(compound, weather) {
                    return Err(SimError::invalid(format!(
                        "contingency '{}' mounts {} in {} conditions",
                        action, compound, weather
                    )));
                }
            }
        }

        Ok(Strategy {
            segments,
            contingency,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitReason {
    /// End of a planned segment
    Scheduled,
    /// Worn tyres of a car without (remaining) strategy
    Worn,
    /// Track condition changed and the tyre does not suit it anymore
    Weather,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitDecision {
    pub compound: TyreCompound,
    pub reason: PitReason,
}

/// StrategyHandler tracks the progress of a car through its strategy and decides on pit stops
/// once per lap.
#[derive(Debug, Clone)]
pub struct StrategyHandler {
    strategy: Option<Strategy>,
    segment_idx: usize,
    laps_in_segment: u32,
    laps_since_pit: u32,
    pending_weather_swap: bool,
}

impl StrategyHandler {
    pub fn new(strategy: Option<Strategy>) -> StrategyHandler {
        StrategyHandler {
            strategy,
            segment_idx: 0,
            laps_in_segment: 0,
            laps_since_pit: 0,
            pending_weather_swap: false,
        }
    }

    /// start_compound returns the compound of the first segment or the default for the weather.
    pub fn start_compound(&self, weather: WeatherCondition) -> TyreCompound {
        self.strategy
            .as_ref()
            .and_then(|strategy| strategy.segments.first())
            .map(|segment| segment.compound)
            .unwrap_or_else(|| default_for(weather))
    }

    pub fn segment_idx(&self) -> usize {
        self.segment_idx
    }

    pub fn laps_since_pit(&self) -> u32 {
        self.laps_since_pit
    }

    /// on_final_stint returns true if no further scheduled stop exists.
    pub fn on_final_stint(&self) -> bool {
        match &self.strategy {
            Some(strategy) => self.segment_idx + 1 >= strategy.segments.len(),
            None => true,
        }
    }

    fn contingency(&self) -> Contingency {
        self.strategy
            .as_ref()
            .map(|strategy| strategy.contingency)
            .unwrap_or_else(Contingency::fallback)
    }

    /// on_lap advances the counters by one lap and returns the pit stop to perform this lap, if
    /// any. `weather_changed` must only be true on the lap the shared condition changed.
    pub fn on_lap(
        &mut self,
        mounted: TyreCompound,
        wear: f64,
        weather: WeatherCondition,
        weather_changed: bool,
    ) -> Option<PitDecision> {
        self.laps_in_segment += 1;
        self.laps_since_pit += 1;

        // contingency reaction to the new condition
        let mut forced = None;
        if weather_changed && !is_appropriate(mounted, weather) {
            let action = self.contingency().for_condition(weather);
            match action {
                ContingencyAction::Continue => {}
                ContingencyAction::NextPit => self.pending_weather_swap = true,
                _ => forced = action.forced_compound(weather),
            }
        }

        // scheduled stop at the end of a segment
        let next_segment = self.strategy.as_ref().and_then(|strategy| {
            let cur = strategy.segments.get(self.segment_idx)?;
            if self.laps_in_segment >= cur.laps {
                strategy.segments.get(self.segment_idx + 1).copied()
            } else {
                None
            }
        });

        if let Some(segment) = next_segment {
            // a planned compound that does not suit the condition is replaced unless the team
            // chose to continue in this condition
            let action = self.contingency().for_condition(weather);
            let compound = if let Some(compound) = forced {
                compound
            } else if !is_appropriate(segment.compound, weather)
                && (self.pending_weather_swap || action != ContingencyAction::Continue)
            {
                action
                    .forced_compound(weather)
                    .unwrap_or_else(|| default_for(weather))
            } else {
                segment.compound
            };
            self.pending_weather_swap = false;
            self.segment_idx += 1;
            self.laps_in_segment = 0;
            self.laps_since_pit = 0;
            return Some(PitDecision {
                compound,
                reason: PitReason::Scheduled,
            });
        }

        if let Some(compound) = forced {
            self.laps_since_pit = 0;
            return Some(PitDecision {
                compound,
                reason: PitReason::Weather,
            });
        }

        if self.strategy.is_none() && wear > NO_STRATEGY_PIT_WEAR {
            self.laps_since_pit = 0;
            return Some(PitDecision {
                compound: default_for(weather),
                reason: PitReason::Worn,
            });
        }

        None
    }

    /// record_unplanned_pit informs the handler about a stop that was not decided by `on_lap`.
    pub fn record_unplanned_pit(&mut self) {
        self.laps_since_pit = 0;
    }
}
