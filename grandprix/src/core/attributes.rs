use helpers::general::mean;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Neutral car performance used if a team has no components registered.
pub const DEFAULT_CAR_STRENGTH: f64 = 50.0;
pub const DEFAULT_CAR_RELIABILITY: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Engine,
    Aerodynamics,
    Brakes,
    Suspension,
}

impl ComponentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Engine => "engine",
            ComponentType::Aerodynamics => "aerodynamics",
            ComponentType::Brakes => "brakes",
            ComponentType::Suspension => "suspension",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// * `component_type` - Part of the car
/// * `strength` - Performance of the part (0-100)
/// * `reliability` - Reliability of the part (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarComponent {
    pub component_type: ComponentType,
    pub strength: u8,
    pub reliability: u8,
}

impl CarComponent {
    /// apply_upgrade applies a finished development package of the given level (1-3).
    pub fn apply_upgrade(&mut self, level: u8) {
        self.strength = self.strength.saturating_add(5 * level).min(100);
        self.reliability = self.reliability.saturating_add(3 * level).min(100);
    }
}

/// * `pit_stop_skill` - Speed of the crew during tyre changes (0-100)
/// * `reliability_skill` - Quality of the car preparation (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MechanicPars {
    pub pit_stop_skill: u8,
    pub reliability_skill: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CarPerformance {
    pub strength: f64,
    pub reliability: f64,
}

impl Default for CarPerformance {
    fn default() -> Self {
        CarPerformance {
            strength: DEFAULT_CAR_STRENGTH,
            reliability: DEFAULT_CAR_RELIABILITY,
        }
    }
}

/// car_performance averages strength and reliability over all components of a car.
pub fn car_performance(components: &[CarComponent]) -> CarPerformance {
    let strength = mean(components.iter().map(|c| c.strength as f64));
    let reliability = mean(components.iter().map(|c| c.reliability as f64));

    match (strength, reliability) {
        (Some(strength), Some(reliability)) => CarPerformance {
            strength,
            reliability,
        },
        _ => CarPerformance::default(),
    }
}

/// driver_pace returns the lap time loss (s) of a driver. Skill weighs more than experience, a
/// perfect driver loses nothing.
pub fn driver_pace(skill: u8, experience: u8) -> f64 {
    let rating = 0.6 * skill as f64 + 0.4 * experience as f64;
    (100.0 - rating) / 50.0
}

/// car_pace returns the lap time delta (s) caused by the car strength, negative for cars above
/// the neutral value.
pub fn car_pace(strength: f64) -> f64 {
    (DEFAULT_CAR_STRENGTH - strength) * 0.02
}

/// qualifying_driver_effect returns the time (s) a driver gains on a single push lap.
pub fn qualifying_driver_effect(skill: u8, experience: u8) -> f64 {
    (skill as f64 + experience as f64) / 2.0 / 100.0 * 5.0
}

/// qualifying_car_effect returns the time (s) a car gains on a single push lap.
pub fn qualifying_car_effect(strength: f64) -> f64 {
    strength / 100.0 * 3.0
}

/// pit_crew_offset returns the pit stop time delta (s) of the mechanics crew. Without mechanics
/// the nominal stop time applies.
pub fn pit_crew_offset(mechanics: &[MechanicPars]) -> f64 {
    mean(mechanics.iter().map(|m| m.pit_stop_skill as f64))
        .map(|skill| (50.0 - skill) / 100.0 * 0.5)
        .unwrap_or(0.0)
}

/// crew_reliability_bonus returns the reliability points added by the mechanics crew.
pub fn crew_reliability_bonus(mechanics: &[MechanicPars]) -> f64 {
    mean(mechanics.iter().map(|m| m.reliability_skill as f64))
        .map(|skill| (skill - 50.0) / 10.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn component(component_type: ComponentType, strength: u8, reliability: u8) -> CarComponent {
        CarComponent {
            component_type,
            strength,
            reliability,
        }
    }

    #[test]
    fn empty_car_is_neutral() {
        let perf = car_performance(&[]);
        assert_relative_eq!(perf.strength, DEFAULT_CAR_STRENGTH);
        assert_relative_eq!(perf.reliability, DEFAULT_CAR_RELIABILITY);
    }

    #[test]
    fn performance_stays_within_component_bounds() {
        let sets = [
            vec![
                component(ComponentType::Engine, 90, 20),
                component(ComponentType::Aerodynamics, 10, 95),
                component(ComponentType::Brakes, 55, 60),
                component(ComponentType::Suspension, 70, 40),
            ],
            vec![component(ComponentType::Engine, 0, 100)],
            vec![
                component(ComponentType::Brakes, 100, 0),
                component(ComponentType::Suspension, 100, 0),
            ],
        ];

        for set in sets.iter() {
            let perf = car_performance(set);
            let s_min = set.iter().map(|c| c.strength).min().unwrap() as f64;
            let s_max = set.iter().map(|c| c.strength).max().unwrap() as f64;
            let r_min = set.iter().map(|c| c.reliability).min().unwrap() as f64;
            let r_max = set.iter().map(|c| c.reliability).max().unwrap() as f64;
            assert!(perf.strength >= s_min && perf.strength <= s_max);
            assert!(perf.reliability >= r_min && perf.reliability <= r_max);
        }

        assert_relative_eq!(car_performance(&sets[0]).strength, 56.25);
    }

    #[test]
    fn better_drivers_are_faster() {
        assert!(driver_pace(90, 50) < driver_pace(80, 50));
        assert!(driver_pace(80, 90) < driver_pace(80, 50));
        assert_relative_eq!(driver_pace(100, 100), 0.0);
        assert!(qualifying_driver_effect(90, 90) > qualifying_driver_effect(50, 50));
    }

    #[test]
    fn stronger_cars_are_faster() {
        assert!(car_pace(80.0) < car_pace(50.0));
        assert_relative_eq!(car_pace(DEFAULT_CAR_STRENGTH), 0.0);
    }

    #[test]
    fn upgrades_are_capped() {
        let mut engine = component(ComponentType::Engine, 95, 98);
        engine.apply_upgrade(2);
        assert_eq!(engine.strength, 100);
        assert_eq!(engine.reliability, 100);

        let mut brakes = component(ComponentType::Brakes, 50, 50);
        brakes.apply_upgrade(3);
        assert_eq!(brakes.strength, 65);
        assert_eq!(brakes.reliability, 59);
    }

    #[test]
    fn crew_effects_default_to_zero() {
        assert_relative_eq!(pit_crew_offset(&[]), 0.0);
        assert_relative_eq!(crew_reliability_bonus(&[]), 0.0);

        let crew = [MechanicPars {
            pit_stop_skill: 100,
            reliability_skill: 80,
        }];
        assert_relative_eq!(pit_crew_offset(&crew), -0.25);
        assert_relative_eq!(crew_reliability_bonus(&crew), 3.0);
    }
}
