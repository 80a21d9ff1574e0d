use crate::core::attributes::{CarComponent, ComponentType, MechanicPars};
use crate::core::competitor::CompetitorPars;
use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Training and development packages come in three levels.
pub const MAX_LEVEL: u8 = 3;

/// Attribute points gained per training level.
const TRAINING_GAIN_PER_LEVEL: u8 = 3;

/// * `innovation` - Quality of new parts (0-100)
/// * `development_speed` - Speed of the development of new parts (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineerPars {
    pub innovation: u8,
    pub development_speed: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainableAttribute {
    Skill,
    Experience,
    Aggression,
    Consistency,
    PitStopSkill,
    ReliabilitySkill,
    Innovation,
    DevelopmentSpeed,
}

impl TrainableAttribute {
    pub fn as_str(self) -> &'static str {
        match self {
            TrainableAttribute::Skill => "skill",
            TrainableAttribute::Experience => "experience",
            TrainableAttribute::Aggression => "aggression",
            TrainableAttribute::Consistency => "consistency",
            TrainableAttribute::PitStopSkill => "pit_stop_skill",
            TrainableAttribute::ReliabilitySkill => "reliability_skill",
            TrainableAttribute::Innovation => "innovation",
            TrainableAttribute::DevelopmentSpeed => "development_speed",
        }
    }
}

impl fmt::Display for TrainableAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TrainableAttribute {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skill" => Ok(TrainableAttribute::Skill),
            "experience" => Ok(TrainableAttribute::Experience),
            "aggression" => Ok(TrainableAttribute::Aggression),
            "consistency" => Ok(TrainableAttribute::Consistency),
            "pit_stop_skill" => Ok(TrainableAttribute::PitStopSkill),
            "reliability_skill" => Ok(TrainableAttribute::ReliabilitySkill),
            "innovation" => Ok(TrainableAttribute::Innovation),
            "development_speed" => Ok(TrainableAttribute::DevelopmentSpeed),
            other => Err(SimError::invalid(format!(
                "unknown trainable attribute '{}'",
                other
            ))),
        }
    }
}

/// Trainee is the staff member receiving a training.
#[derive(Debug)]
pub enum Trainee<'a> {
    Driver(&'a mut CompetitorPars),
    Mechanic(&'a mut MechanicPars),
    Engineer(&'a mut EngineerPars),
}

fn check_level(level: u8) -> Result<(), SimError> {
    if (1..=MAX_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(SimError::invalid(format!(
            "level {} not in range 1-{}",
            level, MAX_LEVEL
        )))
    }
}

fn improve(value: &mut u8, level: u8) -> u8 {
    *value = value
        .saturating_add(level * TRAINING_GAIN_PER_LEVEL)
        .min(100);
    *value
}

/// apply_training applies a finished training of the given level to the trainee and returns the
/// new attribute value. Attributes never exceed 100.
pub fn apply_training(
    trainee: Trainee,
    attribute: TrainableAttribute,
    level: u8,
) -> Result<u8, SimError> {
    check_level(level)?;

    let value = match (trainee, attribute) {
        (Trainee::Driver(driver), TrainableAttribute::Skill) => &mut driver.skill,
        (Trainee::Driver(driver), TrainableAttribute::Experience) => &mut driver.experience,
        (Trainee::Driver(driver), TrainableAttribute::Aggression) => &mut driver.aggression,
        (Trainee::Driver(driver), TrainableAttribute::Consistency) => &mut driver.consistency,
        (Trainee::Mechanic(mechanic), TrainableAttribute::PitStopSkill) => {
            &mut mechanic.pit_stop_skill
        }
        (Trainee::Mechanic(mechanic), TrainableAttribute::ReliabilitySkill) => {
            &mut mechanic.reliability_skill
        }
        (Trainee::Engineer(engineer), TrainableAttribute::Innovation) => &mut engineer.innovation,
        (Trainee::Engineer(engineer), TrainableAttribute::DevelopmentSpeed) => {
            &mut engineer.development_speed
        }
        (_, attribute) => {
            return Err(SimError::invalid(format!(
                "{} cannot be trained by this staff member",
                attribute
            )))
        }
    };

    Ok(improve(value, level))
}

/// apply_upgrade applies a finished development package to the given component of a car.
pub fn apply_upgrade(
    components: &mut [CarComponent],
    component_type: ComponentType,
    level: u8,
) -> Result<CarComponent, SimError> {
    check_level(level)?;

    let component = components
        .iter_mut()
        .find(|c| c.component_type == component_type)
        .ok_or_else(|| SimError::invalid(format!("car has no {}", component_type)))?;
    component.apply_upgrade(level);

    Ok(*component)
}
