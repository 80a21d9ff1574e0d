use serde::{Deserialize, Serialize};

/// SimConstants contains the tuning parameters of the simulation. Every field has a default, a
/// constants file only needs to contain the values that should differ.
///
/// Weather
/// * `weather_change_probability` - Probability per lap (from lap 2) that the condition changes
///
/// Race
/// * `min_lap_time` - (s) Lower bound of any race lap time
/// * `lap_jitter_scale` - (s) Standard deviation of the lap time jitter of a driver with
///   consistency 0, scaled down linearly to 0 for consistency 100
/// * `max_lap_jitter` - (s) Bound of the lap time jitter
/// * `flavor_event_probability` - Probability per lap of a fast lap, spin or off-track excursion
/// * `t_spin` / `t_off_track` - (s) Minimum time loss of a spin / an excursion, the random part
///   adds up to half of it on top
/// * `pit_base_time` - (s) Nominal time lost in a pit stop
/// * `pit_jitter` - (s) Upper bound of the uniform pit stop time jitter
///
/// Overtaking
/// * `overtake_window` - (s) Maximum gap between two cars for an overtaking attempt
/// * `overtake_base_probability` - Probability of a swap between two equal cars
/// * `overtake_skill_factor` - Probability added per skill point advantage of the attacker
/// * `overtake_wear_factor` - Probability added per wear point advantage of the attacker
/// * `overtake_aggression_factor` - Probability added per aggression point of the attacker
/// * `overtake_max_probability` - Upper bound of the swap probability
/// * `t_overtake_gap` - (s) Gap between attacker and defender after a swap
/// * `t_overtake_loser` - (s) Time lost by the defender in a swap
///
/// Tyre backstop (cars without further scheduled stops)
/// * `backstop_wear` - Tyre wear above which an unplanned stop is considered
/// * `backstop_min_gap` - Laps since the last stop before an unplanned stop is considered
/// * `backstop_pit_probability` - Probability of the unplanned stop per lap
///
/// Failures
/// * `max_failure_risk` - Upper bound of the failure probability per lap
/// * `early_laps` - Number of laps at the start in which the risk is reduced
/// * `early_lap_damping` - Risk multiplier during the early laps
/// * `teammate_retired_damping` - Risk multiplier once a teammate retired
/// * `field_retired_fraction` - Share of retired cars above which the field damping applies
/// * `field_retired_damping` - Risk multiplier once the share of retired cars is reached
///
/// Results
/// * `fastest_lap_winner_bias` - Probability that the fastest lap bonus goes to the winner
///
/// Qualifying
/// * `quali_base_time` - (s) Qualifying lap time of a hard tyre on a dry track
/// * `q1_cutoff` / `q2_cutoff` - Number of cars advancing from Q1 / Q2
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimConstants {
    pub weather_change_probability: f64,
    pub min_lap_time: f64,
    pub lap_jitter_scale: f64,
    pub max_lap_jitter: f64,
    pub flavor_event_probability: f64,
    pub t_spin: f64,
    pub t_off_track: f64,
    pub pit_base_time: f64,
    pub pit_jitter: f64,
    pub overtake_window: f64,
    pub overtake_base_probability: f64,
    pub overtake_skill_factor: f64,
    pub overtake_wear_factor: f64,
    pub overtake_aggression_factor: f64,
    pub overtake_max_probability: f64,
    pub t_overtake_gap: f64,
    pub t_overtake_loser: f64,
    pub backstop_wear: f64,
    pub backstop_min_gap: u32,
    pub backstop_pit_probability: f64,
    pub max_failure_risk: f64,
    pub early_laps: u32,
    pub early_lap_damping: f64,
    pub teammate_retired_damping: f64,
    pub field_retired_fraction: f64,
    pub field_retired_damping: f64,
    pub fastest_lap_winner_bias: f64,
    pub quali_base_time: f64,
    pub q1_cutoff: usize,
    pub q2_cutoff: usize,
}

impl Default for SimConstants {
    fn default() -> Self {
        SimConstants {
            weather_change_probability: 0.02,
            min_lap_time: 60.0,
            lap_jitter_scale: 1.5,
            max_lap_jitter: 1.5,
            flavor_event_probability: 0.05,
            t_spin: 2.5,
            t_off_track: 1.5,
            pit_base_time: 2.5,
            pit_jitter: 0.5,
            overtake_window: 1.0,
            overtake_base_probability: 0.1,
            overtake_skill_factor: 0.005,
            overtake_wear_factor: 0.004,
            overtake_aggression_factor: 0.001,
            overtake_max_probability: 0.6,
            t_overtake_gap: 0.1,
            t_overtake_loser: 0.3,
            backstop_wear: 80.0,
            backstop_min_gap: 5,
            backstop_pit_probability: 0.3,
            max_failure_risk: 0.01,
            early_laps: 10,
            early_lap_damping: 0.5,
            teammate_retired_damping: 0.5,
            field_retired_fraction: 0.25,
            field_retired_damping: 0.5,
            fastest_lap_winner_bias: 0.7,
            quali_base_time: 85.0,
            q1_cutoff: 15,
            q2_cutoff: 10,
        }
    }
}

impl SimConstants {
    /// check_constants returns a list of warnings for values outside their sensible ranges.
    pub fn check_constants(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let probabilities = [
            ("weather_change_probability", self.weather_change_probability),
            ("flavor_event_probability", self.flavor_event_probability),
            ("overtake_base_probability", self.overtake_base_probability),
            ("overtake_max_probability", self.overtake_max_probability),
            ("backstop_pit_probability", self.backstop_pit_probability),
            ("max_failure_risk", self.max_failure_risk),
            ("fastest_lap_winner_bias", self.fastest_lap_winner_bias),
        ];
        for (name, value) in probabilities.iter() {
            if !(0.0..=1.0).contains(value) {
                warnings.push(format!("{} = {} is not a probability", name, value));
            }
        }

        if self.q2_cutoff > self.q1_cutoff {
            warnings.push(format!(
                "q2_cutoff ({}) exceeds q1_cutoff ({})",
                self.q2_cutoff, self.q1_cutoff
            ));
        }

        if self.min_lap_time <= 0.0 {
            warnings.push("min_lap_time should be positive".to_owned());
        }

        let time_losses = [
            ("t_spin", self.t_spin),
            ("t_off_track", self.t_off_track),
            ("pit_base_time", self.pit_base_time),
            ("pit_jitter", self.pit_jitter),
            ("t_overtake_gap", self.t_overtake_gap),
            ("t_overtake_loser", self.t_overtake_loser),
        ];
        for (name, value) in time_losses.iter() {
            if *value < 0.0 {
                warnings.push(format!("{} = {} should not be negative", name, value));
            }
        }

        warnings
    }
}
