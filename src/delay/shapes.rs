//! Delay shape configuration.
//!
//! Shapes describe a delay in continuous time (gamma with mean/spread) or as an
//! empirical day window. They are plain immutable values supplied by the caller;
//! `DelayShapeConfig::default()` carries the fixed model assumptions.

use serde::{Deserialize, Serialize};

/// Which downstream delay a distribution describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayProfile {
    /// Generation interval: infection of an index case to the infections it causes.
    Infectiousness,
    /// Infection to symptom onset.
    Incubation,
    /// Infection to hospital admission.
    HospitalAdmission,
    /// Admission to discharge (length of stay).
    HospitalStay,
    /// Infection to death.
    Death,
    /// Death to its appearance in official counts.
    DeathReporting,
}

impl DelayProfile {
    pub const ALL: [DelayProfile; 6] = [
        DelayProfile::Infectiousness,
        DelayProfile::Incubation,
        DelayProfile::HospitalAdmission,
        DelayProfile::HospitalStay,
        DelayProfile::Death,
        DelayProfile::DeathReporting,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            DelayProfile::Infectiousness => "infectiousness",
            DelayProfile::Incubation => "incubation",
            DelayProfile::HospitalAdmission => "hospital_admission",
            DelayProfile::HospitalStay => "hospital_stay",
            DelayProfile::Death => "death",
            DelayProfile::DeathReporting => "death_reporting",
        }
    }
}

/// A delay assumption before discretization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelayShape {
    /// Gamma distribution parameterized by mean and standard deviation (days),
    /// discretized on unit bins centred on each day in `min_day..=max_day`.
    Gamma {
        mean: f64,
        sd: f64,
        #[serde(default)]
        min_day: usize,
        max_day: usize,
    },
    /// Relative weights for consecutive days starting at `first_day`.
    Window { first_day: usize, weights: Vec<f64> },
}

/// Fixed delay assumptions for every profile the engine consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayShapeConfig {
    pub infectiousness: DelayShape,
    pub incubation: DelayShape,
    pub hospital_admission: DelayShape,
    pub hospital_stay: DelayShape,
    pub death: DelayShape,
    pub death_reporting: DelayShape,
}

impl DelayShapeConfig {
    pub fn shape(&self, profile: DelayProfile) -> &DelayShape {
        match profile {
            DelayProfile::Infectiousness => &self.infectiousness,
            DelayProfile::Incubation => &self.incubation,
            DelayProfile::HospitalAdmission => &self.hospital_admission,
            DelayProfile::HospitalStay => &self.hospital_stay,
            DelayProfile::Death => &self.death,
            DelayProfile::DeathReporting => &self.death_reporting,
        }
    }
}

impl Default for DelayShapeConfig {
    fn default() -> Self {
        Self {
            // Minimal incubation of 2 days, then a symmetric 7-day infectious
            // window; mean serial interval of 5 days.
            infectiousness: DelayShape::Window {
                first_day: 2,
                weights: vec![0.5, 1.0, 2.0, 3.0, 2.0, 1.0, 0.5],
            },
            incubation: DelayShape::Gamma {
                mean: 5.0,
                sd: 2.5,
                min_day: 0,
                max_day: 21,
            },
            hospital_admission: DelayShape::Gamma {
                mean: 12.0,
                sd: 3.0,
                min_day: 1,
                max_day: 30,
            },
            hospital_stay: DelayShape::Gamma {
                mean: 11.0,
                sd: 5.0,
                min_day: 1,
                max_day: 45,
            },
            // Flat 15-day window centred on day 22 after infection.
            death: DelayShape::Window {
                first_day: 15,
                weights: vec![1.0; 15],
            },
            // Exponentially decreasing lag over two weeks, from the day of death.
            death_reporting: DelayShape::Window {
                first_day: 0,
                weights: (0..15).map(|k| 0.7f64.powi(k)).collect(),
            },
        }
    }
}
