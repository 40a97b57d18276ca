//! Core types shared by the feedback store and the model manager
//!
//! - [`Goal`]: the fixed training-objective label set the classifier predicts
//! - [`ProfileSnapshot`]: the four raw personal fields a prediction is made from
//! - [`FeatureVector`]: the 5-number classifier input derived from a profile

use crate::error::{FitrecError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of classifier input features: age, weight, height, sex flag, BMI
pub const FEATURE_COUNT: usize = 5;

/// Training objective predicted by the recommender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    WeightLoss,
    MuscleGain,
    Endurance,
    Flexibility,
    GeneralHealth,
}

impl Goal {
    /// The full label set, in classifier index order
    pub const ALL: [Goal; 5] = [
        Goal::WeightLoss,
        Goal::MuscleGain,
        Goal::Endurance,
        Goal::Flexibility,
        Goal::GeneralHealth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::WeightLoss => "weight_loss",
            Goal::MuscleGain => "muscle_gain",
            Goal::Endurance => "endurance",
            Goal::Flexibility => "flexibility",
            Goal::GeneralHealth => "general_health",
        }
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Goal {
    type Err = FitrecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "weight_loss" => Ok(Goal::WeightLoss),
            "muscle_gain" => Ok(Goal::MuscleGain),
            "endurance" => Ok(Goal::Endurance),
            "flexibility" => Ok(Goal::Flexibility),
            "general_health" => Ok(Goal::GeneralHealth),
            other => Err(FitrecError::Validation(format!("Unknown goal: {}", other))),
        }
    }
}

/// Biological sex flag used as a classifier feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn flag(&self) -> f64 {
        match self {
            Sex::Male => 1.0,
            Sex::Female => 0.0,
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sex::Male => write!(f, "male"),
            Sex::Female => write!(f, "female"),
        }
    }
}

impl FromStr for Sex {
    type Err = FitrecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Sex::Male),
            "female" | "f" => Ok(Sex::Female),
            other => Err(FitrecError::Validation(format!("Unknown sex: {}", other))),
        }
    }
}

/// Raw personal fields supplied by the profile store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub age: f64,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub sex: Sex,
}

impl ProfileSnapshot {
    pub fn new(age: f64, weight_kg: f64, height_cm: f64, sex: Sex) -> Self {
        Self {
            age,
            weight_kg,
            height_cm,
            sex,
        }
    }

    /// Reject non-finite or implausible values
    pub fn validate(&self) -> Result<()> {
        check_range("age", self.age, 14.0, 100.0)?;
        check_range("weight_kg", self.weight_kg, 30.0, 250.0)?;
        check_range("height_cm", self.height_cm, 120.0, 230.0)?;
        Ok(())
    }

    /// Body mass index: weight / height_m²
    pub fn bmi(&self) -> f64 {
        bmi(self.weight_kg, self.height_cm)
    }

    pub fn features(&self) -> FeatureVector {
        FeatureVector::new(self.age, self.weight_kg, self.height_cm, self.sex, self.bmi())
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(FitrecError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

/// Body mass index from kilograms and centimetres
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

/// Classifier input: [age, weight, height, sex_flag, bmi]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(age: f64, weight_kg: f64, height_cm: f64, sex: Sex, bmi: f64) -> Self {
        Self([age, weight_kg, height_cm, sex.flag(), bmi])
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}
