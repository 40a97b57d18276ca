//! Synthetic first-generation corpus
//!
//! At first startup there is no feedback to learn from, so the initial model
//! is fitted on generated profiles labelled by a heuristic. The strategy is a
//! trait so deployments can seed from a curated dataset instead.

use super::corpus::CorpusRow;
use crate::config::TrainingConfig;
use crate::error::{FitrecError, Result};
use crate::types::{Goal, ProfileSnapshot, Sex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Attempts per label before giving up on rejection sampling
const MAX_ATTEMPTS_PER_LABEL: usize = 100_000;

/// Produces the rows the first model generation is fitted on
pub trait CorpusSeeder: Send + Sync {
    fn seed(&self, config: &TrainingConfig) -> Result<Vec<CorpusRow>>;
}

/// Deterministic seeded generator covering every goal
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticSeeder;

impl SyntheticSeeder {
    /// Heuristic label for a generated profile
    pub fn label_for(profile: &ProfileSnapshot) -> Goal {
        let bmi = profile.bmi();
        if bmi >= 27.5 {
            Goal::WeightLoss
        } else if profile.age >= 55.0 {
            match profile.sex {
                Sex::Female => Goal::Flexibility,
                Sex::Male => Goal::GeneralHealth,
            }
        } else if bmi < 20.0 {
            Goal::Endurance
        } else if profile.age < 40.0 {
            match profile.sex {
                Sex::Male => Goal::MuscleGain,
                Sex::Female => Goal::Flexibility,
            }
        } else {
            Goal::GeneralHealth
        }
    }

    fn sample_profile(rng: &mut StdRng) -> ProfileSnapshot {
        let sex = if rng.gen_bool(0.5) { Sex::Male } else { Sex::Female };
        let age = rng.gen_range(16.0..75.0);
        let height_cm = match sex {
            Sex::Male => rng.gen_range(160.0..200.0),
            Sex::Female => rng.gen_range(150.0..188.0),
        };
        let bmi = rng.gen_range(16.0..38.0);
        let height_m: f64 = height_cm / 100.0;
        ProfileSnapshot::new(age, bmi * height_m * height_m, height_cm, sex)
    }

    fn row(profile: &ProfileSnapshot) -> CorpusRow {
        CorpusRow::new(profile.features(), Self::label_for(profile))
    }
}

impl CorpusSeeder for SyntheticSeeder {
    fn seed(&self, config: &TrainingConfig) -> Result<Vec<CorpusRow>> {
        let mut rng = StdRng::seed_from_u64(config.bootstrap_seed);
        let mut rows = Vec::with_capacity(config.bootstrap_samples);

        // guarantee every label its floor first
        for goal in Goal::ALL {
            let mut found = 0;
            let mut attempts = 0;
            while found < config.min_samples_per_label {
                attempts += 1;
                if attempts > MAX_ATTEMPTS_PER_LABEL {
                    return Err(FitrecError::Retrain(format!(
                        "Could not generate {} bootstrap rows for {}",
                        config.min_samples_per_label, goal
                    )));
                }
                let profile = Self::sample_profile(&mut rng);
                if Self::label_for(&profile) == goal {
                    rows.push(Self::row(&profile));
                    found += 1;
                }
            }
        }

        while rows.len() < config.bootstrap_samples {
            let profile = Self::sample_profile(&mut rng);
            rows.push(Self::row(&profile));
        }

        rows.shuffle(&mut rng);
        debug!("Generated {} bootstrap rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_label_meets_floor() {
        let config = TrainingConfig::default();
        let rows = SyntheticSeeder.seed(&config).unwrap();

        assert_eq!(rows.len(), config.bootstrap_samples);
        for goal in Goal::ALL {
            let count = rows.iter().filter(|r| r.label == goal).count();
            assert!(count >= config.min_samples_per_label, "{} has {}", goal, count);
        }
    }

    #[test]
    fn test_generated_profiles_are_valid() {
        let rows = SyntheticSeeder.seed(&TrainingConfig::default()).unwrap();
        for row in rows {
            let v = row.features.values();
            let profile = ProfileSnapshot::new(
                v[0],
                v[1],
                v[2],
                if v[3] == 1.0 { Sex::Male } else { Sex::Female },
            );
            assert!(profile.validate().is_ok());
        }
    }

    #[test]
    fn test_same_seed_same_corpus() {
        let config = TrainingConfig::default();
        assert_eq!(
            SyntheticSeeder.seed(&config).unwrap(),
            SyntheticSeeder.seed(&config).unwrap()
        );
    }

    #[test]
    fn test_heuristic_examples() {
        let lean_young_male = ProfileSnapshot::new(22.0, 58.0, 180.0, Sex::Male);
        assert_eq!(SyntheticSeeder::label_for(&lean_young_male), Goal::Endurance);

        let heavy = ProfileSnapshot::new(45.0, 110.0, 175.0, Sex::Female);
        assert_eq!(SyntheticSeeder::label_for(&heavy), Goal::WeightLoss);

        let older_female = ProfileSnapshot::new(62.0, 60.0, 165.0, Sex::Female);
        assert_eq!(SyntheticSeeder::label_for(&older_female), Goal::Flexibility);
    }
}
