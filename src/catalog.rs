//! Goal to program mapping
//!
//! The catalog is static data: each goal owns a list of programs, plus a
//! goal-agnostic default list served when no model is available.

use crate::types::Goal;
use serde::Serialize;

/// A training program offered for a goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Program {
    pub id: &'static str,
    pub name: &'static str,
    pub activities: &'static [&'static str],
    pub schedule: &'static str,
}

/// Source of programs for goals
pub trait ProgramCatalog: Send + Sync {
    /// Programs for a predicted goal
    fn programs_for(&self, goal: Goal) -> &[Program];

    /// Programs served when no goal could be predicted
    fn default_programs(&self) -> &[Program];

    /// Whether `program_id` names a known program
    fn contains(&self, program_id: &str) -> bool {
        self.default_programs().iter().any(|p| p.id == program_id)
            || Goal::ALL
                .iter()
                .any(|goal| self.programs_for(*goal).iter().any(|p| p.id == program_id))
    }
}

const WEIGHT_LOSS: &[Program] = &[
    Program {
        id: "hiit-burn",
        name: "HIIT Fat Burn",
        activities: &["interval sprints", "burpees", "jump rope", "mountain climbers"],
        schedule: "3x per week, 30 min",
    },
    Program {
        id: "steady-cardio",
        name: "Steady State Cardio",
        activities: &["brisk walking", "cycling", "elliptical"],
        schedule: "5x per week, 45 min",
    },
];

const MUSCLE_GAIN: &[Program] = &[
    Program {
        id: "strength-split",
        name: "Upper/Lower Strength Split",
        activities: &["squat", "bench press", "deadlift", "overhead press", "rows"],
        schedule: "4x per week, 60 min",
    },
    Program {
        id: "hypertrophy-ppl",
        name: "Push Pull Legs Hypertrophy",
        activities: &["incline press", "pull-ups", "lunges", "curls", "dips"],
        schedule: "6x per week, 50 min",
    },
];

const ENDURANCE: &[Program] = &[
    Program {
        id: "run-base",
        name: "Running Base Builder",
        activities: &["easy runs", "tempo run", "long run"],
        schedule: "4x per week, 40-90 min",
    },
    Program {
        id: "swim-bike",
        name: "Swim and Bike Aerobic",
        activities: &["lap swimming", "road cycling", "rowing"],
        schedule: "4x per week, 60 min",
    },
];

const FLEXIBILITY: &[Program] = &[
    Program {
        id: "yoga-flow",
        name: "Vinyasa Yoga Flow",
        activities: &["sun salutations", "standing poses", "hip openers"],
        schedule: "3x per week, 45 min",
    },
    Program {
        id: "mobility-daily",
        name: "Daily Mobility",
        activities: &["dynamic stretching", "foam rolling", "joint circles"],
        schedule: "daily, 15 min",
    },
];

const GENERAL_HEALTH: &[Program] = &[
    Program {
        id: "full-body-basics",
        name: "Full Body Basics",
        activities: &["goblet squat", "push-ups", "walking", "plank"],
        schedule: "3x per week, 40 min",
    },
    Program {
        id: "active-living",
        name: "Active Living",
        activities: &["walking", "light cycling", "stretching"],
        schedule: "5x per week, 30 min",
    },
];

const DEFAULTS: &[Program] = &[Program {
    id: "starter-mix",
    name: "Starter Mix",
    activities: &["walking", "bodyweight squats", "stretching"],
    schedule: "3x per week, 30 min",
}];

/// Catalog compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl ProgramCatalog for BuiltinCatalog {
    fn programs_for(&self, goal: Goal) -> &[Program] {
        match goal {
            Goal::WeightLoss => WEIGHT_LOSS,
            Goal::MuscleGain => MUSCLE_GAIN,
            Goal::Endurance => ENDURANCE,
            Goal::Flexibility => FLEXIBILITY,
            Goal::GeneralHealth => GENERAL_HEALTH,
        }
    }

    fn default_programs(&self) -> &[Program] {
        DEFAULTS
    }
}
