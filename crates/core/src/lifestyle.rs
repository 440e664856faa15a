//! Lifestyle habits and their scores.

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Smoking habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoking {
    /// Never smoked
    Never,
    /// Quit smoking
    Former,
    /// Smokes now
    Current,
}

impl Smoking {
    /// All habits, in form order.
    pub const ALL: [Smoking; 3] = [Smoking::Never, Smoking::Former, Smoking::Current];

    /// Years added to (or taken from) the baseline.
    pub fn score(self) -> i32 {
        match self {
            Smoking::Never => 2,
            Smoking::Former => 0,
            Smoking::Current => -5,
        }
    }

    /// Form value.
    pub fn as_str(self) -> &'static str {
        match self {
            Smoking::Never => "never",
            Smoking::Former => "former",
            Smoking::Current => "current",
        }
    }
}

impl std::fmt::Display for Smoking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Smoking {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "never" => Ok(Smoking::Never),
            "former" => Ok(Smoking::Former),
            "current" => Ok(Smoking::Current),
            _ => Err(ParseError::UnknownSmoking(s.to_string())),
        }
    }
}

/// Exercise frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exercise {
    /// Exercises regularly
    Regular,
    /// Exercises now and then
    Occasional,
    /// Does not exercise
    None,
}

impl Exercise {
    /// All frequencies, in form order.
    pub const ALL: [Exercise; 3] = [Exercise::Regular, Exercise::Occasional, Exercise::None];

    /// Years added to (or taken from) the baseline.
    pub fn score(self) -> i32 {
        match self {
            Exercise::Regular => 3,
            Exercise::Occasional => 0,
            Exercise::None => -3,
        }
    }

    /// Form value.
    pub fn as_str(self) -> &'static str {
        match self {
            Exercise::Regular => "regular",
            Exercise::Occasional => "occasional",
            Exercise::None => "none",
        }
    }
}

impl std::fmt::Display for Exercise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Exercise {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "regular" => Ok(Exercise::Regular),
            "occasional" => Ok(Exercise::Occasional),
            "none" => Ok(Exercise::None),
            _ => Err(ParseError::UnknownExercise(s.to_string())),
        }
    }
}

/// The habits collected by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lifestyle {
    /// Smoking habit
    pub smoking: Smoking,

    /// Exercise frequency
    pub exercise: Exercise,
}

impl Lifestyle {
    /// Create a lifestyle from its two habits.
    pub fn new(smoking: Smoking, exercise: Exercise) -> Self {
        Self { smoking, exercise }
    }

    /// Signed adjustment applied to the baseline expectancy.
    pub fn adjustment(&self) -> i32 {
        self.smoking.score() + self.exercise.score()
    }
}
