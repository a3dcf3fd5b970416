use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of objectives optimized per trial.
pub const OBJECTIVE_COUNT: usize = 3;

/// The tracking accuracy metrics the search maximizes, in objective order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Objective {
    Hota,
    Mota,
    Idf1,
}

impl Objective {
    pub const ALL: [Objective; OBJECTIVE_COUNT] = [Objective::Hota, Objective::Mota, Objective::Idf1];

    /// Position of this metric in a trial's value vector.
    pub fn index(self) -> usize {
        match self {
            Objective::Hota => 0,
            Objective::Mota => 1,
            Objective::Idf1 => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Objective::Hota => "HOTA",
            Objective::Mota => "MOTA",
            Objective::Idf1 => "IDF1",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate scores of one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub hota: f64,
    pub mota: f64,
    pub idf1: f64,
}

impl Scores {
    pub fn new(hota: f64, mota: f64, idf1: f64) -> Self {
        Self { hota, mota, idf1 }
    }

    pub fn get(&self, objective: Objective) -> f64 {
        match objective {
            Objective::Hota => self.hota,
            Objective::Mota => self.mota,
            Objective::Idf1 => self.idf1,
        }
    }

    /// Values in objective order (HOTA, MOTA, IDF1).
    pub fn to_values(&self) -> Vec<f64> {
        vec![self.hota, self.mota, self.idf1]
    }
}

impl fmt::Display for Scores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HOTA={} MOTA={} IDF1={}", self.hota, self.mota, self.idf1)
    }
}
