//! Percentage to grade-code transmutation.
//!
//! The thresholds are institutional grading policy. They are checked in
//! descending order with `>=`, so a score sitting exactly on a threshold
//! lands in the better bracket.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum TransmutedGrade {
    #[serde(rename = "1.00")]
    Excellent,
    #[serde(rename = "1.50")]
    VeryGood,
    #[serde(rename = "2.00")]
    Good,
    #[serde(rename = "2.50")]
    Satisfactory,
    #[serde(rename = "3.00")]
    Passing,
    #[default]
    #[serde(rename = "5.00")]
    Failing,
}

impl TransmutedGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransmutedGrade::Excellent => "1.00",
            TransmutedGrade::VeryGood => "1.50",
            TransmutedGrade::Good => "2.00",
            TransmutedGrade::Satisfactory => "2.50",
            TransmutedGrade::Passing => "3.00",
            TransmutedGrade::Failing => "5.00",
        }
    }

    pub fn is_passing(&self) -> bool {
        *self != TransmutedGrade::Failing
    }
}

impl std::fmt::Display for TransmutedGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum final percentage for each passing code, best first.
pub const TRANSMUTATION_TABLE: [(f64, TransmutedGrade); 5] = [
    (95.0, TransmutedGrade::Excellent),
    (90.0, TransmutedGrade::VeryGood),
    (85.0, TransmutedGrade::Good),
    (80.0, TransmutedGrade::Satisfactory),
    (75.0, TransmutedGrade::Passing),
];

/// Map a final percentage to its grade code.
/// Total over every `f64`: anything below the last threshold (NaN included) fails.
pub fn lookup(final_percent: f64) -> TransmutedGrade {
    TRANSMUTATION_TABLE
        .iter()
        .find(|(threshold, _)| final_percent >= *threshold)
        .map(|(_, grade)| *grade)
        .unwrap_or(TransmutedGrade::Failing)
}
