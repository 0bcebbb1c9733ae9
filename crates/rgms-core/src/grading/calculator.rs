//! Final grade computation from raw cadet inputs.
//!
//! The final percentage is the sum of three weighted components:
//!
//! - Attendance: up to 30 points, `present / total` of the term
//! - Aptitude: up to 30 points, a 100-point conduct balance moved by merits and demerits
//! - Subject: up to 40 points, the prelim + midterm + final exam average
//!
//! Inputs are never rejected. Out-of-range values are clamped and non-finite
//! values count as zero, so bad data yields a bounded bad grade.

use serde::{Deserialize, Serialize};

use super::transmutation::{self, TransmutedGrade};

// ============================================================================
// Constants
// ============================================================================

/// Points available from attendance
pub const ATTENDANCE_WEIGHT: f64 = 30.0;

/// Points available from aptitude
pub const APTITUDE_WEIGHT: f64 = 30.0;

/// Points available from subject exams
pub const SUBJECT_WEIGHT: f64 = 40.0;

/// Aptitude balance every cadet starts the term with
const APTITUDE_BASE: f64 = 100.0;

/// Maximum combined prelim + midterm + final score
const SUBJECT_MAX_TOTAL: f64 = 300.0;

/// Status codes that fail a cadet regardless of score:
/// dropped, incomplete and transferred.
/// Pending confirmation from the commandant's office; do not extend by inference.
pub const FORCED_FAILURE_STATUSES: [&str; 3] = ["DO", "INC", "T"];

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum GradeRemarks {
    Passed,
    Failed,
}

impl std::fmt::Display for GradeRemarks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradeRemarks::Passed => write!(f, "Passed"),
            GradeRemarks::Failed => write!(f, "Failed"),
        }
    }
}

/// Everything the calculator needs, supplied together.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradeInputs<'a> {
    pub present_days: f64,
    pub total_days: f64,
    pub merit_points: f64,
    pub demerit_points: f64,
    pub prelim_score: f64,
    pub midterm_score: f64,
    pub final_score: f64,
    pub override_status: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeOutcome {
    pub final_percent: f64,
    pub transmuted_grade: TransmutedGrade,
    pub passed: bool,
    pub attendance_score: f64,
    pub aptitude_score: f64,
    pub subject_score: f64,
}

impl GradeOutcome {
    pub fn remarks(&self) -> GradeRemarks {
        if self.passed {
            GradeRemarks::Passed
        } else {
            GradeRemarks::Failed
        }
    }
}

// ============================================================================
// Calculation
// ============================================================================

pub fn calculate(inputs: &GradeInputs<'_>) -> GradeOutcome {
    let attendance = attendance_component(
        finite_or_zero(inputs.present_days),
        finite_or_zero(inputs.total_days),
    );
    let aptitude = aptitude_component(
        finite_or_zero(inputs.merit_points),
        finite_or_zero(inputs.demerit_points),
    );
    let subject = subject_component(
        finite_or_zero(inputs.prelim_score)
            + finite_or_zero(inputs.midterm_score)
            + finite_or_zero(inputs.final_score),
    );

    let final_percent = round2(attendance + aptitude + subject);

    let transmuted_grade = if forces_failure(inputs.override_status) {
        TransmutedGrade::Failing
    } else {
        transmutation::lookup(final_percent)
    };

    GradeOutcome {
        final_percent,
        transmuted_grade,
        passed: transmuted_grade.is_passing(),
        attendance_score: round2(attendance),
        aptitude_score: round2(aptitude),
        subject_score: round2(subject),
    }
}

/// Whether an administrative status forces a failing grade.
/// Matching ignores surrounding whitespace and case; anything outside the
/// allow-list is not an error, it simply doesn't override.
pub fn forces_failure(status: &str) -> bool {
    let status = status.trim();
    FORCED_FAILURE_STATUSES
        .iter()
        .any(|code| code.eq_ignore_ascii_case(status))
}

fn attendance_component(present_days: f64, total_days: f64) -> f64 {
    if total_days <= 0.0 {
        return 0.0;
    }
    (present_days / total_days).clamp(0.0, 1.0) * ATTENDANCE_WEIGHT
}

fn aptitude_component(merit_points: f64, demerit_points: f64) -> f64 {
    let balance = (APTITUDE_BASE + merit_points - demerit_points).clamp(0.0, APTITUDE_BASE);
    balance / APTITUDE_BASE * APTITUDE_WEIGHT
}

fn subject_component(subject_total: f64) -> f64 {
    (subject_total / SUBJECT_MAX_TOTAL).clamp(0.0, 1.0) * SUBJECT_WEIGHT
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Tests
// ============================================================================
