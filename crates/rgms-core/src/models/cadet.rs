use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RgmsError;
use crate::grading::{self, GradeInputs, GradeOutcome, GradeRemarks, TransmutedGrade};

use super::lenient;
use super::merit::MeritTotals;

/// Attendance sessions in a standard term
pub const DEFAULT_ATTENDANCE_TOTAL: f64 = 15.0;

fn default_attendance_total() -> f64 {
    DEFAULT_ATTENDANCE_TOTAL
}

/// A cadet and the cached result of grading them.
///
/// The raw inputs (attendance, merit/demerit totals, exam scores, status)
/// are the source of truth. The derived fields below them are recomputed by
/// [`Cadet::recompute_grade`] whenever a raw input changes and are never
/// written directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Cadet {
    pub id: i64,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,

    // Raw grading inputs
    pub attendance_present: f64,
    #[serde(default = "default_attendance_total")]
    pub attendance_total: f64,
    pub merit_points: i64,
    pub demerit_points: i64,
    pub prelim_score: f64,
    pub midterm_score: f64,
    pub final_score: f64,
    #[serde(default)]
    pub grade_status: String,

    // Derived grade snapshot
    pub subject_score: f64,
    pub attendance_score: f64,
    pub aptitude_score: f64,
    pub final_grade: f64,
    pub transmuted_grade: TransmutedGrade,
    pub grade_remarks: GradeRemarks,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cadet {
    /// Build a freshly enrolled cadet with an empty record and a consistent grade snapshot
    pub fn new(id: i64, new: NewCadet, now: DateTime<Utc>) -> Result<Self, RgmsError> {
        let student_id = new.student_id.trim().to_string();
        if student_id.is_empty() {
            return Err(RgmsError::InvalidCadet("studentId is required".to_string()));
        }

        let mut cadet = Self {
            id,
            student_id,
            first_name: new.first_name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
            attendance_present: 0.0,
            attendance_total: DEFAULT_ATTENDANCE_TOTAL,
            merit_points: 0,
            demerit_points: 0,
            prelim_score: 0.0,
            midterm_score: 0.0,
            final_score: 0.0,
            grade_status: String::new(),
            subject_score: 0.0,
            attendance_score: 0.0,
            aptitude_score: 0.0,
            final_grade: 0.0,
            transmuted_grade: TransmutedGrade::Failing,
            grade_remarks: GradeRemarks::Failed,
            created_at: now,
            updated_at: now,
        };
        cadet.recompute_grade();
        Ok(cadet)
    }

    /// "Last, First", as shown on rosters
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }

    pub fn merit_totals(&self) -> MeritTotals {
        MeritTotals {
            merit_points: self.merit_points,
            demerit_points: self.demerit_points,
        }
    }

    pub fn grade_inputs(&self) -> GradeInputs<'_> {
        GradeInputs {
            present_days: self.attendance_present,
            total_days: self.attendance_total,
            merit_points: self.merit_points as f64,
            demerit_points: self.demerit_points as f64,
            prelim_score: self.prelim_score,
            midterm_score: self.midterm_score,
            final_score: self.final_score,
            override_status: &self.grade_status,
        }
    }

    /// Refresh the derived grade fields from the current raw inputs
    pub fn recompute_grade(&mut self) -> GradeOutcome {
        let outcome = grading::calculate(&self.grade_inputs());

        self.subject_score = outcome.subject_score;
        self.attendance_score = outcome.attendance_score;
        self.aptitude_score = outcome.aptitude_score;
        self.final_grade = outcome.final_percent;
        self.transmuted_grade = outcome.transmuted_grade;
        self.grade_remarks = outcome.remarks();

        outcome
    }

    /// Replace the running totals and refresh the grade
    pub fn set_merit_totals(&mut self, totals: MeritTotals) {
        self.merit_points = totals.merit_points;
        self.demerit_points = totals.demerit_points;
        self.recompute_grade();
    }

    /// Apply an admin grade edit: every raw input is replaced in one go.
    /// `attendanceTotal` is optional and keeps the stored value when absent.
    /// Attendance is kept as given (half sessions count); merit and demerit
    /// totals are ledger points and round to the nearest whole point.
    pub fn apply_grade_update(&mut self, update: &GradeUpdate) -> GradeOutcome {
        self.prelim_score = update.prelim_score;
        self.midterm_score = update.midterm_score;
        self.final_score = update.final_score;
        self.attendance_present = update.attendance_present;
        if let Some(total) = update.attendance_total {
            self.attendance_total = total;
        }
        self.merit_points = lenient::to_count(update.merit_points);
        self.demerit_points = lenient::to_count(update.demerit_points);
        self.grade_status = update
            .status
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        self.recompute_grade()
    }

    /// True when the cached grade fields match what the raw inputs produce
    pub fn grade_is_consistent(&self) -> bool {
        let outcome = grading::calculate(&self.grade_inputs());
        self.subject_score == outcome.subject_score
            && self.attendance_score == outcome.attendance_score
            && self.aptitude_score == outcome.aptitude_score
            && self.final_grade == outcome.final_percent
            && self.transmuted_grade == outcome.transmuted_grade
            && self.grade_remarks == outcome.remarks()
    }
}

/// Request body for enrolling a cadet
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCadet {
    pub student_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Request body for `PUT /api/admin/grades/:cadetId`.
/// Numbers that are missing or unparseable read as 0.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeUpdate {
    #[serde(default, deserialize_with = "lenient::number_or_zero")]
    pub prelim_score: f64,
    #[serde(default, deserialize_with = "lenient::number_or_zero")]
    pub midterm_score: f64,
    #[serde(default, deserialize_with = "lenient::number_or_zero")]
    pub final_score: f64,
    #[serde(default, deserialize_with = "lenient::number_or_zero")]
    pub attendance_present: f64,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub attendance_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number_or_zero")]
    pub merit_points: f64,
    #[serde(default, deserialize_with = "lenient::number_or_zero")]
    pub demerit_points: f64,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cadet() -> Cadet {
        Cadet::new(
            1,
            NewCadet {
                student_id: "2024-0001".to_string(),
                first_name: "Amina".to_string(),
                last_name: "Macarambon".to_string(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_cadet_has_consistent_grade() {
        let c = cadet();
        assert_eq!(c.attendance_total, DEFAULT_ATTENDANCE_TOTAL);
        // Untouched aptitude balance is still worth its full 30 points
        assert_eq!(c.aptitude_score, 30.0);
        assert_eq!(c.final_grade, 30.0);
        assert_eq!(c.transmuted_grade, TransmutedGrade::Failing);
        assert_eq!(c.grade_remarks, GradeRemarks::Failed);
        assert!(c.grade_is_consistent());
    }

    #[test]
    fn test_new_cadet_requires_student_id() {
        let result = Cadet::new(
            1,
            NewCadet {
                student_id: "   ".to_string(),
                first_name: String::new(),
                last_name: String::new(),
            },
            Utc::now(),
        );
        assert!(matches!(result, Err(RgmsError::InvalidCadet(_))));
    }

    #[test]
    fn test_display_name() {
        let c = cadet();
        assert_eq!(c.display_name(), "Macarambon, Amina");
    }

    #[test]
    fn test_apply_grade_update() {
        let mut c = cadet();
        let update: GradeUpdate = serde_json::from_str(
            r#"{
                "prelimScore": 85, "midtermScore": "90", "finalScore": 95,
                "attendancePresent": 12, "meritPoints": 10, "demeritPoints": 2,
                "status": " Active "
            }"#,
        )
        .unwrap();

        let outcome = c.apply_grade_update(&update);

        assert_eq!(c.attendance_total, DEFAULT_ATTENDANCE_TOTAL);
        assert_eq!(c.merit_points, 10);
        assert_eq!(c.grade_status, "Active");
        assert_eq!(outcome.final_percent, 90.0);
        assert_eq!(c.attendance_score, 24.0);
        assert_eq!(c.subject_score, 36.0);
        assert_eq!(c.final_grade, 90.0);
        assert_eq!(c.transmuted_grade, TransmutedGrade::VeryGood);
        assert_eq!(c.grade_remarks, GradeRemarks::Passed);
        assert!(c.grade_is_consistent());
    }

    #[test]
    fn test_apply_grade_update_with_override_and_total() {
        let mut c = cadet();
        let update: GradeUpdate = serde_json::from_str(
            r#"{
                "prelimScore": 100, "midtermScore": 100, "finalScore": 100,
                "attendancePresent": 10, "attendanceTotal": 10, "status": "INC"
            }"#,
        )
        .unwrap();

        c.apply_grade_update(&update);

        assert_eq!(c.attendance_total, 10.0);
        assert_eq!(c.final_grade, 100.0);
        assert_eq!(c.transmuted_grade, TransmutedGrade::Failing);
        assert_eq!(c.grade_remarks, GradeRemarks::Failed);
    }

    #[test]
    fn test_apply_grade_update_defaults_garbage_to_zero() {
        let mut c = cadet();
        c.prelim_score = 80.0;
        let update: GradeUpdate =
            serde_json::from_str(r#"{"prelimScore": "n/a", "attendanceTotal": "soon"}"#).unwrap();

        c.apply_grade_update(&update);

        assert_eq!(c.prelim_score, 0.0);
        assert_eq!(c.attendance_total, DEFAULT_ATTENDANCE_TOTAL);
        assert_eq!(c.grade_status, "");
        assert!(c.grade_is_consistent());
    }

    #[test]
    fn test_set_merit_totals_refreshes_grade() {
        let mut c = cadet();
        c.set_merit_totals(MeritTotals {
            merit_points: 0,
            demerit_points: 50,
        });
        assert_eq!(c.aptitude_score, 15.0);
        assert_eq!(c.final_grade, 15.0);
        assert!(c.grade_is_consistent());
    }

    #[test]
    fn test_deserialize_defaults_attendance_total() {
        let mut json = serde_json::to_value(cadet()).unwrap();
        json.as_object_mut().unwrap().remove("attendance_total");
        let c: Cadet = serde_json::from_value(json).unwrap();
        assert_eq!(c.attendance_total, DEFAULT_ATTENDANCE_TOTAL);
    }

    #[test]
    fn test_fractional_attendance_is_graded_exactly() {
        let mut c = cadet();
        let update: GradeUpdate =
            serde_json::from_str(r#"{"attendancePresent": 7.5, "attendanceTotal": 15}"#).unwrap();

        c.apply_grade_update(&update);

        assert_eq!(c.attendance_present, 7.5);
        assert_eq!(c.attendance_score, 15.0);
        assert!(c.grade_is_consistent());
    }

    #[test]
    fn test_fractional_merit_points_round_to_whole_points() {
        let mut c = cadet();
        let update: GradeUpdate =
            serde_json::from_str(r#"{"meritPoints": 10.4, "demeritPoints": "2.5"}"#).unwrap();

        c.apply_grade_update(&update);

        assert_eq!(c.merit_points, 10);
        assert_eq!(c.demerit_points, 3);
        assert!(c.grade_is_consistent());
    }
}
