use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RgmsError;

use super::lenient;

/// Issuer recorded when the request doesn't name one
const DEFAULT_ISSUER: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum MeritType {
    Merit,
    Demerit,
}

impl MeritType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeritType::Merit => "merit",
            MeritType::Demerit => "demerit",
        }
    }
}

impl std::fmt::Display for MeritType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeritType {
    type Err = RgmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merit" => Ok(MeritType::Merit),
            "demerit" => Ok(MeritType::Demerit),
            _ => Err(RgmsError::InvalidMeritType(s.to_string())),
        }
    }
}

/// One append-only merit or demerit entry. Never edited after creation;
/// deleting it reverses its effect on the cadet's running totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MeritDemeritLog {
    pub id: i64,
    pub cadet_id: i64,
    #[serde(rename = "type")]
    pub merit_type: MeritType,
    pub points: i64,
    pub reason: String,
    pub issued_by: String,
    pub date_recorded: DateTime<Utc>,
}

impl MeritDemeritLog {
    pub fn is_merit(&self) -> bool {
        self.merit_type == MeritType::Merit
    }
}

/// Running merit/demerit totals for one cadet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MeritTotals {
    pub merit_points: i64,
    pub demerit_points: i64,
}

impl MeritTotals {
    /// Sum the points of every entry, per type, saturating at `i64::MAX`
    pub fn from_logs<'a>(logs: impl IntoIterator<Item = &'a MeritDemeritLog>) -> Self {
        logs.into_iter().fold(Self::default(), |mut totals, log| {
            match log.merit_type {
                MeritType::Merit => {
                    totals.merit_points = totals.merit_points.saturating_add(log.points)
                }
                MeritType::Demerit => {
                    totals.demerit_points = totals.demerit_points.saturating_add(log.points)
                }
            }
            totals
        })
    }
}

/// Request body for recording a merit or demerit
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMeritLog {
    pub cadet_id: i64,
    #[serde(rename = "type", default)]
    pub merit_type: String,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub points: Option<f64>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub issued_by: Option<String>,
}

impl NewMeritLog {
    /// Validate the request into a log entry with the given id
    pub fn into_log(self, id: i64, recorded_at: DateTime<Utc>) -> Result<MeritDemeritLog, RgmsError> {
        let merit_type: MeritType = self.merit_type.parse()?;

        let points = match self.points {
            Some(p) if p >= 1.0 && p.fract() == 0.0 && p <= i64::MAX as f64 => p as i64,
            Some(p) => {
                return Err(RgmsError::InvalidPoints(format!(
                    "{} is not a positive whole number",
                    p
                )))
            }
            None => return Err(RgmsError::InvalidPoints("points are required".to_string())),
        };

        let issued_by = self
            .issued_by
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string());

        Ok(MeritDemeritLog {
            id,
            cadet_id: self.cadet_id,
            merit_type,
            points,
            reason: self.reason.trim().to_string(),
            issued_by,
            date_recorded: recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(id: i64, merit_type: MeritType, points: i64) -> MeritDemeritLog {
        MeritDemeritLog {
            id,
            cadet_id: 1,
            merit_type,
            points,
            reason: String::new(),
            issued_by: "tester".to_string(),
            date_recorded: Utc::now(),
        }
    }

    #[test]
    fn test_merit_type_from_str() {
        assert_eq!("merit".parse::<MeritType>().unwrap(), MeritType::Merit);
        assert_eq!(" Demerit ".parse::<MeritType>().unwrap(), MeritType::Demerit);
        assert_eq!("MERIT".parse::<MeritType>().unwrap(), MeritType::Merit);
        assert!(matches!(
            "bonus".parse::<MeritType>(),
            Err(RgmsError::InvalidMeritType(_))
        ));
    }

    #[test]
    fn test_totals_from_logs() {
        let logs = vec![
            log(1, MeritType::Merit, 5),
            log(2, MeritType::Demerit, 3),
            log(3, MeritType::Merit, 2),
        ];
        let totals = MeritTotals::from_logs(&logs);
        assert_eq!(totals.merit_points, 7);
        assert_eq!(totals.demerit_points, 3);

        assert_eq!(
            MeritTotals::from_logs(std::iter::empty::<&MeritDemeritLog>()),
            MeritTotals::default()
        );
    }

    #[test]
    fn test_totals_from_logs_saturate() {
        let logs = vec![
            log(1, MeritType::Merit, 5_000_000_000_000_000_000),
            log(2, MeritType::Merit, 5_000_000_000_000_000_000),
            log(3, MeritType::Demerit, i64::MAX),
            log(4, MeritType::Demerit, 1),
        ];
        let totals = MeritTotals::from_logs(&logs);
        assert_eq!(totals.merit_points, i64::MAX);
        assert_eq!(totals.demerit_points, i64::MAX);
    }

    #[test]
    fn test_log_serializes_type_field() {
        let json = serde_json::to_value(log(9, MeritType::Demerit, 4)).unwrap();
        assert_eq!(json["type"], "demerit");
        assert_eq!(json["points"], 4);
        assert_eq!(json["cadet_id"], 1);
    }

    #[test]
    fn test_new_merit_log_parses_request_body() {
        let body = r#"{"cadetId": 4, "type": "merit", "points": "5", "reason": " Flag detail "}"#;
        let request: NewMeritLog = serde_json::from_str(body).unwrap();
        let entry = request.into_log(11, Utc::now()).unwrap();

        assert_eq!(entry.id, 11);
        assert_eq!(entry.cadet_id, 4);
        assert_eq!(entry.merit_type, MeritType::Merit);
        assert_eq!(entry.points, 5);
        assert_eq!(entry.reason, "Flag detail");
        assert_eq!(entry.issued_by, "admin");
    }

    #[test]
    fn test_new_merit_log_rejects_bad_points() {
        for points in ["0", "-2", "2.5", "\"lots\"", "null"] {
            let body = format!(r#"{{"cadetId": 1, "type": "demerit", "points": {}}}"#, points);
            let request: NewMeritLog = serde_json::from_str(&body).unwrap();
            assert!(
                matches!(request.into_log(1, Utc::now()), Err(RgmsError::InvalidPoints(_))),
                "points {} should be rejected",
                points
            );
        }
    }

    #[test]
    fn test_new_merit_log_rejects_bad_type() {
        let request: NewMeritLog =
            serde_json::from_str(r#"{"cadetId": 1, "type": "bonus", "points": 3}"#).unwrap();
        assert!(matches!(
            request.into_log(1, Utc::now()),
            Err(RgmsError::InvalidMeritType(_))
        ));
    }
}
