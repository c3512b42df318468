//! On-disk row format of the prediction log.
//!
//! Each row is a flat JSON object: the prediction inputs, the outcome fields
//! (null while pending) and the derived scores (null while pending or when
//! the outcome is INVALID). Rows written by the older tracker format are
//! accepted through field aliases and lenient timestamp parsing.

use chrono::{DateTime, NaiveDateTime, Utc};
use forecast_core::{
    MarketOutcome, Position, PredictionRecord, PredictionScore, PredictionStatus, Resolution,
    RiskLevel,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Persisted prediction row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPrediction {
    #[serde(default = "Uuid::new_v4")]
    pub prediction_id: Uuid,

    #[serde(alias = "condition_id")]
    pub market_id: String,

    pub question: String,

    pub predicted_probability: f64,

    #[serde(alias = "confidence_score")]
    pub confidence: f64,

    #[serde(alias = "predicted_position")]
    pub recommended_position: Position,

    #[serde(alias = "market_price", alias = "current_market_price")]
    pub market_price_at_prediction: f64,

    #[serde(alias = "prediction_date", deserialize_with = "timestamp::required")]
    pub prediction_timestamp: DateTime<Utc>,

    #[serde(default = "default_model_version")]
    pub model_version: String,

    #[serde(default)]
    pub risk_level: Option<RiskLevel>,

    #[serde(default)]
    pub expected_return: Option<f64>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "timestamp::optional")]
    pub market_end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub reasoning: Option<String>,

    #[serde(default)]
    pub best_effort_context: bool,

    /// YES, NO, INVALID, or null while pending.
    #[serde(default)]
    pub actual_outcome: Option<MarketOutcome>,

    #[serde(
        default,
        alias = "resolution_date",
        deserialize_with = "timestamp::optional"
    )]
    pub resolution_timestamp: Option<DateTime<Utc>>,

    #[serde(default, alias = "final_market_price")]
    pub final_price: Option<f64>,

    #[serde(default, alias = "prediction_correct")]
    pub was_correct: Option<bool>,

    #[serde(default)]
    pub brier_score: Option<f64>,

    #[serde(default)]
    pub log_score: Option<f64>,

    #[serde(default)]
    pub calibration_error: Option<f64>,
}

fn default_model_version() -> String {
    "current".to_string()
}

impl PersistedPrediction {
    /// Flattens a record into its row form.
    #[must_use]
    pub fn from_record(record: &PredictionRecord) -> Self {
        let resolution = record.resolution();
        let score = record.score();

        Self {
            prediction_id: record.prediction_id,
            market_id: record.market_id.clone(),
            question: record.question.clone(),
            predicted_probability: record.predicted_probability,
            confidence: record.confidence,
            recommended_position: record.recommended_position,
            market_price_at_prediction: record.market_price_at_prediction,
            prediction_timestamp: record.prediction_timestamp,
            model_version: record.model_version.clone(),
            risk_level: record.risk_level,
            expected_return: record.expected_return,
            category: record.category.clone(),
            market_end_date: record.market_end_date,
            reasoning: record.reasoning.clone(),
            best_effort_context: record.best_effort_context,
            actual_outcome: resolution.map(Resolution::outcome),
            resolution_timestamp: resolution.map(Resolution::resolved_at),
            final_price: resolution.and_then(Resolution::final_price),
            was_correct: score.map(|s| s.was_correct),
            brier_score: score.map(|s| s.brier_score),
            log_score: score.map(|s| s.log_score),
            calibration_error: score.map(|s| s.calibration_error),
        }
    }

    /// Rebuilds the typed record.
    ///
    /// Stored scores are kept when the row carries all of them; otherwise
    /// they are derived from the inputs. A resolved row without a resolution
    /// timestamp is dated at its prediction time.
    #[must_use]
    pub fn into_record(self) -> PredictionRecord {
        let mut record = PredictionRecord::new(
            self.market_id,
            self.question,
            self.recommended_position,
            self.predicted_probability,
            self.confidence,
            self.market_price_at_prediction,
            self.prediction_timestamp,
            self.model_version,
        );
        record.prediction_id = self.prediction_id;
        record.risk_level = self.risk_level;
        record.expected_return = self.expected_return;
        record.category = self.category;
        record.market_end_date = self.market_end_date;
        record.reasoning = self.reasoning;
        record.best_effort_context = self.best_effort_context;

        let Some(outcome) = self.actual_outcome else {
            return record;
        };
        let resolved_at = self.resolution_timestamp.unwrap_or(self.prediction_timestamp);

        let stored_score = match (
            self.was_correct,
            self.brier_score,
            self.log_score,
            self.calibration_error,
        ) {
            (Some(was_correct), Some(brier_score), Some(log_score), Some(calibration_error)) => {
                Some(PredictionScore {
                    was_correct,
                    brier_score,
                    log_score,
                    calibration_error,
                })
            }
            _ => None,
        };

        match stored_score {
            Some(score) => record.with_status(PredictionStatus::Resolved(Resolution::restored(
                outcome,
                resolved_at,
                self.final_price,
                Some(score),
            ))),
            None => {
                record.resolve(outcome, resolved_at, self.final_price);
                record
            }
        }
    }
}

/// Lenient ISO-8601 decoding: RFC 3339, or a naive timestamp taken as UTC.
pub(crate) mod timestamp {
    use super::*;

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(dt.with_timezone(&Utc));
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }
        chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() || raw == "None" => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn pending_row_has_null_outcome_and_scores() {
        let record = PredictionRecord::new("M1", "Q?", Position::Yes, 0.8, 0.9, 0.4, t0(), "v1");
        let row = PersistedPrediction::from_record(&record);

        assert!(row.actual_outcome.is_none());
        assert!(row.brier_score.is_none());

        let json = serde_json::to_value(&row).unwrap();
        assert!(json["was_correct"].is_null());
        assert_eq!(json["recommended_position"], "YES");
    }

    #[test]
    fn resolved_row_restores_equal_record() {
        let mut record = PredictionRecord::new("M1", "Q?", Position::No, 0.7, 0.6, 0.3, t0(), "v1");
        record.category = Some("Sports".to_string());
        record.resolve(MarketOutcome::No, t0() + chrono::Duration::days(3), Some(0.98));

        let json = serde_json::to_string(&PersistedPrediction::from_record(&record)).unwrap();
        let back: PersistedPrediction = serde_json::from_str(&json).unwrap();

        assert_eq!(back.into_record(), record);
    }

    #[test]
    fn legacy_row_with_python_style_fields_is_accepted() {
        let line = r#"{"condition_id": "0xabc", "question": "Q?", "predicted_probability": 0.8,
            "confidence": 0.9, "recommended_position": "YES", "market_price": 0.4,
            "prediction_date": "2025-01-01 12:00:00.123456", "model_version": "v1",
            "actual_outcome": "YES", "resolution_date": "2025-01-05 12:00:00",
            "final_price": 0.99, "was_correct": null, "brier_score": null,
            "log_score": null, "calibration_error": null}"#;
        let record = serde_json::from_str::<PersistedPrediction>(line)
            .unwrap()
            .into_record();

        assert_eq!(record.market_id, "0xabc");
        assert_eq!(record.days_to_resolution(), Some(4));
        // scores missing on disk are derived on load
        assert!((record.score().unwrap().brier_score - 0.04).abs() < 1e-9);
    }

    #[test]
    fn timestamp_parser_accepts_common_shapes() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        for raw in [
            "2025-01-01T12:00:00Z",
            "2025-01-01T12:00:00+00:00",
            "2025-01-01T12:00:00",
            "2025-01-01 12:00:00",
            "2025-01-01 12:00:00+00:00",
        ] {
            assert_eq!(timestamp::parse(raw), Some(expected), "{raw}");
        }
        assert!(timestamp::parse("yesterday").is_none());
    }
}
