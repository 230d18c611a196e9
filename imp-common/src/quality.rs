//! Quality-score heuristic for capability bucket ids
//!
//! Bucket ids are free-form strings such as `platform_quality_8` or
//! `other_quality_55`. A number is pulled out of each id, normalized to a
//! 0–10 scale and the average is mapped to a 0–5 display score. This is a
//! display heuristic only.
//!
//! Values above 10 are assumed to be on a 0–100 scale and divided by 10, so
//! `10` stays `10.0` while `11` becomes `1.1`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static QUALITY_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)quality\D*(\d+)").expect("valid quality pattern"));

static TRAILING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)$").expect("valid trailing-digit pattern"));

/// One bucket id that yielded a number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketScore {
    pub bucket_id: String,
    pub raw: f64,
    /// Raw value on the 0–10 scale
    pub normalized: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityScore {
    /// `None` when no bucket id carried a number ("unknown", never 0)
    pub score5: Option<u8>,
    pub details: Vec<BucketScore>,
    pub raw_scores: Vec<f64>,
}

impl QualityScore {
    /// Average of normalized values, if any
    pub fn average(&self) -> Option<f64> {
        if self.details.is_empty() {
            return None;
        }
        let sum: f64 = self.details.iter().map(|d| d.normalized).sum();
        Some(sum / self.details.len() as f64)
    }
}

/// Pull the numeric token out of one bucket id
fn extract_number(bucket_id: &str) -> Option<f64> {
    let captures = QUALITY_NUMBER
        .captures(bucket_id)
        .or_else(|| TRAILING_NUMBER.captures(bucket_id))?;
    captures.get(1)?.as_str().parse::<f64>().ok()
}

fn normalize(raw: f64) -> f64 {
    if raw > 10.0 {
        raw / 10.0
    } else {
        raw
    }
}

/// Score a sequence of bucket ids
pub fn score<S: AsRef<str>>(bucket_ids: &[S]) -> QualityScore {
    let details: Vec<BucketScore> = bucket_ids
        .iter()
        .filter_map(|id| {
            let id = id.as_ref();
            extract_number(id).map(|raw| BucketScore {
                bucket_id: id.to_string(),
                raw,
                normalized: normalize(raw),
            })
        })
        .collect();

    let raw_scores = details.iter().map(|d| d.raw).collect();

    let mut result = QualityScore {
        score5: None,
        details,
        raw_scores,
    };

    if let Some(avg) = result.average() {
        let mapped = (avg / 10.0 * 5.0).round().clamp(0.0, 5.0);
        result.score5 = Some(mapped as u8);
    }

    result
}
