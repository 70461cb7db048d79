//! Register value types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Probability / impact rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    /// Parse a rating label, case-insensitively
    pub fn from_label(label: &str) -> Option<Level> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Level::Low),
            "medium" => Some(Level::Medium),
            "high" => Some(Level::High),
            _ => None,
        }
    }

    pub fn weight(&self) -> i64 {
        match self {
            Level::Low => 1,
            Level::Medium => 2,
            Level::High => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "Low",
            Level::Medium => "Medium",
            Level::High => "High",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk score = probability weight x impact weight
///
/// Unrecognized labels weigh as Medium, so the score is always one of
/// 1, 2, 3, 4, 6 or 9.
pub fn risk_score(probability: &str, impact: &str) -> i64 {
    let weight = |label: &str| Level::from_label(label).unwrap_or(Level::Medium).weight();
    weight(probability) * weight(impact)
}

/// Risk category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Technical,
    Schedule,
    Budget,
    Resource,
    External,
    Safety,
    Quality,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 7] = [
        RiskCategory::Technical,
        RiskCategory::Schedule,
        RiskCategory::Budget,
        RiskCategory::Resource,
        RiskCategory::External,
        RiskCategory::Safety,
        RiskCategory::Quality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Technical => "Technical",
            RiskCategory::Schedule => "Schedule",
            RiskCategory::Budget => "Budget",
            RiskCategory::Resource => "Resource",
            RiskCategory::External => "External",
            RiskCategory::Safety => "Safety",
            RiskCategory::Quality => "Quality",
        }
    }

    pub fn from_label(label: &str) -> Option<RiskCategory> {
        let label = label.trim();
        RiskCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }
}

/// A value written to one register cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Empty,
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map(CellValue::Text).unwrap_or(CellValue::Empty)
    }
}

/// One data row: header text -> cell value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegisterRow {
    values: Map<String, Value>,
}

impl RegisterRow {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, header: &str) -> Option<&Value> {
        self.values.get(header)
    }

    /// Cell as text; numbers are rendered, null and blank are `None`
    pub fn text(&self, header: &str) -> Option<String> {
        match self.values.get(header)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn insert(&mut self, header: impl Into<String>, value: Value) {
        self.values.insert(header.into(), value);
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}
