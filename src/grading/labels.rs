use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceLabel {
    #[serde(rename = "Not Answered")]
    NotAnswered,
    Poor,
    Average,
    Good,
    #[serde(rename = "Very Good")]
    VeryGood,
    Excellent,
}

impl PerformanceLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAnswered => "Not Answered",
            Self::Poor => "Poor",
            Self::Average => "Average",
            Self::Good => "Good",
            Self::VeryGood => "Very Good",
            Self::Excellent => "Excellent",
        }
    }

    /// Snake-case form used for per-question status fields and metric labels.
    pub fn status_key(self) -> &'static str {
        match self {
            Self::NotAnswered => "not_answered",
            Self::Poor => "poor",
            Self::Average => "average",
            Self::Good => "good",
            Self::VeryGood => "very_good",
            Self::Excellent => "excellent",
        }
    }
}

impl std::fmt::Display for PerformanceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-question mark thresholds, expressed on a 10-mark scale and scaled by
/// `max_marks / 10`. A mark at or below a bound gets that bound's label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelThresholds {
    pub poor: f64,
    pub average: f64,
    pub good: f64,
    pub very_good: f64,
}

impl Default for LabelThresholds {
    fn default() -> Self {
        Self { poor: 3.0, average: 5.0, good: 7.0, very_good: 9.0 }
    }
}

impl LabelThresholds {
    pub fn label_for(&self, marks: f64, max_marks: f64) -> PerformanceLabel {
        let scale = max_marks / 10.0;
        if marks <= self.poor * scale {
            PerformanceLabel::Poor
        } else if marks <= self.average * scale {
            PerformanceLabel::Average
        } else if marks <= self.good * scale {
            PerformanceLabel::Good
        } else if marks <= self.very_good * scale {
            PerformanceLabel::VeryGood
        } else {
            PerformanceLabel::Excellent
        }
    }
}

/// Paper-level percentage thresholds. Kept separate from
/// [`LabelThresholds`]; the two tables are not derived from each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverallThresholds {
    pub excellent: f64,
    pub very_good: f64,
    pub good: f64,
    pub average: f64,
}

impl Default for OverallThresholds {
    fn default() -> Self {
        Self { excellent: 90.0, very_good: 75.0, good: 55.0, average: 35.0 }
    }
}

impl OverallThresholds {
    pub fn label_for(&self, percentage: f64) -> PerformanceLabel {
        if percentage >= self.excellent {
            PerformanceLabel::Excellent
        } else if percentage >= self.very_good {
            PerformanceLabel::VeryGood
        } else if percentage >= self.good {
            PerformanceLabel::Good
        } else if percentage >= self.average {
            PerformanceLabel::Average
        } else if percentage > 0.0 {
            PerformanceLabel::Poor
        } else {
            PerformanceLabel::NotAnswered
        }
    }
}
