use serde::Serialize;

use crate::grading::round1;

const WARNING_THRESHOLD: f64 = 70.0;
const MIN_ALNUM_RATIO: f64 = 0.7;
const MAX_FRAGMENT_RATIO: f64 = 0.3;
const FRAGMENT_PENALTY: f64 = 15.0;
const MIN_WORDS: usize = 5;
const SHORT_TEXT_PENALTY: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct OcrQuality {
    pub(crate) quality_score: f64,
    pub(crate) needs_warning: bool,
    pub(crate) warning_reasons: Vec<String>,
}

impl OcrQuality {
    pub(crate) fn warning_message(&self) -> Option<String> {
        if !self.needs_warning {
            return None;
        }
        let mut message = "Handwriting clarity may affect evaluation accuracy.".to_string();
        if !self.warning_reasons.is_empty() {
            message.push_str(" Reasons: ");
            message.push_str(&self.warning_reasons.join(", "));
            message.push('.');
        }
        Some(message)
    }
}

/// Estimates how trustworthy OCR-extracted text is, starting from the OCR
/// engine's own confidence (100 when unknown).
pub(crate) fn assess_ocr_quality(text: &str, confidence: Option<f64>) -> OcrQuality {
    let mut reasons = Vec::new();
    let base = confidence.map(|value| value.clamp(0.0, 100.0)).unwrap_or(100.0);
    if base < WARNING_THRESHOLD {
        reasons.push("low OCR engine confidence".to_string());
    }

    let visible: Vec<char> = text.chars().filter(|ch| !ch.is_whitespace()).collect();
    if visible.is_empty() {
        return OcrQuality {
            quality_score: 0.0,
            needs_warning: true,
            warning_reasons: vec!["no text could be extracted".to_string()],
        };
    }

    let mut score = base;

    let alnum = visible.iter().filter(|ch| ch.is_alphanumeric()).count();
    let alnum_ratio = alnum as f64 / visible.len() as f64;
    if alnum_ratio < MIN_ALNUM_RATIO {
        score -= (MIN_ALNUM_RATIO - alnum_ratio) * 100.0;
        reasons.push("many unrecognized symbols".to_string());
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let fragments = words.iter().filter(|word| word.chars().count() == 1).count();
    if fragments as f64 / words.len() as f64 > MAX_FRAGMENT_RATIO {
        score -= FRAGMENT_PENALTY;
        reasons.push("fragmented words".to_string());
    }

    if words.len() < MIN_WORDS {
        score -= SHORT_TEXT_PENALTY;
        reasons.push("very little text extracted".to_string());
    }

    let quality_score = round1(score.clamp(0.0, 100.0));
    let needs_warning = quality_score < WARNING_THRESHOLD;
    if !needs_warning {
        reasons.clear();
    }

    OcrQuality { quality_score, needs_warning, warning_reasons: reasons }
}
