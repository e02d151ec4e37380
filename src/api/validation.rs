use crate::api::errors::ApiError;

pub(crate) const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

pub(crate) fn validate_weights(semantic: f64, concept: f64) -> Result<(), ApiError> {
    let sum = semantic + concept;
    if (sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Weights must sum to 1.0 (got {sum})")))
    }
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::BadRequest(format!("{field} must not be blank")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_within_tolerance() {
        assert!(validate_weights(0.5, 0.5).is_ok());
        assert!(validate_weights(0.6, 0.405).is_ok());
        assert!(validate_weights(0.7, 0.7).is_err());
        assert!(validate_weights(0.0, 0.0).is_err());
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(require_text("   ", "modelAnswer").is_err());
        assert!(require_text("text", "modelAnswer").is_ok());
    }
}
