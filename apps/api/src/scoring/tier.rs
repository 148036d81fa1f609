use serde::Serialize;

/// Scoring-engine model tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Free,
    Pro,
}

impl ModelTier {
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelTier::Free => "claude-haiku-4-5",
            ModelTier::Pro => "claude-sonnet-4-5",
        }
    }
}

/// Picks the model tier. `force_pro` is the operator-level override and wins
/// unconditionally; otherwise the per-request pro flag decides.
pub fn select_tier(force_pro: bool, request_pro: bool) -> ModelTier {
    if force_pro || request_pro {
        ModelTier::Pro
    } else {
        ModelTier::Free
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_forces_pro_regardless_of_request() {
        assert_eq!(select_tier(true, false), ModelTier::Pro);
        assert_eq!(select_tier(true, true), ModelTier::Pro);
    }

    #[test]
    fn test_request_flag_selects_pro_without_override() {
        assert_eq!(select_tier(false, true), ModelTier::Pro);
    }

    #[test]
    fn test_defaults_to_free() {
        assert_eq!(select_tier(false, false), ModelTier::Free);
        assert_eq!(ModelTier::Free.model_id(), "claude-haiku-4-5");
    }
}
