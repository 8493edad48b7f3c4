//! Promotion Fixtures

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::data::PromotionDraft;

/// Wrapper for promotions in YAML
#[derive(Debug, Deserialize)]
pub struct PromotionsFixture {
    /// Map of promotion key -> promotion draft
    pub promotions: FxHashMap<String, PromotionDraft>,
}

#[cfg(test)]
mod tests {
    use crate::{data::VariantDraft, lifecycle::PromotionStatus};

    use super::*;

    #[test]
    fn promotion_fixture_rejects_unknown_type() {
        let yaml = r#"
promotions:
  odd:
    name: Test
    starts_at: "2026-06-01T00:00:00Z"
    ends_at: "2026-06-30T00:00:00Z"
    variant:
      type: unknown_promotion
"#;
        let result: Result<PromotionsFixture, _> = serde_norway::from_str(yaml);

        assert!(result.is_err());
    }

    #[test]
    fn promotion_fixture_applies_defaults() -> Result<(), serde_norway::Error> {
        let yaml = r#"
promotions:
  bogo:
    name: Buy one get one
    code: BOGO
    starts_at: "2026-06-01T00:00:00Z"
    ends_at: "2026-06-30T00:00:00Z"
    variant:
      type: buy_x_get_y
      buy_quantity: 1
      get_quantity: 1
      discount: "100%"
"#;
        let fixture: PromotionsFixture = serde_norway::from_str(yaml)?;
        let draft = fixture.promotions.get("bogo");

        assert!(matches!(
            draft,
            Some(PromotionDraft {
                status: PromotionStatus::Draft,
                is_active: true,
                auto_apply: false,
                variant: VariantDraft::BuyXGetY {
                    buy_quantity: Some(1),
                    ..
                },
                ..
            })
        ));

        Ok(())
    }
}
