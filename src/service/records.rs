//! Promotions Records

use jiff::Timestamp;

use crate::{
    ids::TypedUuid,
    lifecycle::PromotionStatus,
    promotions::{NotApplicableReason, Promotion, budget::BudgetUsage},
    rewards::Reward,
};

/// Tenant marker
#[derive(Debug, Clone, Copy)]
pub struct Tenant;

/// Tenant UUID
pub type TenantUuid = TypedUuid<Tenant>;

/// Promotion UUID
pub type PromotionUuid = TypedUuid<PromotionRecord>;

/// Key making repeated creates return the original record
pub type IdempotencyKey = TypedUuid<NewPromotion>;

/// Promotion Record
#[derive(Debug, Clone)]
pub struct PromotionRecord {
    /// Promotion UUID
    pub uuid: PromotionUuid,

    /// Owning tenant
    pub tenant: TenantUuid,

    /// Incremented on every configuration or status change
    pub version: u64,

    /// Stored promotion
    pub promotion: Promotion<'static>,

    /// Redemptions and discount given so far
    pub usage: BudgetUsage,

    /// Creation time
    pub created_at: Timestamp,

    /// Last configuration or status change
    pub updated_at: Timestamp,
}

impl PromotionRecord {
    /// Status after applying the passage of time.
    pub fn status_at(&self, now: Timestamp) -> PromotionStatus {
        self.promotion.status_at(now)
    }
}

/// New promotion to create
#[derive(Debug, Clone)]
pub struct NewPromotion {
    /// Promotion to store
    pub promotion: Promotion<'static>,

    /// Optional idempotency key
    pub idempotency_key: Option<IdempotencyKey>,
}

impl NewPromotion {
    /// New promotion without an idempotency key.
    pub fn new(promotion: Promotion<'static>) -> Self {
        Self {
            promotion,
            idempotency_key: None,
        }
    }

    /// Attach an idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// A successful redemption
#[derive(Debug, Clone, PartialEq)]
pub struct Redemption {
    /// Redeemed promotion
    pub promotion: PromotionUuid,

    /// 1-based count of this redemption
    pub redemption_number: u64,

    /// Reward granted
    pub reward: Reward<'static>,
}

/// Outcome of applying a promotion to an order
#[derive(Debug, Clone, PartialEq)]
pub enum Application {
    /// The promotion applied and its counters were incremented.
    Redeemed(Redemption),

    /// The promotion did not apply; nothing was recorded.
    NotApplicable(NotApplicableReason),
}

impl Application {
    /// The redemption, if the promotion applied.
    pub fn redemption(&self) -> Option<&Redemption> {
        match self {
            Self::Redeemed(redemption) => Some(redemption),
            Self::NotApplicable(_) => None,
        }
    }
}
