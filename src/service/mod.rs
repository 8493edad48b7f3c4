//! Promotions Service
//!
//! Tenant-scoped storage and redemption of promotions. Every call names its
//! tenant explicitly.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;

use crate::{
    lifecycle::PromotionStatus,
    orders::OrderSnapshot,
    promotions::Promotion,
    service::records::{Application, NewPromotion, PromotionRecord, PromotionUuid, TenantUuid},
};

mod errors;
pub mod memory;
pub mod records;
pub mod retry;

pub use errors::PromotionsServiceError;
pub use memory::InMemoryPromotionsService;
pub use retry::RetryPolicy;

/// Promotions service
#[automock]
#[async_trait]
pub trait PromotionsService: Send + Sync {
    /// Validate and store a new promotion.
    ///
    /// Repeating a create with the same idempotency key returns the original
    /// record.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for invalid promotions and `Conflict` if another
    /// promotion of the tenant uses the same code.
    async fn create_promotion(
        &self,
        tenant: TenantUuid,
        promotion: NewPromotion,
    ) -> Result<PromotionRecord, PromotionsServiceError>;

    /// Fetch a promotion.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the tenant has no such promotion.
    async fn get_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
    ) -> Result<PromotionRecord, PromotionsServiceError>;

    /// All promotions of a tenant, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Transient` or `Timeout` if storage is unavailable.
    async fn list_promotions(
        &self,
        tenant: TenantUuid,
    ) -> Result<Vec<PromotionRecord>, PromotionsServiceError>;

    /// Replace a promotion's configuration.
    ///
    /// # Errors
    ///
    /// Returns `StaleVersion` if the promotion changed since `expected_version`
    /// was read, `Frozen` for expired promotions, `Transition` if the new
    /// status cannot be reached, and `Validation` or `Conflict` as for
    /// creation.
    async fn update_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
        expected_version: u64,
        promotion: Promotion<'static>,
    ) -> Result<PromotionRecord, PromotionsServiceError>;

    /// Move a promotion to another status.
    ///
    /// # Errors
    ///
    /// Returns `StaleVersion`, `Transition` for disallowed changes, or
    /// `Validation` if the promotion cannot be published.
    async fn transition_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
        expected_version: u64,
        to: PromotionStatus,
    ) -> Result<PromotionRecord, PromotionsServiceError>;

    /// Delete a promotion.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the tenant has no such promotion.
    async fn delete_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
    ) -> Result<(), PromotionsServiceError>;

    /// Persist date-driven status changes, returning the promotions that
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns `Transient` or `Timeout` if storage is unavailable.
    async fn refresh_statuses(
        &self,
        tenant: TenantUuid,
        now: Timestamp,
    ) -> Result<Vec<PromotionUuid>, PromotionsServiceError>;

    /// Evaluate a promotion against an order and, if it applies, record the
    /// redemption. Evaluation, budget check and counter update are one atomic
    /// step.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Evaluation` if the order cannot be evaluated.
    async fn apply_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
        order: OrderSnapshot<'static>,
        now: Timestamp,
    ) -> Result<Application, PromotionsServiceError>;
}
