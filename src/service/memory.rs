//! In-memory promotions service.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};

use async_trait::async_trait;
use jiff::Timestamp;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::{Span, debug, info};

use crate::{
    catalog::Catalog,
    lifecycle::{PromotionStatus, transition},
    orders::OrderSnapshot,
    promotions::{Evaluation, Promotion, budget::BudgetUsage},
    service::{
        PromotionsService, PromotionsServiceError,
        records::{
            Application, IdempotencyKey, NewPromotion, PromotionRecord, PromotionUuid, Redemption,
            TenantUuid,
        },
    },
};

type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

#[derive(Debug, Default)]
struct TenantPromotions {
    records: FxHashMap<PromotionUuid, PromotionRecord>,
    idempotency: FxHashMap<IdempotencyKey, PromotionUuid>,
}

impl TenantPromotions {
    fn check_code(
        &self,
        promotion: &Promotion<'_>,
        except: Option<PromotionUuid>,
    ) -> Result<(), PromotionsServiceError> {
        let Some(code) = &promotion.code else {
            return Ok(());
        };

        let taken = self.records.values().any(|record| {
            Some(record.uuid) != except && record.promotion.code.as_ref() == Some(code)
        });

        if taken {
            Err(PromotionsServiceError::Conflict(code.to_string()))
        } else {
            Ok(())
        }
    }

    fn record_mut(
        &mut self,
        uuid: PromotionUuid,
    ) -> Result<&mut PromotionRecord, PromotionsServiceError> {
        self.records
            .get_mut(&uuid)
            .ok_or(PromotionsServiceError::NotFound)
    }
}

/// Promotions service keeping every tenant's promotions in memory.
///
/// All state sits behind one lock, so redemption counters are updated in the
/// same critical section as the evaluation that justifies them.
pub struct InMemoryPromotionsService {
    catalog: Arc<Catalog>,
    tenants: RwLock<FxHashMap<TenantUuid, TenantPromotions>>,
    clock: Clock,
}

impl Debug for InMemoryPromotionsService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InMemoryPromotionsService")
            .field("catalog", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl InMemoryPromotionsService {
    /// Create a service validating promotions against `catalog`.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            tenants: RwLock::new(FxHashMap::default()),
            clock: Arc::new(Timestamp::now),
        }
    }

    /// Replace the clock used for save-time checks.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> Timestamp {
        (self.clock)()
    }

    fn validate(
        &self,
        promotion: &Promotion<'_>,
        now: Timestamp,
    ) -> Result<(), PromotionsServiceError> {
        promotion.validate(&self.catalog)?;

        if promotion.status.is_published() {
            promotion.validate_for_publish(now)?;
        }

        Ok(())
    }
}

fn check_version(record: &PromotionRecord, expected: u64) -> Result<(), PromotionsServiceError> {
    if record.version == expected {
        Ok(())
    } else {
        Err(PromotionsServiceError::StaleVersion {
            expected,
            actual: record.version,
        })
    }
}

#[async_trait]
impl PromotionsService for InMemoryPromotionsService {
    #[tracing::instrument(
        name = "promotions.service.create_promotion",
        skip(self, promotion),
        fields(
            tenant_uuid = %tenant,
            promotion_uuid = tracing::field::Empty,
            promotion_type = %promotion.promotion.variant.type_as_str(),
            status = %promotion.promotion.status
        ),
        err
    )]
    async fn create_promotion(
        &self,
        tenant: TenantUuid,
        promotion: NewPromotion,
    ) -> Result<PromotionRecord, PromotionsServiceError> {
        let now = self.now();
        let mut tenants = self.tenants.write().await;
        let promotions = tenants.entry(tenant).or_default();

        if let Some(key) = promotion.idempotency_key
            && let Some(existing) = promotions
                .idempotency
                .get(&key)
                .and_then(|uuid| promotions.records.get(uuid))
        {
            info!(promotion_uuid = %existing.uuid, "returning promotion for repeated create");

            return Ok(existing.clone());
        }

        self.validate(&promotion.promotion, now)?;
        promotions.check_code(&promotion.promotion, None)?;

        let record = PromotionRecord {
            uuid: PromotionUuid::new(),
            tenant,
            version: 1,
            promotion: promotion.promotion,
            usage: BudgetUsage::default(),
            created_at: now,
            updated_at: now,
        };

        Span::current().record("promotion_uuid", tracing::field::display(record.uuid));

        if let Some(key) = promotion.idempotency_key {
            promotions.idempotency.insert(key, record.uuid);
        }

        promotions.records.insert(record.uuid, record.clone());

        info!(promotion_uuid = %record.uuid, "created promotion");

        Ok(record)
    }

    #[tracing::instrument(
        name = "promotions.service.get_promotion",
        skip(self),
        fields(tenant_uuid = %tenant, promotion_uuid = %uuid),
        err
    )]
    async fn get_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
    ) -> Result<PromotionRecord, PromotionsServiceError> {
        let tenants = self.tenants.read().await;

        tenants
            .get(&tenant)
            .and_then(|promotions| promotions.records.get(&uuid))
            .cloned()
            .ok_or(PromotionsServiceError::NotFound)
    }

    #[tracing::instrument(
        name = "promotions.service.list_promotions",
        skip(self),
        fields(tenant_uuid = %tenant),
        err
    )]
    async fn list_promotions(
        &self,
        tenant: TenantUuid,
    ) -> Result<Vec<PromotionRecord>, PromotionsServiceError> {
        let tenants = self.tenants.read().await;

        let mut records: Vec<PromotionRecord> = tenants
            .get(&tenant)
            .map(|promotions| promotions.records.values().cloned().collect())
            .unwrap_or_default();

        records.sort_by_key(|record| (record.created_at, record.uuid));

        Ok(records)
    }

    #[tracing::instrument(
        name = "promotions.service.update_promotion",
        skip(self, promotion),
        fields(
            tenant_uuid = %tenant,
            promotion_uuid = %uuid,
            promotion_type = %promotion.variant.type_as_str()
        ),
        err
    )]
    async fn update_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
        expected_version: u64,
        promotion: Promotion<'static>,
    ) -> Result<PromotionRecord, PromotionsServiceError> {
        let now = self.now();
        let mut tenants = self.tenants.write().await;

        let promotions = tenants
            .get_mut(&tenant)
            .ok_or(PromotionsServiceError::NotFound)?;

        let current = promotions
            .records
            .get(&uuid)
            .ok_or(PromotionsServiceError::NotFound)?;

        check_version(current, expected_version)?;

        let current_status = current.status_at(now);

        if current_status.is_frozen() {
            return Err(PromotionsServiceError::Frozen);
        }

        // Resubmitting the stored status is not a status change
        if promotion.status != current.promotion.status {
            transition(current_status, promotion.status)?;
        }

        self.validate(&promotion, now)?;
        promotions.check_code(&promotion, Some(uuid))?;

        let record = promotions.record_mut(uuid)?;

        record.promotion = promotion;
        record.version += 1;
        record.updated_at = now;

        info!(promotion_uuid = %uuid, version = record.version, "updated promotion");

        Ok(record.clone())
    }

    #[tracing::instrument(
        name = "promotions.service.transition_promotion",
        skip(self),
        fields(
            tenant_uuid = %tenant,
            promotion_uuid = %uuid,
            from = tracing::field::Empty
        ),
        err
    )]
    async fn transition_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
        expected_version: u64,
        to: PromotionStatus,
    ) -> Result<PromotionRecord, PromotionsServiceError> {
        let now = self.now();
        let mut tenants = self.tenants.write().await;

        let record = tenants
            .get_mut(&tenant)
            .ok_or(PromotionsServiceError::NotFound)?
            .record_mut(uuid)?;

        check_version(record, expected_version)?;

        let from = record.status_at(now);

        Span::current().record("from", tracing::field::display(from));

        let to = transition(from, to)?;

        if to == record.promotion.status {
            return Ok(record.clone());
        }

        if to.is_published() {
            record.promotion.validate_for_publish(now)?;
        }

        record.promotion.status = to;
        record.version += 1;
        record.updated_at = now;

        info!(promotion_uuid = %uuid, %from, %to, "changed promotion status");

        Ok(record.clone())
    }

    #[tracing::instrument(
        name = "promotions.service.delete_promotion",
        skip(self),
        fields(tenant_uuid = %tenant, promotion_uuid = %uuid),
        err
    )]
    async fn delete_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
    ) -> Result<(), PromotionsServiceError> {
        let mut tenants = self.tenants.write().await;

        let promotions = tenants
            .get_mut(&tenant)
            .ok_or(PromotionsServiceError::NotFound)?;

        promotions
            .records
            .remove(&uuid)
            .ok_or(PromotionsServiceError::NotFound)?;

        promotions.idempotency.retain(|_key, existing| *existing != uuid);

        info!(promotion_uuid = %uuid, "deleted promotion");

        Ok(())
    }

    #[tracing::instrument(
        name = "promotions.service.refresh_statuses",
        skip(self),
        fields(tenant_uuid = %tenant, changed = tracing::field::Empty),
        err
    )]
    async fn refresh_statuses(
        &self,
        tenant: TenantUuid,
        now: Timestamp,
    ) -> Result<Vec<PromotionUuid>, PromotionsServiceError> {
        let mut tenants = self.tenants.write().await;
        let mut changed = Vec::new();

        if let Some(promotions) = tenants.get_mut(&tenant) {
            for record in promotions.records.values_mut() {
                let stored = record.promotion.status;
                let status = record.status_at(now);

                // Activated early; the window opening will confirm it
                let early =
                    stored == PromotionStatus::Active && status == PromotionStatus::Scheduled;

                if status != stored && !early {
                    debug!(
                        promotion_uuid = %record.uuid,
                        from = %record.promotion.status,
                        to = %status,
                        "promotion status changed with time"
                    );

                    record.promotion.status = status;
                    record.version += 1;
                    record.updated_at = now;

                    changed.push(record.uuid);
                }
            }
        }

        changed.sort_unstable();

        Span::current().record("changed", changed.len());

        Ok(changed)
    }

    #[tracing::instrument(
        name = "promotions.service.apply_promotion",
        skip(self, order),
        fields(
            tenant_uuid = %tenant,
            promotion_uuid = %uuid,
            lines = order.len(),
            redemption_number = tracing::field::Empty
        ),
        err
    )]
    async fn apply_promotion(
        &self,
        tenant: TenantUuid,
        uuid: PromotionUuid,
        order: OrderSnapshot<'static>,
        now: Timestamp,
    ) -> Result<Application, PromotionsServiceError> {
        let mut tenants = self.tenants.write().await;

        let record = tenants
            .get_mut(&tenant)
            .ok_or(PromotionsServiceError::NotFound)?
            .record_mut(uuid)?;

        let reward = match record
            .promotion
            .evaluate_with_usage(&order, now, &record.usage)?
        {
            Evaluation::Applied(reward) => reward,
            Evaluation::NotApplicable(reason) => {
                debug!(promotion_uuid = %uuid, %reason, "promotion not applied");

                return Ok(Application::NotApplicable(reason));
            }
        };

        record.usage.redemptions = record.usage.redemptions.saturating_add(1);
        record.usage.discounted_minor = record
            .usage
            .discounted_minor
            .saturating_add(reward.discount().to_minor_units());

        Span::current().record("redemption_number", record.usage.redemptions);

        info!(
            promotion_uuid = %uuid,
            discount = reward.discount().to_minor_units(),
            gifts = reward.gifts().len(),
            "redeemed promotion"
        );

        Ok(Application::Redeemed(Redemption {
            promotion: uuid,
            redemption_number: record.usage.redemptions,
            reward,
        }))
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use crate::{
        catalog::CatalogItem,
        lifecycle::ValidityWindow,
        orders::LineItem,
        promotions::{NotApplicableReason, PromotionCode, budget::RedemptionBudget},
        rules::{CombinationOp, RuleSet},
        service::records::IdempotencyKey,
        validation::ValidationError,
        variants::PromotionVariant,
    };

    use super::*;

    fn catalog() -> Catalog {
        [CatalogItem::new("tee").with_categories(&["apparel"])]
            .into_iter()
            .collect()
    }

    fn now() -> Result<Timestamp, jiff::Error> {
        "2026-06-15T12:00:00Z".parse()
    }

    fn service() -> Result<InMemoryPromotionsService, jiff::Error> {
        let now = now()?;

        Ok(InMemoryPromotionsService::new(catalog()).with_clock(move || now))
    }

    fn promotion(status: PromotionStatus) -> Result<Promotion<'static>, jiff::Error> {
        let window = ValidityWindow::new(
            "2026-06-01T00:00:00Z".parse()?,
            "2026-06-30T23:59:59Z".parse()?,
        );

        Ok(Promotion::new(
            "Ten off apparel",
            window,
            RuleSet::new(CombinationOp::And).include_categories(&["apparel"]),
            PromotionVariant::Percentage {
                percentage: Percentage::from(0.1),
                minimum_purchase: Money::from_minor(0, GBP),
            },
        )
        .with_status(status))
    }

    fn order() -> Result<OrderSnapshot<'static>, crate::orders::OrderError> {
        OrderSnapshot::with_lines(
            [LineItem::new(
                CatalogItem::new("tee").with_categories(&["apparel"]),
                Money::from_minor(2_000, GBP),
                1,
            )],
            GBP,
        )
    }

    #[tokio::test]
    async fn create_promotion_stores_first_version() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let record = service
            .create_promotion(tenant, NewPromotion::new(promotion(PromotionStatus::Draft)?))
            .await?;

        assert_eq!(record.version, 1);
        assert_eq!(record.tenant, tenant);
        assert_eq!(record.created_at, now()?);

        let fetched = service.get_promotion(tenant, record.uuid).await?;

        assert_eq!(fetched.uuid, record.uuid);
        assert_eq!(fetched.promotion.name, "Ten off apparel");

        Ok(())
    }

    #[tokio::test]
    async fn create_promotion_is_idempotent() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();
        let key = IdempotencyKey::new();

        let first = service
            .create_promotion(
                tenant,
                NewPromotion::new(promotion(PromotionStatus::Draft)?).with_idempotency_key(key),
            )
            .await?;

        let second = service
            .create_promotion(
                tenant,
                NewPromotion::new(promotion(PromotionStatus::Draft)?).with_idempotency_key(key),
            )
            .await?;

        assert_eq!(first.uuid, second.uuid);
        assert_eq!(service.list_promotions(tenant).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn create_promotion_duplicate_code_returns_conflict() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();
        let code = PromotionCode::parse("TENOFF")?;

        service
            .create_promotion(
                tenant,
                NewPromotion::new(promotion(PromotionStatus::Draft)?.with_code(code.clone())),
            )
            .await?;

        let result = service
            .create_promotion(
                tenant,
                NewPromotion::new(promotion(PromotionStatus::Draft)?.with_code(code.clone())),
            )
            .await;

        assert!(
            matches!(result, Err(PromotionsServiceError::Conflict(ref taken)) if taken == "TENOFF"),
            "expected Conflict, got {result:?}"
        );

        service
            .create_promotion(
                TenantUuid::new(),
                NewPromotion::new(promotion(PromotionStatus::Draft)?.with_code(code)),
            )
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn create_promotion_invalid_returns_validation() -> TestResult {
        let service = service()?;
        let mut invalid = promotion(PromotionStatus::Draft)?;
        invalid.rules = invalid.rules.include_products(&["sock"]);

        let result = service
            .create_promotion(TenantUuid::new(), NewPromotion::new(invalid))
            .await;

        assert!(
            matches!(
                result,
                Err(PromotionsServiceError::Validation(ValidationError::UnknownProduct(_)))
            ),
            "expected Validation, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn get_promotion_is_scoped_to_tenant() -> TestResult {
        let service = service()?;

        let record = service
            .create_promotion(
                TenantUuid::new(),
                NewPromotion::new(promotion(PromotionStatus::Draft)?),
            )
            .await?;

        let result = service.get_promotion(TenantUuid::new(), record.uuid).await;

        assert!(
            matches!(result, Err(PromotionsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_promotion_checks_version() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let record = service
            .create_promotion(tenant, NewPromotion::new(promotion(PromotionStatus::Draft)?))
            .await?;

        let mut renamed = record.promotion.clone();
        renamed.name = "Renamed".to_string();

        let updated = service
            .update_promotion(tenant, record.uuid, 1, renamed.clone())
            .await?;

        assert_eq!(updated.version, 2);
        assert_eq!(updated.promotion.name, "Renamed");

        let result = service
            .update_promotion(tenant, record.uuid, 1, renamed)
            .await;

        assert!(
            matches!(
                result,
                Err(PromotionsServiceError::StaleVersion {
                    expected: 1,
                    actual: 2
                })
            ),
            "expected StaleVersion, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_promotion_rejects_expired() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let record = service
            .create_promotion(tenant, NewPromotion::new(promotion(PromotionStatus::Active)?))
            .await?;

        service
            .refresh_statuses(tenant, "2026-07-05T00:00:00Z".parse()?)
            .await?;

        let result = service
            .update_promotion(tenant, record.uuid, 2, record.promotion)
            .await;

        assert!(
            matches!(result, Err(PromotionsServiceError::Frozen)),
            "expected Frozen, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_promotion_keeps_scheduled_status_after_window_opens() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let record = service
            .create_promotion(tenant, NewPromotion::new(promotion(PromotionStatus::Scheduled)?))
            .await?;

        assert_eq!(record.status_at(now()?), PromotionStatus::Active);

        let mut renamed = service.get_promotion(tenant, record.uuid).await?.promotion;
        renamed.name = "Renamed".to_string();

        let updated = service
            .update_promotion(tenant, record.uuid, 1, renamed)
            .await?;

        assert_eq!(updated.version, 2);
        assert_eq!(updated.promotion.status, PromotionStatus::Scheduled);
        assert_eq!(updated.promotion.name, "Renamed");

        let mut drafted = updated.promotion.clone();
        drafted.status = PromotionStatus::Draft;

        let result = service
            .update_promotion(tenant, record.uuid, 2, drafted)
            .await;

        assert!(
            matches!(result, Err(PromotionsServiceError::Transition(_))),
            "expected Transition, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn transition_promotion_follows_lifecycle() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let record = service
            .create_promotion(tenant, NewPromotion::new(promotion(PromotionStatus::Draft)?))
            .await?;

        let active = service
            .transition_promotion(tenant, record.uuid, 1, PromotionStatus::Active)
            .await?;

        assert_eq!(active.promotion.status, PromotionStatus::Active);
        assert_eq!(active.version, 2);

        let result = service
            .transition_promotion(tenant, record.uuid, 2, PromotionStatus::Draft)
            .await;

        assert!(
            matches!(result, Err(PromotionsServiceError::Transition(_))),
            "expected Transition, got {result:?}"
        );

        let archived = service
            .transition_promotion(tenant, record.uuid, 2, PromotionStatus::Archived)
            .await?;
        let draft = service
            .transition_promotion(tenant, record.uuid, archived.version, PromotionStatus::Draft)
            .await?;

        assert_eq!(draft.promotion.status, PromotionStatus::Draft);
        assert_eq!(draft.version, 4);

        Ok(())
    }

    #[tokio::test]
    async fn transition_promotion_requires_rules_to_publish() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let mut empty = promotion(PromotionStatus::Draft)?;
        empty.rules = RuleSet::new(CombinationOp::Or);

        let record = service
            .create_promotion(tenant, NewPromotion::new(empty))
            .await?;

        let result = service
            .transition_promotion(tenant, record.uuid, 1, PromotionStatus::Scheduled)
            .await;

        assert!(
            matches!(
                result,
                Err(PromotionsServiceError::Validation(ValidationError::EmptyRuleSet))
            ),
            "expected EmptyRuleSet, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn delete_promotion_removes_record() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let record = service
            .create_promotion(tenant, NewPromotion::new(promotion(PromotionStatus::Draft)?))
            .await?;

        service.delete_promotion(tenant, record.uuid).await?;

        let result = service.delete_promotion(tenant, record.uuid).await;

        assert!(
            matches!(result, Err(PromotionsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
        assert!(service.list_promotions(tenant).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn refresh_statuses_persists_time_driven_changes() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let mut upcoming = promotion(PromotionStatus::Scheduled)?;
        upcoming.window.start = "2026-06-20T00:00:00Z".parse()?;

        let scheduled = service
            .create_promotion(tenant, NewPromotion::new(upcoming))
            .await?;
        service
            .create_promotion(tenant, NewPromotion::new(promotion(PromotionStatus::Draft)?))
            .await?;

        assert!(service.refresh_statuses(tenant, now()?).await?.is_empty());

        let changed = service
            .refresh_statuses(tenant, "2026-06-21T00:00:00Z".parse()?)
            .await?;

        assert_eq!(changed, vec![scheduled.uuid]);

        let record = service.get_promotion(tenant, scheduled.uuid).await?;

        assert_eq!(record.promotion.status, PromotionStatus::Active);
        assert_eq!(record.version, 2);

        Ok(())
    }

    #[tokio::test]
    async fn refresh_statuses_leaves_early_active_promotions() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let record = service
            .create_promotion(tenant, NewPromotion::new(promotion(PromotionStatus::Active)?))
            .await?;

        let changed = service
            .refresh_statuses(tenant, "2026-05-20T00:00:00Z".parse()?)
            .await?;

        assert!(changed.is_empty(), "unexpected changes {changed:?}");

        let stored = service.get_promotion(tenant, record.uuid).await?;

        assert_eq!(stored.promotion.status, PromotionStatus::Active);
        assert_eq!(stored.version, 1);

        let changed = service
            .refresh_statuses(tenant, "2026-07-05T00:00:00Z".parse()?)
            .await?;

        assert_eq!(changed, vec![record.uuid]);

        Ok(())
    }

    #[tokio::test]
    async fn apply_promotion_counts_redemptions_until_budget_runs_out() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let record = service
            .create_promotion(
                tenant,
                NewPromotion::new(
                    promotion(PromotionStatus::Active)?
                        .with_budget(RedemptionBudget::with_redemption_limit(2)),
                ),
            )
            .await?;

        for expected in 1..=2 {
            let application = service
                .apply_promotion(tenant, record.uuid, order()?, now()?)
                .await?;

            let redemption = application
                .redemption()
                .ok_or("expected a redemption")?;

            assert_eq!(redemption.redemption_number, expected);
            assert_eq!(redemption.reward.discount(), Money::from_minor(200, GBP));
        }

        let application = service
            .apply_promotion(tenant, record.uuid, order()?, now()?)
            .await?;

        assert_eq!(
            application,
            Application::NotApplicable(NotApplicableReason::BudgetExhausted)
        );

        let record = service.get_promotion(tenant, record.uuid).await?;

        assert_eq!(record.usage.redemptions, 2);
        assert_eq!(record.usage.discounted_minor, 400);
        assert_eq!(record.version, 1);

        Ok(())
    }

    #[tokio::test]
    async fn apply_promotion_ignores_drafts() -> TestResult {
        let service = service()?;
        let tenant = TenantUuid::new();

        let record = service
            .create_promotion(tenant, NewPromotion::new(promotion(PromotionStatus::Draft)?))
            .await?;

        let application = service
            .apply_promotion(tenant, record.uuid, order()?, now()?)
            .await?;

        assert_eq!(
            application,
            Application::NotApplicable(NotApplicableReason::NotActive(PromotionStatus::Draft))
        );

        Ok(())
    }
}
