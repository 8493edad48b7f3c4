//! Redemption limits hold when many checkouts race for the same promotion.

use std::sync::Arc;

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::GBP};
use testresult::TestResult;

use trellis::{
    catalog::{Catalog, CatalogItem},
    lifecycle::{PromotionStatus, ValidityWindow},
    orders::{LineItem, OrderSnapshot},
    promotions::{NotApplicableReason, Promotion, budget::RedemptionBudget},
    rules::{CombinationOp, RuleSet},
    service::{
        InMemoryPromotionsService, PromotionsService,
        records::{Application, NewPromotion, TenantUuid},
    },
    variants::PromotionVariant,
};

const CHECKOUTS: usize = 20;
const LIMIT: u64 = 5;

fn tee() -> CatalogItem {
    CatalogItem::new("tee").with_categories(&["apparel"])
}

fn order() -> TestResult<OrderSnapshot<'static>> {
    Ok(OrderSnapshot::with_lines(
        [LineItem::new(tee(), Money::from_minor(2_000, GBP), 1)],
        GBP,
    )?)
}

fn promotion(budget: RedemptionBudget<'static>) -> TestResult<Promotion<'static>> {
    Ok(Promotion::new(
        "Flash sale",
        ValidityWindow::new(
            "2026-06-01T00:00:00Z".parse()?,
            "2026-06-30T23:59:59Z".parse()?,
        ),
        RuleSet::new(CombinationOp::And).include_categories(&["apparel"]),
        PromotionVariant::Percentage {
            percentage: Percentage::from(Decimal::new(20, 2)),
            minimum_purchase: Money::from_minor(0, GBP),
        },
    )
    .with_status(PromotionStatus::Active)
    .with_budget(budget))
}

async fn race(
    budget: RedemptionBudget<'static>,
) -> TestResult<Vec<Application>> {
    let now: Timestamp = "2026-06-15T12:00:00Z".parse()?;
    let catalog: Catalog = [tee()].into_iter().collect();
    let service = Arc::new(InMemoryPromotionsService::new(catalog).with_clock(move || now));
    let tenant = TenantUuid::new();

    let uuid = service
        .create_promotion(tenant, NewPromotion::new(promotion(budget)?))
        .await?
        .uuid;

    let mut handles = Vec::with_capacity(CHECKOUTS);

    for _ in 0..CHECKOUTS {
        let service = Arc::clone(&service);
        let order = order()?;

        handles.push(tokio::spawn(async move {
            service
                .apply_promotion(tenant, uuid, order, now)
                .await
        }));
    }

    let mut applications = Vec::with_capacity(CHECKOUTS);

    for handle in handles {
        applications.push(handle.await??);
    }

    Ok(applications)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn redemption_limit_is_never_exceeded() -> TestResult {
    let applications = race(RedemptionBudget::with_redemption_limit(LIMIT)).await?;

    let mut numbers: Vec<u64> = applications
        .iter()
        .filter_map(Application::redemption)
        .map(|redemption| redemption.redemption_number)
        .collect();

    numbers.sort_unstable();

    assert_eq!(numbers, (1..=LIMIT).collect::<Vec<_>>());

    let exhausted = applications
        .iter()
        .filter(|application| {
            **application == Application::NotApplicable(NotApplicableReason::BudgetExhausted)
        })
        .count();

    assert_eq!(exhausted, CHECKOUTS - numbers.len());

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn monetary_limit_caps_total_discount() -> TestResult {
    // Each checkout earns 400; 1000 covers two full discounts and a partial third
    let applications = race(RedemptionBudget::with_monetary_limit(Money::from_minor(
        1_000, GBP,
    )))
    .await?;

    let discounts: Vec<i64> = applications
        .iter()
        .filter_map(Application::redemption)
        .map(|redemption| redemption.reward.discount().to_minor_units())
        .collect();

    assert_eq!(discounts.iter().sum::<i64>(), 1_000);
    assert_eq!(discounts.len(), 3);

    Ok(())
}
