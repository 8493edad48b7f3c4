//! Trellis
//!
//! Trellis decides which order lines a promotion covers, what the promotion
//! gives back, and when it may be evaluated at all.
//!
//! Eligibility is a [`rules::RuleSet`] of included and excluded products,
//! categories and attributes. The reward mechanic is a
//! [`variants::PromotionVariant`], and [`lifecycle`] moves a promotion from
//! draft through to expiry. [`service`] stores promotions per tenant and
//! redeems them against budgets.

pub mod catalog;
pub mod config;
pub mod data;
pub mod discounts;
pub mod fixtures;
pub mod ids;
pub mod lifecycle;
pub mod observability;
pub mod orders;
pub mod promotions;
pub mod report;
pub mod rewards;
pub mod rules;
pub mod service;
pub mod validation;
pub mod variants;
