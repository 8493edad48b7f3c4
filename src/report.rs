//! Report
//!
//! Terminal tables for fixture validation and evaluation results.

use std::{fmt::Write, io};

use jiff::Timestamp;
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    lifecycle::PromotionStatus,
    promotions::{Evaluation, Promotion},
    rewards::Reward,
};

/// Errors that can occur when writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Error writing to the output.
    #[error("failed to write report")]
    IO,
}

/// Outcome of validating one promotion draft.
#[derive(Debug, Clone)]
struct ValidationRow {
    key: String,
    name: String,
    variant: &'static str,
    status: PromotionStatus,
    problem: Option<String>,
}

/// Validation results for a fixture set.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    rows: Vec<ValidationRow>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a promotion that passed validation.
    pub fn push_valid(&mut self, key: &str, promotion: &Promotion<'_>) {
        self.rows.push(ValidationRow {
            key: key.to_string(),
            name: promotion.name.clone(),
            variant: promotion.variant.type_as_str(),
            status: promotion.status,
            problem: None,
        });
    }

    /// Record a promotion that failed validation.
    pub fn push_invalid(
        &mut self,
        key: &str,
        name: &str,
        status: PromotionStatus,
        problem: &impl std::fmt::Display,
    ) {
        self.rows.push(ValidationRow {
            key: key.to_string(),
            name: name.to_string(),
            variant: "-",
            status,
            problem: Some(problem.to_string()),
        });
    }

    /// Number of promotions that failed validation.
    pub fn failures(&self) -> usize {
        self.rows.iter().filter(|row| row.problem.is_some()).count()
    }

    /// Number of promotions checked.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing was checked.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the report as a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        let mut builder = Builder::default();
        let mut color_ops: SmallVec<[(usize, usize, Color); 16]> = SmallVec::new();

        builder.push_record(["Promotion", "Name", "Type", "Status", "Result"]);

        for (i, row) in self.rows.iter().enumerate() {
            let result = match &row.problem {
                Some(problem) => {
                    color_ops.push((i + 1, 4, Color::FG_RED));
                    problem.clone()
                }
                None => {
                    color_ops.push((i + 1, 4, Color::FG_GREEN));
                    "ok".to_string()
                }
            };

            builder.push_record([
                row.key.clone(),
                row.name.clone(),
                row.variant.to_string(),
                row.status.to_string(),
                result,
            ]);
        }

        write_table(&mut out, builder, &[], None, color_ops)?;

        writeln!(
            out,
            " {} promotions checked, {} invalid\n",
            self.len(),
            self.failures()
        )
        .map_err(|_err| ReportError::IO)
    }
}

/// Outcome of evaluating one promotion against one order.
#[derive(Debug, Clone)]
struct EvaluationRow {
    order: String,
    promotion: String,
    status: PromotionStatus,
    outcome: String,
    discount: String,
    gifts: String,
    applied: bool,
}

/// Evaluation results for a fixture set.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    evaluated_at: Timestamp,
    rows: Vec<EvaluationRow>,
}

impl EvaluationReport {
    /// Create an empty report for evaluations at `evaluated_at`.
    pub fn new(evaluated_at: Timestamp) -> Self {
        Self {
            evaluated_at,
            rows: Vec::new(),
        }
    }

    /// Record an evaluation.
    pub fn push(
        &mut self,
        order: &str,
        promotion_key: &str,
        promotion: &Promotion<'_>,
        evaluation: &Evaluation<'_>,
    ) {
        let (outcome, discount, gifts, applied) = match evaluation {
            Evaluation::Applied(reward) => (
                "applied".to_string(),
                reward.discount().to_string(),
                gift_cell(reward),
                true,
            ),
            Evaluation::NotApplicable(reason) => {
                (reason.to_string(), "-".to_string(), "-".to_string(), false)
            }
        };

        self.rows.push(EvaluationRow {
            order: order.to_string(),
            promotion: promotion_key.to_string(),
            status: promotion.status_at(self.evaluated_at),
            outcome,
            discount,
            gifts,
            applied,
        });
    }

    /// Number of evaluations where the promotion applied.
    pub fn applied(&self) -> usize {
        self.rows.iter().filter(|row| row.applied).count()
    }

    /// Number of evaluations recorded.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing was evaluated.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the report as a table, one block of rows per order.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        let mut builder = Builder::default();
        let mut order_boundary_rows: SmallVec<[usize; 16]> = SmallVec::new();
        let mut color_ops: SmallVec<[(usize, usize, Color); 32]> = SmallVec::new();

        builder.push_record(["Order", "Promotion", "Status", "Outcome", "Discount", "Gifts"]);

        let mut previous_order: Option<&str> = None;

        for (i, row) in self.rows.iter().enumerate() {
            let table_row = i + 1;
            let first_of_order = previous_order != Some(row.order.as_str());

            if first_of_order {
                order_boundary_rows.push(table_row);
            }

            previous_order = Some(row.order.as_str());

            color_ops.push((
                table_row,
                3,
                if row.applied {
                    Color::FG_GREEN
                } else {
                    color_dark_grey()
                },
            ));

            builder.push_record([
                if first_of_order {
                    row.order.clone()
                } else {
                    String::new()
                },
                row.promotion.clone(),
                row.status.to_string(),
                row.outcome.clone(),
                row.discount.clone(),
                row.gifts.clone(),
            ]);
        }

        write_table(&mut out, builder, &order_boundary_rows, Some(4), color_ops)?;

        writeln!(
            out,
            " Evaluated at {}: {} of {} evaluations applied\n",
            self.evaluated_at,
            self.applied(),
            self.len()
        )
        .map_err(|_err| ReportError::IO)
    }
}

fn gift_cell(reward: &Reward<'_>) -> String {
    if reward.gifts().is_empty() {
        return "-".to_string();
    }

    let mut cell = String::new();

    for (i, gift) in reward.gifts().iter().enumerate() {
        if i > 0 {
            cell.push_str(", ");
        }

        _ = write!(cell, "{} ×{}", gift.product, gift.quantity);
    }

    cell
}

fn write_table(
    out: &mut impl io::Write,
    builder: Builder,
    boundary_rows: &[usize],
    right_aligned: Option<usize>,
    color_ops: impl IntoIterator<Item = (usize, usize, Color)>,
) -> Result<(), ReportError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    for &row in boundary_rows {
        if row > 1 {
            theme.insert_horizontal_line(row, separator);
        }
    }

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);

    if let Some(column) = right_aligned {
        table.modify(Columns::new(column..=column), Alignment::right());
    }

    for (row, col, color) in color_ops {
        table.modify((row, col), color);
    }

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReportError::IO)
}

/// Wraps runs of box-drawing characters (U+2500..U+257F) in dark grey.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            out.push_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            out.push_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        out.push_str("\x1b[0m");
    }

    out
}

fn color_dark_grey() -> Color {
    Color::new("\x1b[90m", "\x1b[0m")
}
