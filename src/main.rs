//! Trellis CLI

use std::{
    io::{self, Write},
    process::ExitCode,
    time::Instant,
};

use humanize_duration::{Truncate, prelude::DurationExt};
use jiff::Timestamp;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use trellis::{
    config::{Command, Config, EvaluateArgs, ValidateArgs},
    fixtures::{Fixture, FixtureError},
    observability,
    promotions::EvaluationError,
    report::{EvaluationReport, ReportError, ValidationReport},
};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0} promotion(s) failed validation")]
    Invalid(usize),
}

/// Trellis CLI entry point
pub fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            // Help and version output also arrive here
            _ = err.print();

            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(err) = observability::init(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln"
        )]
        {
            eprintln!("{err}");
        }

        return ExitCode::FAILURE;
    }

    let result = match &config.command {
        Command::Validate(args) => validate(&config, args),
        Command::Evaluate(args) => evaluate(&config, args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");

            ExitCode::FAILURE
        }
    }
}

fn validate(config: &Config, args: &ValidateArgs) -> Result<(), CliError> {
    let fixture = Fixture::from_set_in(&config.fixtures_dir, &args.fixture)?;
    let mut report = ValidationReport::new();

    for (key, draft) in fixture.drafts() {
        match draft.validate(fixture.catalog()) {
            Ok(promotion) => report.push_valid(key, &promotion),
            Err(err) => {
                debug!(promotion = %key, error = %err, "promotion failed validation");
                report.push_invalid(key, &draft.name, draft.status, &err);
            }
        }
    }

    report.write_to(io::stdout().lock())?;

    match report.failures() {
        0 => Ok(()),
        failures => Err(CliError::Invalid(failures)),
    }
}

fn evaluate(config: &Config, args: &EvaluateArgs) -> Result<(), CliError> {
    let fixture = Fixture::from_set_in(&config.fixtures_dir, &args.fixture)?;
    let now = args.at.unwrap_or_else(Timestamp::now);

    let orders = match &args.order {
        Some(key) => vec![(key.as_str(), fixture.order(key)?)],
        None => fixture
            .orders()
            .iter()
            .map(|(key, order)| (key.as_str(), order))
            .collect(),
    };

    let mut promotions = Vec::with_capacity(fixture.drafts().len());

    for (key, _) in fixture.drafts() {
        match fixture.promotion(key) {
            Ok(promotion) => promotions.push((key.as_str(), promotion)),
            Err(err) => warn!(promotion = %key, "skipping promotion: {err}"),
        }
    }

    info!(
        fixture = %args.fixture,
        orders = orders.len(),
        promotions = promotions.len(),
        at = %now,
        "evaluating fixture set"
    );

    let start = Instant::now();
    let mut report = EvaluationReport::new(now);

    for (order_key, order) in &orders {
        for (promotion_key, promotion) in &promotions {
            let evaluation = promotion.evaluate(order, now)?;

            report.push(order_key, promotion_key, promotion, &evaluation);
        }
    }

    let elapsed = start.elapsed();

    let mut handle = io::stdout().lock();

    report.write_to(&mut handle)?;

    writeln!(
        handle,
        " {} ({}s)",
        elapsed.human(Truncate::Nano),
        elapsed.as_secs_f32()
    )?;

    Ok(())
}
