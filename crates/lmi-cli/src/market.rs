//! `search` and `analyze` command handlers.
//!
//! Both commands end in [`finish`], which prints the report, writes the
//! requested export files, and turns a [`SearchError`] into the process exit
//! status.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use lmi_core::{AppConfig, FieldMap, SearchQuery};
use lmi_insight::GeminiClient;
use lmi_market::{snapshot_csv, Pipeline, SearchError, SearchOutcome};
use lmi_scraper::ApifyClient;

use crate::report;
use crate::{OutputArgs, QueryArgs};

/// Exit status for a query the user has to fix.
const EXIT_INVALID_INPUT: u8 = 2;

pub(crate) fn build_query(config: &AppConfig, args: &QueryArgs) -> SearchQuery {
    SearchQuery::new(
        args.business_type.clone().unwrap_or_default(),
        args.city.clone().unwrap_or_default(),
    )
    .with_country(args.country.clone().unwrap_or_default())
    .with_max_results(args.max_results.unwrap_or(config.default_max_results))
    .with_min_reviews(args.min_reviews)
}

pub(crate) fn build_pipeline(config: &AppConfig, output: &OutputArgs) -> anyhow::Result<Pipeline> {
    let field_map = match &config.field_map_path {
        Some(path) => lmi_core::load_field_map(path)
            .with_context(|| format!("failed to load field map from {}", path.display()))?,
        None => FieldMap::default(),
    };
    Ok(Pipeline::new(field_map).with_top_k(output.top))
}

/// Live search against the configured scrape provider.
///
/// # Errors
///
/// Returns an error when a client cannot be built (missing token, bad base
/// URL) or an output file cannot be written. Search failures are reported
/// through the exit code instead.
pub(crate) async fn run_search(
    config: &AppConfig,
    query_args: &QueryArgs,
    output: &OutputArgs,
    insights: bool,
) -> anyhow::Result<ExitCode> {
    let query = build_query(config, query_args);
    let pipeline = build_pipeline(config, output)?;

    // Validate before building clients so a bad query never needs a token.
    if let Err(problems) = query.validate() {
        return finish(Err(SearchError::InputValidation(problems)), output);
    }

    let scraper = ApifyClient::from_config(config).context("cannot run a live search")?;
    let insight = if insights {
        Some(GeminiClient::from_config(config).context("--insights needs a narrative provider")?)
    } else {
        None
    };

    println!(
        "Scraping live data for '{}'. This can take a minute or two...",
        query.search_string()
    );
    let result = pipeline.search(query, &scraper, insight.as_ref()).await;
    finish(result, output)
}

/// Offline analysis of a dataset saved from an earlier scrape.
///
/// # Errors
///
/// Returns an error when the input file cannot be read or is not JSON, or an
/// output file cannot be written.
pub(crate) fn run_analyze(
    config: &AppConfig,
    input: &Path,
    query_args: &QueryArgs,
    output: &OutputArgs,
) -> anyhow::Result<ExitCode> {
    let query = build_query(config, query_args);
    let pipeline = build_pipeline(config, output)?;

    let content = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", input.display()))?;

    let result = pipeline.analyze_payload(query, &payload);
    finish(result, output)
}

fn finish(
    result: Result<SearchOutcome, SearchError>,
    output: &OutputArgs,
) -> anyhow::Result<ExitCode> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => return Ok(report_failure(&err)),
    };

    report::print_outcome(&outcome);
    write_outputs(&outcome, output)?;
    Ok(ExitCode::SUCCESS)
}

fn report_failure(err: &SearchError) -> ExitCode {
    match err {
        SearchError::InputValidation(_) => {
            tracing::warn!(error = %err, "search rejected");
            eprintln!("warning: {err}");
            ExitCode::from(EXIT_INVALID_INPUT)
        }
        SearchError::EmptyResult => {
            println!("{err}. Try a broader business type or a nearby city.");
            ExitCode::SUCCESS
        }
        SearchError::ExternalService { .. } | SearchError::InvalidPayload(_) => {
            tracing::error!(error = %err, "search failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn write_outputs(outcome: &SearchOutcome, output: &OutputArgs) -> anyhow::Result<()> {
    if let Some(path) = &output.csv {
        std::fs::write(path, snapshot_csv(&outcome.snapshot))
            .with_context(|| format!("failed to write CSV to {}", path.display()))?;
        println!("wrote {} rows to {}", outcome.snapshot.records.len(), path.display());
    }

    if let Some(path) = &output.markers {
        match &outcome.map {
            Some(map) => {
                let json = serde_json::to_string_pretty(map)?;
                std::fs::write(path, json)
                    .with_context(|| format!("failed to write markers to {}", path.display()))?;
                println!("wrote {} markers to {}", map.markers.len(), path.display());
            }
            None => {
                tracing::warn!(
                    path = %path.display(),
                    "no mappable businesses; markers file not written"
                );
            }
        }
    }

    Ok(())
}
