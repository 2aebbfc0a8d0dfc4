use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::analyzers::compare::compare_scenarios;
use crate::analyzers::summary::summarize;
use crate::analyzers::types::{ComparedTable, SummaryTable, UnreachableTable};
use crate::analyzers::unreachable::unreachable_population;
use crate::context::RunContext;
use crate::error::{AccessResult, InputError};
use crate::fetch::{HttpClient, load_source};
use crate::metrics::MetricsTable;
use crate::metrics::assemble::assemble_metrics;
use crate::output::{
    write_compared, write_json, write_metrics, write_summary, write_unreachable,
};
use crate::parser::{
    parse_compared, parse_impact_area, parse_matrix, parse_metrics, parse_summary,
    parse_zone_table,
};
use crate::quality::QualityReport;
use crate::table::{DemographicsTable, ImpactArea, OpportunityTable, TravelTimeMatrix};
use crate::validate::{validate_inputs, write_findings};

/// The zone tables shared by every scenario.
pub struct Inputs {
    pub opportunities: OpportunityTable,
    pub demographics: DemographicsTable,
    pub impact: ImpactArea,
}

impl Inputs {
    pub async fn load<C: HttpClient>(ctx: &RunContext, client: &C) -> Result<Self> {
        let (opportunities, (demographics, impact)) = tokio::try_join!(
            load_opportunities(ctx, client),
            load_population(ctx, client),
        )?;
        Ok(Inputs {
            opportunities,
            demographics,
            impact,
        })
    }
}

async fn load_opportunities<C: HttpClient>(
    ctx: &RunContext,
    client: &C,
) -> Result<OpportunityTable> {
    let source = ctx.opportunities_source();
    let bytes = load_source(client, &source).await?;
    let table = parse_zone_table("opportunities", &bytes, ctx.config.zone_id_width)
        .with_context(|| format!("parsing {source}"))?;
    info!(table = table.name(), zones = table.len(), "Table loaded");
    Ok(table)
}

/// Demographics and the impact area, the inputs of the population stages.
async fn load_population<C: HttpClient>(
    ctx: &RunContext,
    client: &C,
) -> Result<(DemographicsTable, ImpactArea)> {
    let width = ctx.config.zone_id_width;
    let demo_source = ctx.demographics_source();
    let impact_source = ctx.impact_area_source();
    let (demo_bytes, impact_bytes) = tokio::try_join!(
        load_source(client, &demo_source),
        load_source(client, &impact_source),
    )?;
    let demographics = parse_zone_table("demographics", &demo_bytes, width)
        .with_context(|| format!("parsing {demo_source}"))?;
    info!(table = demographics.name(), zones = demographics.len(), "Table loaded");
    let impact =
        parse_impact_area(&impact_bytes, width).with_context(|| format!("parsing {impact_source}"))?;
    Ok((demographics, impact))
}

async fn load_matrices<C: HttpClient>(
    ctx: &RunContext,
    client: &C,
) -> Result<Vec<TravelTimeMatrix>> {
    let mut matrices = Vec::with_capacity(ctx.scenario_count());
    for idx in 0..ctx.scenario_count() {
        let source = ctx.matrix_source(idx);
        let bytes = load_source(client, &source).await?;
        let matrix = parse_matrix(&bytes, ctx.config.zone_id_width)
            .with_context(|| format!("parsing {source}"))?;
        info!(scenario = idx, rows = matrix.len(), "Matrix loaded");
        matrices.push(matrix);
    }
    Ok(matrices)
}

/// Reads a file produced by an earlier stage.
fn read_output(path: &Path) -> Result<Vec<u8>, InputError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(InputError::Missing(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

fn read_metrics(ctx: &RunContext) -> Result<Vec<MetricsTable>> {
    (0..ctx.scenario_count())
        .map(|idx| {
            let path = ctx.workspace.metrics_path(idx);
            let bytes = read_output(&path)?;
            parse_metrics(&bytes, ctx.config.zone_id_width)
                .with_context(|| format!("parsing {}", path.display()))
        })
        .collect()
}

fn read_compared(ctx: &RunContext) -> Result<ComparedTable> {
    let path = ctx.workspace.compared_path();
    let bytes = read_output(&path)?;
    parse_compared(&bytes, ctx.config.zone_id_width)
        .with_context(|| format!("parsing {}", path.display()))
}

/// Loads `summary.csv` for display.
pub fn read_summary(ctx: &RunContext) -> Result<SummaryTable> {
    let path = ctx.workspace.summary_path();
    let bytes = read_output(&path)?;
    parse_summary(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn validation_stage(
    ctx: &RunContext,
    inputs: &Inputs,
    matrices: &[TravelTimeMatrix],
    report: &mut QualityReport,
) -> AccessResult<()> {
    let findings = validate_inputs(
        matrices,
        &inputs.opportunities,
        &inputs.demographics,
        &inputs.impact,
        &ctx.config.demographics,
        report,
    );
    write_findings(&ctx.workspace.validation_dir(), &findings)?;
    info!(warnings = report.len(), "Validation complete");
    Ok(())
}

fn metrics_stage(
    ctx: &RunContext,
    opportunities: &OpportunityTable,
    matrices: &[TravelTimeMatrix],
    report: &mut QualityReport,
) -> AccessResult<Vec<MetricsTable>> {
    let mut tables = Vec::with_capacity(matrices.len());
    for (idx, matrix) in matrices.iter().enumerate() {
        let table = assemble_metrics(idx, matrix, opportunities, &ctx.config.opportunities, report);
        write_metrics(&ctx.workspace.metrics_path(idx), &table)?;
        tables.push(table);
    }
    Ok(tables)
}

fn compare_stage(
    ctx: &RunContext,
    metrics: &[MetricsTable],
    report: &mut QualityReport,
) -> AccessResult<ComparedTable> {
    let compared = compare_scenarios(metrics, ctx.config.infinity_value, report);
    write_compared(&ctx.workspace.compared_path(), &compared)?;
    Ok(compared)
}

fn summary_stage(
    ctx: &RunContext,
    compared: &ComparedTable,
    demographics: &DemographicsTable,
    impact: &ImpactArea,
    report: &mut QualityReport,
) -> AccessResult<SummaryTable> {
    let summary = summarize(
        compared,
        demographics,
        impact,
        &ctx.config.demographics,
        report,
    )?;
    write_summary(&ctx.workspace.summary_path(), &summary)?;
    Ok(summary)
}

fn unreachable_stage(
    ctx: &RunContext,
    metrics: &[MetricsTable],
    demographics: &DemographicsTable,
    impact: &ImpactArea,
) -> AccessResult<UnreachableTable> {
    let table = unreachable_population(
        metrics,
        demographics,
        impact,
        &ctx.config.opportunities,
        &ctx.config.demographics,
    )?;
    write_unreachable(&ctx.workspace.unreachable_path(), &table)?;
    Ok(table)
}

/// Replaces `validation/quality.json` with the warnings of a full run.
fn finish(ctx: &RunContext, report: QualityReport) -> Result<QualityReport> {
    write_json(&ctx.workspace.quality_path(), &report)?;
    info!(warnings = report.len(), "Quality report written");
    Ok(report)
}

/// Adds one stage's warnings to those already in `validation/quality.json`,
/// so running the stages one at a time keeps what earlier stages found.
fn finish_stage(ctx: &RunContext, report: QualityReport) -> Result<QualityReport> {
    let path = ctx.workspace.quality_path();
    let mut merged = match read_output(&path) {
        Ok(bytes) => match serde_json::from_slice::<QualityReport>(&bytes) {
            Ok(earlier) => earlier,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable quality report replaced");
                QualityReport::new()
            }
        },
        Err(InputError::Missing(_)) => QualityReport::new(),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    merged.generated_at = report.generated_at;
    merged.merge(report);
    finish(ctx, merged)
}

#[tracing::instrument(skip_all, parent = &ctx.span)]
pub async fn run_validation<C: HttpClient>(ctx: &RunContext, client: &C) -> Result<QualityReport> {
    let inputs = Inputs::load(ctx, client).await?;
    let matrices = load_matrices(ctx, client).await?;
    let mut report = QualityReport::new();
    validation_stage(ctx, &inputs, &matrices, &mut report)?;
    finish_stage(ctx, report)
}

#[tracing::instrument(skip_all, parent = &ctx.span)]
pub async fn run_metrics<C: HttpClient>(ctx: &RunContext, client: &C) -> Result<QualityReport> {
    let opportunities = load_opportunities(ctx, client).await?;
    let matrices = load_matrices(ctx, client).await?;
    let mut report = QualityReport::new();
    metrics_stage(ctx, &opportunities, &matrices, &mut report)?;
    finish_stage(ctx, report)
}

/// Compares the metrics files already in the workspace.
#[tracing::instrument(skip_all, parent = &ctx.span)]
pub fn run_compare(ctx: &RunContext) -> Result<QualityReport> {
    let metrics = read_metrics(ctx)?;
    let mut report = QualityReport::new();
    compare_stage(ctx, &metrics, &mut report)?;
    finish_stage(ctx, report)
}

#[tracing::instrument(skip_all, parent = &ctx.span)]
pub async fn run_summary<C: HttpClient>(ctx: &RunContext, client: &C) -> Result<QualityReport> {
    let compared = read_compared(ctx)?;
    let (demographics, impact) = load_population(ctx, client).await?;
    let mut report = QualityReport::new();
    summary_stage(ctx, &compared, &demographics, &impact, &mut report)?;
    finish_stage(ctx, report)
}

#[tracing::instrument(skip_all, parent = &ctx.span)]
pub async fn run_unreachable<C: HttpClient>(ctx: &RunContext, client: &C) -> Result<QualityReport> {
    let metrics = read_metrics(ctx)?;
    let (demographics, impact) = load_population(ctx, client).await?;
    unreachable_stage(ctx, &metrics, &demographics, &impact)?;
    finish_stage(ctx, QualityReport::new())
}

/// Full pipeline: validate, metrics, compare, then summary and unreachable
/// population side by side. Inputs are loaded once.
#[tracing::instrument(skip_all, parent = &ctx.span)]
pub async fn run_all<C: HttpClient>(ctx: &RunContext, client: &C) -> Result<QualityReport> {
    let (inputs, matrices) = tokio::try_join!(Inputs::load(ctx, client), load_matrices(ctx, client))?;
    let mut report = QualityReport::new();

    validation_stage(ctx, &inputs, &matrices, &mut report)?;
    let metrics = metrics_stage(ctx, &inputs.opportunities, &matrices, &mut report)?;
    drop(matrices);
    let compared = compare_stage(ctx, &metrics, &mut report)?;

    let summary = || {
        let mut summary_report = QualityReport::new();
        summary_stage(
            ctx,
            &compared,
            &inputs.demographics,
            &inputs.impact,
            &mut summary_report,
        )
        .map(|_| summary_report)
    };
    let unreachable = || unreachable_stage(ctx, &metrics, &inputs.demographics, &inputs.impact);

    #[cfg(feature = "parallel")]
    let (summary, unreachable) = rayon::join(summary, unreachable);
    #[cfg(not(feature = "parallel"))]
    let (summary, unreachable) = (summary(), unreachable());
    // the findings gathered so far are written even when a population stage fails
    let population = summary
        .map(|summary_report| report.merge(summary_report))
        .and(unreachable.map(drop));
    let report = finish(ctx, report)?;
    population?;
    info!(scenarios = metrics.len(), "Analysis complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::context::Workspace;
    use crate::fetch::BasicClient;

    const CONFIG: &str = r#"
uid: unit
infinity_value: 1000
scenarios:
  - {name: Base, start_datetime: "2023-05-01 07:00", duration: 60}
opportunities:
  jobs: {method: cumulative, parameters: [30]}
"#;

    fn context(dir: &Path) -> RunContext {
        RunContext::new(AnalysisConfig::from_yaml(CONFIG).unwrap(), Workspace::new(dir))
    }

    #[test]
    fn test_compare_without_metrics_names_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = run_compare(&ctx).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::Missing(p)) if p.ends_with("metrics0.csv")
        ));
    }

    #[tokio::test]
    async fn test_summary_without_compared_names_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = run_summary(&ctx, &BasicClient::new()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::Missing(p)) if p.ends_with("compared.csv")
        ));
    }

    #[tokio::test]
    async fn test_metrics_without_matrix_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("opportunities.csv"), "bg_id,jobs\n1,4\n").unwrap();
        let ctx = context(dir.path());
        let err = run_metrics(&ctx, &BasicClient::new()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::Missing(p)) if p.ends_with("matrix0.csv")
        ));
        assert!(!ctx.workspace.metrics_path(0).exists());
    }
}
