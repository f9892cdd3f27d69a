use clap::Args;
use credit_risk::config::AppConfig;
use credit_risk::error::AppError;
use credit_risk::scoring::{
    ApplicationCsvImporter, CreditScoringService, MetricsSnapshot, PredictionResult, ScoringArtifacts,
    ScoringError, MAX_BATCH_SIZE,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// CSV export with one application per row and field names as headers
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Override the directory holding the model artifacts
    #[arg(long)]
    pub(crate) artifacts_dir: Option<PathBuf>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        input,
        artifacts_dir,
    } = args;

    let artifacts_dir = match artifacts_dir {
        Some(dir) => dir,
        None => AppConfig::load()?.artifacts.dir,
    };

    let artifacts = ScoringArtifacts::load(&artifacts_dir)?;
    let model = artifacts.load_logistic_model(&artifacts_dir)?;
    let service = CreditScoringService::new(&artifacts, Arc::new(model));

    let applications = ApplicationCsvImporter::from_path(&input)?;
    println!(
        "Scoring {} applications from {} with {} v{}",
        applications.len(),
        input.display(),
        service.model_metadata().model_name,
        service.model_metadata().model_version
    );
    if applications.is_empty() {
        return Ok(());
    }

    let mut row = 0usize;
    for chunk in applications.chunks(MAX_BATCH_SIZE) {
        let results = match service.score_batch(chunk) {
            Ok(results) => results,
            Err(err) => {
                println!("  Batch starting at row {} skipped: {err}", row + 1);
                row += chunk.len();
                continue;
            }
        };
        for result in &results {
            row += 1;
            println!("- row {row}: {}", describe_result(result));
        }
    }

    render_summary(&service.metrics_snapshot());
    Ok(())
}

fn describe_result(result: &Result<PredictionResult, ScoringError>) -> String {
    match result {
        Ok(prediction) => format!(
            "{} (probability of default {:.4}, predicted class {})",
            prediction.decision.label(),
            prediction.probability_of_default,
            prediction.prediction
        ),
        Err(err) => format!("not scored ({err})"),
    }
}

fn render_summary(snapshot: &MetricsSnapshot) {
    let requests = &snapshot.requests;
    let decisions = &snapshot.decisions;
    println!("\nScoring summary");
    println!(
        "- {} records in {} batches | {} rejected before scoring",
        requests.batch_records, requests.batch, requests.rejected_records
    );
    println!(
        "- APPROVE {} | CONDITIONAL_APPROVAL {} | REJECT {}",
        decisions.approve, decisions.conditional_approval, decisions.reject
    );
    println!("- mean batch latency {:.2} ms", snapshot.latency_ms.mean_ms);
}
