//! Model info and retraining history commands

use fitrec_core::{error::Result, FitrecConfig, Recommender};

/// Handle info command
pub async fn handle_info(config: FitrecConfig, json: bool) -> Result<()> {
    let recommender = Recommender::open(config).await?;
    let report = recommender.model_info().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let model = &report.model;
    let labels: Vec<String> = model.labels.iter().map(|g| g.to_string()).collect();

    println!("Model state: {}", model.state);
    println!("  Classifier: {} ({} features)", model.classifier_type, model.feature_count);
    println!("  Labels: {}", labels.join(", "));
    match &model.generation {
        Some(generation) => println!("  Generation: {}", generation),
        None => println!("  Generation: none"),
    }
    if let (Some(kind), Some(trained_at)) = (model.kind, model.trained_at) {
        println!("  Trained: {} ({})", trained_at.format("%Y-%m-%d %H:%M:%S UTC"), kind);
    }
    if let Some(size) = model.corpus_size {
        println!("  Corpus size: {}", size);
    }
    if let Some(last) = model.last_retrain {
        println!("  Last retrain: {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Feedback rows: {}", report.feedback_count);
    if let Some(avg) = report.average_rating {
        println!("  Average rating: {:.2}", avg);
    }
    Ok(())
}

/// Handle history command
pub async fn handle_history(config: FitrecConfig, limit: usize) -> Result<()> {
    let recommender = Recommender::open(config).await?;
    let history = recommender.manager().history().await?;

    if history.is_empty() {
        println!("No retraining history");
        return Ok(());
    }

    let skip = history.len().saturating_sub(limit);
    for entry in history.iter().skip(skip) {
        println!(
            "{}  {:<8}  {}  corpus={} new={} feedback={}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.kind.to_string(),
            entry.generation,
            entry.corpus_size,
            entry.new_samples,
            entry.feedback_rows
        );
    }
    Ok(())
}
