//! Retrain command (administrative trigger)

use fitrec_core::{error::Result, FitrecConfig, FitrecError, Recommender, RetrainOutcome};

/// Handle retrain command
pub async fn handle(config: FitrecConfig, force: bool) -> Result<()> {
    let recommender = Recommender::open(config).await?;

    if force {
        println!("Running forced retrain...");
    } else {
        println!("Checking retrain trigger...");
    }

    match recommender.retrain(force).await {
        RetrainOutcome::Retrained(summary) => {
            println!(" Retrain complete ({}):", summary.kind);
            println!("  Generation: {} -> {}", summary.previous_generation, summary.generation);
            println!("  Corpus size: {}", summary.corpus_size);
            println!("  New samples: {}", summary.new_samples);
            println!("  Historical samples: {}", summary.historical_samples);
            println!("  Evicted: {}", summary.evicted);
            println!("  Filtered (low rating): {}", summary.filtered);
            Ok(())
        }
        RetrainOutcome::Skipped(reason) => {
            println!(" Retrain skipped: {}", reason);
            Ok(())
        }
        RetrainOutcome::Failed(reason) => {
            eprintln!(" Retrain failed: {}", reason);
            Err(FitrecError::Retrain(reason))
        }
    }
}
