//! Recommend command

use super::helpers::ProfileArgs;
use fitrec_core::{error::Result, FitrecConfig, Recommender};

/// Handle recommend command
pub async fn handle(config: FitrecConfig, profile: ProfileArgs, json: bool) -> Result<()> {
    let recommender = Recommender::open(config).await?;
    let profile = profile.snapshot();
    let recommendation = recommender.recommend(&profile).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recommendation)?);
        return Ok(());
    }

    match recommendation.goal {
        Some(goal) => println!("Recommended goal: {}", goal),
        None => println!("No model available, showing default programs"),
    }
    println!("BMI: {:.1}", profile.bmi());
    println!();
    for program in &recommendation.programs {
        println!("  {} ({})", program.name, program.id);
        println!("    {}", program.activities.join(", "));
        println!("    {}", program.schedule);
    }
    Ok(())
}
