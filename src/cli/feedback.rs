//! Feedback command

use super::helpers::ProfileArgs;
use clap::Args;
use fitrec_core::{
    error::Result, FeedbackSubmission, FitrecConfig, Goal, Recommender, SubmitOutcome,
};

#[derive(Args, Debug)]
pub struct FeedbackArgs {
    /// Username (stored only as a salted hash)
    #[arg(short, long)]
    pub user: String,

    /// Program id the rating refers to
    #[arg(short, long)]
    pub program: String,

    /// Goal that was recommended
    #[arg(short, long)]
    pub goal: Goal,

    /// Rating from 1 to 5
    #[arg(short, long)]
    pub rating: u8,

    /// The goal the user would have preferred
    #[arg(long)]
    pub corrected_goal: Option<Goal>,

    /// Free-text comment
    #[arg(long, default_value = "")]
    pub comment: String,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

/// Handle feedback command
pub async fn handle(config: FitrecConfig, args: FeedbackArgs) -> Result<()> {
    let recommender = Recommender::open(config).await?;

    let mut submission = FeedbackSubmission::new(
        args.user,
        args.profile.snapshot(),
        args.program,
        args.goal,
        args.rating,
    )
    .with_comment(args.comment);
    submission.corrected_goal = args.corrected_goal;

    match recommender.submit_feedback(&submission).await? {
        SubmitOutcome::Recorded(record) => {
            println!("Feedback recorded: {}", record.id);
            println!("  Training label: {}", record.label());
        }
        SubmitOutcome::Duplicate { previous_at } => {
            println!(
                "Already rated this program at {}, nothing recorded",
                previous_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }
    Ok(())
}
