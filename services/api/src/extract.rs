use clap::Args;
use credit_intake::error::AppError;
use credit_intake::intake::{extract, FeatureSet};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ExtractArgs {
    /// CSV statement with an `amount` column
    pub(crate) path: PathBuf,
}

pub(crate) fn run_extract(args: ExtractArgs) -> Result<(), AppError> {
    let raw = std::fs::read(&args.path)?;
    println!("{}", render_features(&extract(&raw))?);
    Ok(())
}

fn render_features(features: &FeatureSet) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(features)?)
}
