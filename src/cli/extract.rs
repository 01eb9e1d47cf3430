//! Extract command implementation.

use super::output::{format_outcome_json, format_outcome_table};
use super::{app::AppContext, ExtractArgs};
use crate::backend::types::ExtractionRequest;
use std::io::Read;
use uuid::Uuid;

/// Handle `quorum extract`.
pub async fn handle_extract(
    args: &ExtractArgs,
    context: &AppContext,
) -> Result<String, Box<dyn std::error::Error>> {
    let text = read_input(args)?;
    let correlation_id = args
        .correlation_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut request = ExtractionRequest::new(correlation_id, text);
    request.source = args.source.clone();

    let outcome = context.orchestrator.extract(&request).await?;

    Ok(if args.json {
        format_outcome_json(&outcome)
    } else {
        format_outcome_table(&outcome)
    })
}

fn read_input(args: &ExtractArgs) -> Result<String, Box<dyn std::error::Error>> {
    if args.input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(&args.input)?)
    }
}
