//! DLQ command implementations.

use super::app::AppContext;
use super::output::{format_dlq_json, format_dlq_table};
use super::{DlqCompleteArgs, DlqListArgs, DlqReplayArgs, DlqReplayBatchArgs};

/// Handle `quorum dlq list`.
pub fn handle_dlq_list(
    args: &DlqListArgs,
    context: &AppContext,
) -> Result<String, Box<dyn std::error::Error>> {
    let pending = context.dlq.list_pending(args.operation_type.as_deref())?;

    if args.json {
        return Ok(format_dlq_json(&pending));
    }
    if pending.is_empty() {
        return Ok("Dead-letter queue is empty.".to_string());
    }
    Ok(format_dlq_table(&pending))
}

/// Handle `quorum dlq replay <id>`.
pub async fn handle_dlq_replay(
    args: &DlqReplayArgs,
    context: &AppContext,
) -> Result<String, Box<dyn std::error::Error>> {
    if context.dlq.replay(&args.id).await? {
        Ok(format!("✓ Replayed {}", args.id))
    } else if context.dlq.is_processed(&args.id) {
        Ok(format!("Entry {} was already processed; nothing to do.", args.id))
    } else {
        Ok(format!(
            "Replay of {} failed; the entry is kept for another attempt.",
            args.id
        ))
    }
}

/// Handle `quorum dlq replay-batch`.
pub async fn handle_dlq_replay_batch(
    args: &DlqReplayBatchArgs,
    context: &AppContext,
) -> Result<String, Box<dyn std::error::Error>> {
    let stats = context
        .dlq
        .replay_batch(&args.operation_type, args.max)
        .await?;
    Ok(format!(
        "Replayed {} entries: {} succeeded, {} failed.",
        stats.success + stats.failed,
        stats.success,
        stats.failed
    ))
}

/// Handle `quorum dlq complete <id>`.
pub fn handle_dlq_complete(
    args: &DlqCompleteArgs,
    context: &AppContext,
) -> Result<String, Box<dyn std::error::Error>> {
    if context.dlq.mark_completed(&args.id)? {
        Ok(format!("✓ Marked {} completed", args.id))
    } else {
        Ok(format!("Entry {} was already processed; nothing to do.", args.id))
    }
}
