//! The capability every replacement strategy implements.

use turboedit_core::{EditBlock, ReplaceResult, StrategyKind};

/// An edit-application strategy.
///
/// Blocks are processed in order on the running content; a failing block
/// does not stop later blocks, and only the first match of a block is
/// replaced. Implementations never panic on bad input: every outcome is a
/// [`ReplaceResult`] tagged with the strategy name under `"strategy"`.
pub trait ReplaceStrategy: Send + Sync {
    /// Which strategy this is
    fn kind(&self) -> StrategyKind;

    /// Whether the strategy can attempt these blocks at all. The fallback
    /// loop skips strategies that answer `false`.
    fn can_handle(&self, content: &str, blocks: &[EditBlock]) -> bool;

    /// Apply `blocks` to `content`.
    fn replace(&self, content: &str, blocks: &[EditBlock]) -> ReplaceResult;
}

/// Per-block error line, `Block N: reason`.
pub(crate) fn block_error(index: usize, err: &turboedit_core::Error) -> String {
    match err {
        turboedit_core::Error::MatchNotFound { reason, .. } => {
            format!("Block {}: {}", index, reason)
        }
        other => format!("Block {}: {}", index, other),
    }
}
