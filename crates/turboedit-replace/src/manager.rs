//! Strategy selection and ordered fallback.

use crate::fuzzy::SimilarityReplacer;
use crate::patch::PatchReplacer;
use crate::strategy::ReplaceStrategy;
use crate::string::StringReplacer;
use serde_json::json;
use std::collections::HashMap;
use turboedit_core::{EditBlock, EditorConfig, ReplaceResult, StrategyKind, validate_blocks};

/// Similarity threshold the manager gives its own [`SimilarityReplacer`].
pub const MANAGER_SIMILARITY_THRESHOLD: f64 = 0.99;

/// Routes edit blocks to one named strategy, or through an ordered fallback
/// list until one succeeds.
pub struct SearchReplaceManager {
    strategies: HashMap<StrategyKind, Box<dyn ReplaceStrategy>>,
    default_strategy: StrategyKind,
    fallback_order: Vec<StrategyKind>,
}

impl Default for SearchReplaceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SearchReplaceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchReplaceManager")
            .field("strategies", &self.available_strategies())
            .field("default_strategy", &self.default_strategy)
            .field("fallback_order", &self.fallback_order)
            .finish()
    }
}

impl SearchReplaceManager {
    /// Manager with all three strategies and the default fallback order.
    pub fn new() -> Self {
        Self::empty(StrategyKind::String, StrategyKind::default_order())
            .with_strategy(Box::new(StringReplacer::new()))
            .with_strategy(Box::new(SimilarityReplacer::new(MANAGER_SIMILARITY_THRESHOLD)))
            .with_strategy(Box::new(PatchReplacer::new()))
    }

    /// Manager with no strategies registered.
    pub fn empty(default_strategy: StrategyKind, fallback_order: Vec<StrategyKind>) -> Self {
        Self {
            strategies: HashMap::new(),
            default_strategy,
            fallback_order,
        }
    }

    /// Build from configuration: only `enabled_strategies` are registered,
    /// and the similarity strategy uses `manager_similarity_threshold`.
    pub fn from_config(config: &EditorConfig) -> Self {
        let mut manager = Self::empty(config.default_strategy, config.fallback_order.clone());
        for kind in &config.enabled_strategies {
            let strategy: Box<dyn ReplaceStrategy> = match kind {
                StrategyKind::String => Box::new(StringReplacer::new()),
                StrategyKind::Similarity => {
                    Box::new(SimilarityReplacer::new(config.manager_similarity_threshold))
                }
                StrategyKind::Patch => Box::new(PatchReplacer::new()),
            };
            manager.register(strategy);
        }
        manager
    }

    /// Register a strategy, replacing any previous one of the same kind.
    pub fn register(&mut self, strategy: Box<dyn ReplaceStrategy>) {
        log::debug!("Registering strategy: {}", strategy.kind());
        self.strategies.insert(strategy.kind(), strategy);
    }

    pub fn with_strategy(mut self, strategy: Box<dyn ReplaceStrategy>) -> Self {
        self.register(strategy);
        self
    }

    pub fn has_strategy(&self, kind: StrategyKind) -> bool {
        self.strategies.contains_key(&kind)
    }

    /// Registered strategies, sorted
    pub fn available_strategies(&self) -> Vec<StrategyKind> {
        let mut kinds: Vec<StrategyKind> = self.strategies.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn default_strategy(&self) -> StrategyKind {
        self.default_strategy
    }

    pub fn fallback_order(&self) -> &[StrategyKind] {
        &self.fallback_order
    }

    /// Apply `blocks` with one strategy (the default when `None`).
    pub fn replace(
        &self,
        content: &str,
        blocks: &[EditBlock],
        strategy: Option<StrategyKind>,
    ) -> ReplaceResult {
        if let Err(e) = validate_blocks(blocks) {
            return ReplaceResult::failure(e.to_string(), blocks.len());
        }

        let kind = strategy.unwrap_or(self.default_strategy);
        let Some(replacer) = self.strategies.get(&kind) else {
            return ReplaceResult::failure(
                format!("Strategy '{}' is not initialized", kind),
                blocks.len(),
            )
            .with_metadata("strategy", kind.as_str());
        };

        let result = replacer.replace(content, blocks);
        log::debug!(
            "{}: {} ({} errors)",
            kind,
            result.message,
            result.errors.len()
        );
        result
    }

    /// Try strategies in `order` (the configured fallback order when `None`)
    /// and return the first successful result.
    ///
    /// Strategies that are not registered or that cannot handle the input
    /// are skipped. Each attempt starts from the original `content`.
    pub fn replace_with_fallback(
        &self,
        content: &str,
        blocks: &[EditBlock],
        order: Option<&[StrategyKind]>,
    ) -> ReplaceResult {
        if let Err(e) = validate_blocks(blocks) {
            return ReplaceResult::failure(e.to_string(), blocks.len());
        }

        let order = order.unwrap_or(self.fallback_order.as_slice());
        let mut tried: Vec<&'static str> = Vec::new();
        let mut last: Option<ReplaceResult> = None;

        for kind in order {
            let Some(replacer) = self.strategies.get(kind) else {
                log::debug!("fallback: strategy {} not registered, skipping", kind);
                continue;
            };
            if !replacer.can_handle(content, blocks) {
                log::debug!("fallback: strategy {} cannot handle input, skipping", kind);
                continue;
            }

            tried.push(kind.as_str());
            let mut result = replacer.replace(content, blocks);
            if result.success {
                log::debug!("fallback: {} succeeded after {} attempt(s)", kind, tried.len());
                result.set_metadata("used_strategy", kind.as_str());
                result.set_metadata("tried_strategies", json!(tried));
                return result;
            }
            log::debug!("fallback: {} failed: {}", kind, result.message);
            last = Some(result);
        }

        match last {
            Some(mut result) => {
                log::info!(
                    "All strategies failed for {} block(s), tried: {}",
                    blocks.len(),
                    tried.join(", ")
                );
                result.message = format!("All strategies failed: {}", result.message);
                result.set_metadata("all_strategies_failed", true);
                result.set_metadata("tried_strategies", json!(tried));
                result
            }
            None => ReplaceResult::failure("No strategy could be attempted", blocks.len())
                .with_metadata("all_strategies_failed", true)
                .with_metadata("tried_strategies", json!(tried)),
        }
    }
}
