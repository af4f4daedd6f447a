//! 最佳变体选择
//!
//! 先按 quality_threshold 过滤（未评估按 0 分），再取最高分；同分取列表中靠前的那个。
//! 没有变体过线不是错误，返回 None。

use crate::core::PipelineError;
use crate::store::{BestSelection, PipelineStore, VariantRecord};

#[derive(Debug, Clone, Copy)]
pub struct BestVariantSelector {
    quality_threshold: f64,
}

impl BestVariantSelector {
    pub fn new(quality_threshold: f64) -> Self {
        Self { quality_threshold }
    }

    pub fn select<'a>(&self, variants: &'a [VariantRecord]) -> Option<&'a VariantRecord> {
        let mut best: Option<&VariantRecord> = None;
        for variant in variants
            .iter()
            .filter(|v| v.score_or_zero() >= self.quality_threshold)
        {
            match best {
                Some(current) if variant.score_or_zero() <= current.score_or_zero() => {}
                _ => best = Some(variant),
            }
        }
        best
    }

    /// 选出并写入 best_images；同一 (prompt, iteration) 再次选择时覆盖
    pub async fn select_and_save(
        &self,
        store: &dyn PipelineStore,
        prompt_id: &str,
        iteration: u32,
        variants: &[VariantRecord],
    ) -> Result<Option<BestSelection>, PipelineError> {
        let Some(best) = self.select(variants) else {
            tracing::info!(
                prompt_id,
                iteration,
                "No variant reached quality threshold {}",
                self.quality_threshold
            );
            return Ok(None);
        };

        let selection = BestSelection {
            prompt_id: prompt_id.to_string(),
            iteration,
            variant_id: best.id,
            variant: best.variant,
            image_path: best.image_path.clone(),
            score: best.score_or_zero(),
        };
        store.save_best_selection(&selection).await?;
        tracing::info!(
            prompt_id,
            iteration,
            variant = selection.variant,
            "Selected best variant (score {:.3})",
            selection.score
        );
        Ok(Some(selection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn scored(scores: &[Option<f64>]) -> Vec<VariantRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut v = VariantRecord::generated("p", 1, i, &format!("/out/p_iter1_v{i}.png"));
                v.id = i as i64 + 1;
                v.score = *s;
                v
            })
            .collect()
    }

    #[test]
    fn test_highest_passing_score_wins() {
        let variants = scored(&[Some(0.5), Some(0.9), Some(0.65)]);
        let best = BestVariantSelector::new(0.6).select(&variants).unwrap();
        assert_eq!(best.variant, 1);
        assert_eq!(best.score, Some(0.9));
    }

    #[test]
    fn test_nothing_passes() {
        let variants = scored(&[Some(0.1), Some(0.3)]);
        assert!(BestVariantSelector::new(0.6).select(&variants).is_none());
        assert!(BestVariantSelector::new(0.6).select(&[]).is_none());
    }

    #[test]
    fn test_tie_goes_to_first() {
        let variants = scored(&[Some(0.8), Some(0.8), Some(0.7)]);
        let best = BestVariantSelector::new(0.7).select(&variants).unwrap();
        assert_eq!(best.variant, 0);
    }

    #[test]
    fn test_unscored_counts_as_zero() {
        let variants = scored(&[None, Some(0.2)]);
        assert!(BestVariantSelector::new(0.1).select(&variants).unwrap().variant == 1);
        let single = scored(&[None]);
        let best = BestVariantSelector::new(0.0).select(&single).unwrap();
        assert_eq!(best.variant, 0);
    }

    #[tokio::test]
    async fn test_select_and_save_persists_and_replaces() {
        let store = SqliteStore::in_memory().await.unwrap();
        let selector = BestVariantSelector::new(0.6);

        let first = scored(&[Some(0.7), Some(0.65)]);
        selector.select_and_save(&store, "p", 1, &first).await.unwrap();
        let second = scored(&[Some(0.61), Some(0.95)]);
        let chosen = selector
            .select_and_save(&store, "p", 1, &second)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chosen.variant, 1);

        let stored = store.get_best_selection("p", 1).await.unwrap().unwrap();
        assert_eq!(stored.score, 0.95);

        let none = selector
            .select_and_save(&store, "p", 2, &scored(&[Some(0.1)]))
            .await
            .unwrap();
        assert!(none.is_none());
        assert!(store.get_best_selection("p", 2).await.unwrap().is_none());
    }
}
