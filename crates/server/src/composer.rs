//! # Hybrid Composer
//!
//! Fills an artwork page from the personalized ranking first, then tops it
//! up from the curated, popular and recent pools.
//!
//! ## Algorithm
//! 1. Fill target = `(page + 1) * page_size`
//! 2. Admit personalized candidates up to the target
//! 3. Curated gets a share of the target (see [`QuotaPolicy`]); popular and
//!    recent each get whatever is still missing
//! 4. Every fallback tier is asked for `quota + already_seen` items so that
//!    duplicates cannot starve it
//! 5. Slice the requested page out of the assembled list
//!
//! A failing tier is logged and skipped; the next tier keeps filling.

use data_loader::{Item, UserId};
use pipeline::{Page, ResultAssembler};
use sources::{CandidateSource, FallbackPools, PersonalizedSource};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// How much of a page the curated tier may claim
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaPolicy {
    /// Share of the target when the personalized tier produced nothing
    pub curated_share_cold: f32,
    /// Share of the target (minus what is already filled) otherwise
    pub curated_share_warm: f32,
    /// Floor so that small pages still get a curated slot
    pub min_curated: usize,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            curated_share_cold: 0.5,
            curated_share_warm: 0.3,
            min_curated: 1,
        }
    }
}

impl QuotaPolicy {
    /// Curated quota for a page that is `filled` of `target` full
    pub fn curated_quota(&self, target: usize, filled: usize, personalized_empty: bool) -> usize {
        let share = if personalized_empty {
            (target as f32 * self.curated_share_cold).floor() as usize
        } else {
            ((target as f32 * self.curated_share_warm).floor() as usize).saturating_sub(filled)
        };
        share
            .max(self.min_curated)
            .min(target.saturating_sub(filled))
    }
}

pub struct HybridComposer {
    personalized: PersonalizedSource,
    pools: FallbackPools,
    policy: QuotaPolicy,
}

impl HybridComposer {
    pub fn new(personalized: PersonalizedSource, pools: FallbackPools) -> Self {
        Self {
            personalized,
            pools,
            policy: QuotaPolicy::default(),
        }
    }

    /// Configure the curated quota (default: 50% cold, 30% warm, at least 1)
    pub fn with_policy(mut self, policy: QuotaPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// One page of artwork recommendations. Never fails.
    #[instrument(skip(self))]
    pub fn recommend(&self, user_id: UserId, page: usize, page_size: usize) -> Page<Item> {
        if page_size == 0 {
            return Page::empty(page, page_size);
        }
        let start = Instant::now();
        let target = page.saturating_add(1).saturating_mul(page_size);
        let mut assembler = ResultAssembler::new(target);

        let personalized = match self.personalized.candidates(user_id, target) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = format!("{:#}", e), "Personalized tier failed, using fallback pools");
                Vec::new()
            }
        };
        let personalized_empty = personalized.is_empty();
        let from_model = assembler.extend_unseen(personalized, target);
        debug!(admitted = from_model, "Personalized tier");

        let mut from_curated = 0;
        if !assembler.is_full() {
            let quota = self
                .policy
                .curated_quota(target, assembler.len(), personalized_empty);
            from_curated = self.fill_from(&mut assembler, CandidateSource::Curated, quota);
        }

        let mut from_popular = 0;
        if !assembler.is_full() {
            let quota = assembler.remaining();
            from_popular = self.fill_from(&mut assembler, CandidateSource::Popular, quota);
        }

        let mut from_recent = 0;
        if !assembler.is_full() {
            let quota = assembler.remaining();
            from_recent = self.fill_from(&mut assembler, CandidateSource::Recent, quota);
        }

        info!(
            personalized = from_model,
            curated = from_curated,
            popular = from_popular,
            recent = from_recent,
            assembled = assembler.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Composed recommendations"
        );

        Page::slice(assembler.into_items(), page, page_size)
    }

    /// Pull one fallback tier into the assembler; returns items admitted
    fn fill_from(&self, assembler: &mut ResultAssembler, source: CandidateSource, quota: usize) -> usize {
        if quota == 0 {
            return 0;
        }
        let fetch = quota.saturating_add(assembler.seen_count());
        match self.pools.pool(source, fetch) {
            Ok(items) => {
                let admitted = assembler.extend_unseen(items, quota);
                debug!(tier = %source, quota, admitted, "Fallback tier");
                admitted
            }
            Err(e) => {
                warn!(tier = %source, error = format!("{:#}", e), "Fallback tier failed, skipping");
                0
            }
        }
    }
}
