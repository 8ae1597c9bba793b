//! Size tiers: one table drives both the pre-upload transform decision and
//! the delivery strategy selection.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MB: u64 = 1024 * 1024;

/// Upload mechanism used against remote storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStrategy {
    Direct,
    AsyncEager,
    Chunked,
    Streamed,
    RawFallback,
    UnsignedFallback,
}

impl DeliveryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStrategy::Direct => "direct",
            DeliveryStrategy::AsyncEager => "async_eager",
            DeliveryStrategy::Chunked => "chunked",
            DeliveryStrategy::Streamed => "streamed",
            DeliveryStrategy::RawFallback => "raw_fallback",
            DeliveryStrategy::UnsignedFallback => "unsigned_fallback",
        }
    }
}

impl fmt::Display for DeliveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which transforms a tier permits before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformHint {
    None,
    Resize,
    /// Resize first, then reduce bitrate if the result is still too large.
    ResizeThenCompress,
}

impl TransformHint {
    pub fn allows_resize(&self) -> bool {
        !matches!(self, TransformHint::None)
    }

    pub fn allows_compress(&self) -> bool {
        matches!(self, TransformHint::ResizeThenCompress)
    }
}

/// One row: sizes in `(lower, upper]` map to a strategy and a transform hint.
/// `upper == None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeTier {
    pub lower: u64,
    pub upper: Option<u64>,
    pub strategy: DeliveryStrategy,
    pub transform: TransformHint,
}

impl SizeTier {
    fn contains(&self, bytes: u64) -> bool {
        let above_lower = self.lower == 0 || bytes > self.lower;
        let below_upper = self.upper.map_or(true, |upper| bytes <= upper);
        above_lower && below_upper
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<SizeTier>,
}

impl TierTable {
    /// Builds a table, rejecting gaps and overlaps. Rows must be sorted by
    /// their lower bound and the last row must be unbounded.
    pub fn new(tiers: Vec<SizeTier>) -> Result<Self, String> {
        if tiers.is_empty() {
            return Err("tier table is empty".to_string());
        }
        if tiers[0].lower != 0 {
            return Err("first tier must start at 0".to_string());
        }
        for pair in tiers.windows(2) {
            match pair[0].upper {
                Some(upper) if upper == pair[1].lower => {}
                Some(upper) => {
                    return Err(format!(
                        "tier ending at {} is not followed by a tier starting there (got {})",
                        upper, pair[1].lower
                    ))
                }
                None => return Err("only the last tier may be unbounded".to_string()),
            }
        }
        if tiers.last().and_then(|t| t.upper).is_some() {
            return Err("last tier must be unbounded".to_string());
        }
        Ok(Self { tiers })
    }

    pub fn tier_for(&self, bytes: u64) -> &SizeTier {
        // `new` guarantees full coverage, so the fallback is never reached.
        self.tiers
            .iter()
            .find(|tier| tier.contains(bytes))
            .unwrap_or(&self.tiers[self.tiers.len() - 1])
    }

    pub fn strategy_for(&self, bytes: u64) -> DeliveryStrategy {
        self.tier_for(bytes).strategy
    }

    pub fn transform_for(&self, bytes: u64) -> TransformHint {
        self.tier_for(bytes).transform
    }

    /// Lower bound of the first tier that permits a compress pass.
    pub fn compress_mark(&self) -> Option<u64> {
        self.tiers
            .iter()
            .find(|tier| tier.transform.allows_compress())
            .map(|tier| tier.lower)
    }

    pub fn tiers(&self) -> &[SizeTier] {
        &self.tiers
    }
}

impl Default for TierTable {
    fn default() -> Self {
        use DeliveryStrategy::*;

        let row = |lower: u64, upper: Option<u64>, strategy, transform| SizeTier {
            lower: lower * MB,
            upper: upper.map(|u| u * MB),
            strategy,
            transform,
        };

        Self {
            tiers: vec![
                row(0, Some(50), Direct, TransformHint::None),
                row(50, Some(95), AsyncEager, TransformHint::None),
                row(95, Some(100), AsyncEager, TransformHint::Resize),
                row(100, Some(150), Chunked, TransformHint::Resize),
                row(150, Some(200), Chunked, TransformHint::ResizeThenCompress),
                row(200, None, Streamed, TransformHint::ResizeThenCompress),
            ],
        }
    }
}
