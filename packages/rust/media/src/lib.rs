//! Media Acquisition Engine.
//!
//! Finds and downloads one validated illustrative image for a keyword via a
//! tiered fallback chain:
//!
//! 1. **Tier A** — image-search collaborator, large size + wide layout
//! 2. **Tier B** — same collaborator, medium size, no layout constraint
//! 3. **Tier C** — direct scrape of a backup image-search HTML surface
//!
//! Candidates from the first tier that produced any are downloaded in list
//! order; each payload must pass the quality gate (minimum size + JPEG/PNG
//! magic numbers) before it is persisted. An image that cannot be acquired
//! is a normal outcome ([`MediaOutcome::NoAsset`]), never an error — only a
//! failure to *persist* a validated payload is fatal.

mod fetcher;

pub use fetcher::{
    AcquiredAsset, BACKUP_MAX_CANDIDATES, DEFAULT_MIN_BYTES, MediaFetcher, MediaOutcome,
    PRIMARY_MIN_BYTES, TIER_A_MAX_CANDIDATES,
};
