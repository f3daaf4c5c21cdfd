//! # cardsync
//!
//! A background import and reconciliation engine for remote contact-card
//! sources.
//!
//! cardsync periodically fetches configured card files, decides which parsed
//! records are genuinely new, which match an existing contact with
//! field-level changes, and which must be skipped because identity is
//! ambiguous, then applies only additive changes to the local contact store.
//! A conditional-fetch cache avoids re-downloading unchanged files, and a
//! weighted progress tracker reports one deterministic completion ratio
//! across all sources in a batch.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌──────────────┐
//! │Transport │──▶│ CardParser │──▶│ Reconciler │──▶│ ContactStore │
//! │ freshness│   │ (external) │   │ identity + │   │  (external)  │
//! │ download │   └───────────┘   │ change sets │   └──────────────┘
//! └──────────┘                   └─────┬──────┘
//!                                      │
//!                            ┌─────────┴─────────┐
//!                            ▼                   ▼
//!                      ┌──────────┐       ┌────────────┐
//!                      │ Progress │       │  Import    │
//!                      │ tracker  │       │  events    │
//!                      └──────────┘       └────────────┘
//! ```
//!
//! The merge policy is one-directional and additive: remote data fills gaps
//! and appends new contact points; locally set values are never overwritten.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Sources, parsed records, field vocabulary |
//! | [`freshness`] | Conditional-fetch cache stamps |
//! | [`identity`] | Derived record matching keys |
//! | [`changeset`] | Field-level diff of one matched pair |
//! | [`reconcile`] | Set reconciliation and skip counting |
//! | [`progress`] | Weighted multi-source progress aggregation |
//! | [`import`] | Batch orchestration and event delivery |
//! | [`traits`] | Transport, parser, and credential collaborator contracts |
//! | [`store`] | Contact store contract and in-memory backend |
//! | [`transport`] | Default reqwest-backed transport |
//! | [`error`] | Per-source error taxonomy |

pub mod changeset;
pub mod error;
pub mod freshness;
pub mod identity;
pub mod import;
pub mod models;
pub mod progress;
pub mod reconcile;
pub mod store;
pub mod traits;
pub mod transport;
