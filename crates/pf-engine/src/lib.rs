//! # pf-engine — PrizeForge Drawing Engine
//!
//! The decision procedure behind instant-win marketing campaigns: invoked
//! once per participation, it decides whether the participant wins, which
//! prize, and commits exactly one stock unit per win, under concurrent
//! access, with an auditable trail.
//!
//! ## Architecture
//!
//! ```text
//! DrawEngine::draw(DrawContext)
//!     │
//!     ├── AntiFraudGate (idempotency claim, cooldown, participation cap)
//!     ├── SlotResolver (calendar instant-win candidates)
//!     ├── WeightedDrawResolver (probability partition over open prizes)
//!     ├── StockLedger (atomic reservation via DrawStore primitives)
//!     │
//!     v
//! DrawOutcome + AuditRecord
//! ```
//!
//! Calendar wins dominate probability wins dominate Loss. All pure
//! computation works on a campaign snapshot that may be stale by the time
//! reservation is attempted; the only correctness-bearing operation is the
//! conditional update inside the [`store::DrawStore`] backend, so the
//! engine itself needs no locks and runs safely across many instances.

pub mod audit;
pub mod campaign;
pub mod fraud;
pub mod ledger;
pub mod orchestrator;
pub mod outcome;
pub mod rng;
pub mod slots;
pub mod store;
pub mod weighted;

pub use audit::*;
pub use campaign::*;
pub use fraud::*;
pub use ledger::*;
pub use orchestrator::*;
pub use outcome::*;
pub use rng::*;
pub use slots::*;
pub use store::*;
pub use weighted::*;
