//! # tessera-sim: Deterministic reference store for `Tessera`
//!
//! This crate provides an in-memory, seeded implementation of the
//! `tessera-store` interfaces so tenant-isolation workloads can run without a
//! real cluster, in virtual time, and reproducibly.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       SimDatabase                          │
//! │  ┌─────────────┐   ┌──────────────┐   ┌────────────────┐  │
//! │  │ SimClock    │   │ Tenant map   │   │ SimRng         │  │
//! │  │ (virtual)   │   │ name → id    │   │ (fault inject) │  │
//! │  └─────────────┘   └──────────────┘   └────────────────┘  │
//! │                                                            │
//! │  Data range: prefix(id) ++ key → value                     │
//! │  Commit: options → ordered validation → faults → apply     │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use tessera_sim::{SimClock, SimDatabase, SimStoreConfig};
//! use tessera_store::{Database, Transaction};
//! use tessera_types::{TenantName, TenantSlot, TransactionOption};
//!
//! let db = SimDatabase::new(SimStoreConfig::reliable(), SimClock::new());
//! let name = TenantName::for_slot(TenantSlot::new(0));
//!
//! let mut tr = db.create_transaction();
//! tr.set_option(TransactionOption::SpecialKeySpaceEnableWrites);
//! tr.set(&name.map_key(), b"");
//! tr.commit().unwrap();
//!
//! assert!(db.tenant_id(&name).is_some());
//! ```

pub mod canary;
mod clock;
mod config;
mod database;
mod rng;

pub use clock::SimClock;
pub use config::SimStoreConfig;
pub use database::{SimDatabase, SimStats, SimTransaction};
pub use rng::SimRng;
