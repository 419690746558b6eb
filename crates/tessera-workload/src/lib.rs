//! # tessera-workload: Tenant isolation workloads for `Tessera`
//!
//! This crate drives randomized tenant lifecycle and raw data traffic against
//! any [`tessera_store::Database`] and checks that the store enforces tenant
//! isolation.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐  plan   ┌─────────────────────┐  commit  ┌──────────┐
//! │  TenantModel   │ ──────► │ TransactionPlanner  │ ───────► │  Store   │
//! │ slot ↔ id maps │         └─────────────────────┘          └──────────┘
//! └────────────────┘                   │                           │
//!         ▲                            ▼                           │
//!         │                 ┌─────────────────────┐   errors       │
//!         │                 │ IllegalAccessOracle │ ◄──────────────┤
//!         │                 └─────────────────────┘                │
//!         │        read back assigned ids                          │
//!         └──────────────── reconcile ◄────────────────────────────┘
//! ```
//!
//! - [`model`]: which tenants exist, and which are pending in this attempt
//! - [`admin`]: control-plane and data-range encodings
//! - [`planner`]: random operation batches
//! - [`attempt`]: submit/retry state machine
//! - [`oracle`]: attempted-vs-observed illegal access check
//! - [`reconcile`]: folding committed results back into the model
//! - [`RawTenantAccessWorkload`]: the workload tying it together
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use tessera_sim::{SimClock, SimDatabase, SimStoreConfig};
//! use tessera_workload::{WorkloadContext, WorkloadOptions, WorkloadRegistry};
//!
//! let db = SimDatabase::new(SimStoreConfig::default().with_seed(1), SimClock::new());
//! let options = WorkloadOptions::new()
//!     .with("tenantCount", "20")
//!     .with("testDuration", "5");
//! let ctx = WorkloadContext::new(Arc::new(db.clock().clone()))
//!     .with_seed(1)
//!     .with_options(options);
//!
//! let registry = WorkloadRegistry::<SimDatabase>::with_builtins();
//! let mut workload = registry.create("RawTenantAccess", ctx).unwrap();
//! workload.setup(&db).unwrap();
//! workload.start(&db).unwrap();
//! workload.check(&db).unwrap();
//! assert!(workload.summary().commits > 0);
//! ```

pub mod admin;
pub mod attempt;
mod error;
pub mod model;
pub mod oracle;
mod options;
pub mod planner;
mod raw_tenant_access;
pub mod reconcile;
mod registry;
mod workload;

pub use error::WorkloadError;
pub use options::WorkloadOptions;
pub use raw_tenant_access::{RawTenantAccessConfig, RawTenantAccessWorkload};
pub use registry::{WorkloadFactory, WorkloadRegistry};
pub use workload::{Workload, WorkloadContext, WorkloadSummary};
