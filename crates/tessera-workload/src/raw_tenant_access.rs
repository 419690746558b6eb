//! Raw tenant access workload.
//!
//! Client 0 creates a population of tenants, then repeatedly runs randomized
//! attempts that mix tenant creation and deletion with raw data writes, some
//! addressed to tenants that exist and some to identifiers the store must
//! reject. The [`IllegalAccessOracle`](crate::oracle::IllegalAccessOracle)
//! checks that every illegal write is caught and no legal one is, and the
//! [`TenantModel`] tracks which identifiers the store assigned so the next
//! attempt can tell legal targets from illegal ones.
//!
//! ## Options
//!
//! | Key                 | Default        | Meaning                                   |
//! |---------------------|----------------|-------------------------------------------|
//! | `tenantCount`       | 1000           | Number of tenant slots                    |
//! | `testDuration`      | 120.0          | Seconds of the timed phase                |
//! | `opsPerTransaction` | 10             | Random operations per attempt build       |
//! | `pacingInterval`    | 0.5            | Seconds between cycles                    |
//! | `initialTenants`    | `tenantCount`  | Tenants created during setup              |
//! | `buggifyCapacity`   | false          | Limit store capacity to 20..100 tenants   |

use std::sync::Arc;

use tessera_sim::SimRng;
use tessera_store::{Clock, Database, Transaction, run_transaction, secs_f64_to_ns};
use tessera_types::{Knob, TenantSlot, TransactionOption};
use tracing::{debug, info, warn};

use crate::admin::{decode_assigned_identifier, tenant_map_key, tenant_name};
use crate::attempt::{AttemptOutcome, AttemptReport, AttemptRunner};
use crate::error::WorkloadError;
use crate::model::{TenantModel, slot_at};
use crate::options::WorkloadOptions;
use crate::planner::{DEFAULT_OPS_PER_TRANSACTION, TransactionPlanner};
use crate::reconcile::{ReconcileOutcome, clear_tenant_data, reconcile};
use crate::workload::{Workload, WorkloadContext, WorkloadSummary};

/// Lower bound of the injected tenant capacity.
const BUGGIFY_CAPACITY_MIN: usize = 20;
/// Exclusive upper bound of the injected tenant capacity.
const BUGGIFY_CAPACITY_MAX: usize = 100;
/// Slot indices must fit the six-digit tenant name.
const MAX_TENANT_COUNT: usize = 1_000_000;

// ============================================================================
// Configuration
// ============================================================================

/// Parsed options of [`RawTenantAccessWorkload`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawTenantAccessConfig {
    pub tenant_count: usize,
    /// Seconds.
    pub test_duration: f64,
    pub ops_per_transaction: usize,
    /// Seconds.
    pub pacing_interval: f64,
    pub initial_tenants: usize,
    pub buggify_capacity: bool,
}

impl Default for RawTenantAccessConfig {
    fn default() -> Self {
        Self {
            tenant_count: 1000,
            test_duration: 120.0,
            ops_per_transaction: DEFAULT_OPS_PER_TRANSACTION,
            pacing_interval: 0.5,
            initial_tenants: 1000,
            buggify_capacity: false,
        }
    }
}

impl RawTenantAccessConfig {
    /// Reads the workload's options, falling back to defaults.
    pub fn from_options(options: &mut WorkloadOptions) -> Result<Self, WorkloadError> {
        let defaults = Self::default();
        let tenant_count = options.get_usize("tenantCount", defaults.tenant_count)?;
        if tenant_count > MAX_TENANT_COUNT {
            return Err(WorkloadError::InvalidOption {
                key: "tenantCount".to_string(),
                value: tenant_count.to_string(),
                reason: format!("at most {MAX_TENANT_COUNT} slots fit a six-digit tenant name"),
            });
        }
        let initial_tenants = options.get_usize("initialTenants", tenant_count)?;
        if initial_tenants > tenant_count {
            return Err(WorkloadError::InvalidOption {
                key: "initialTenants".to_string(),
                value: initial_tenants.to_string(),
                reason: format!("exceeds tenantCount {tenant_count}"),
            });
        }
        Ok(Self {
            tenant_count,
            test_duration: options.get_f64("testDuration", defaults.test_duration)?,
            ops_per_transaction: options
                .get_usize("opsPerTransaction", defaults.ops_per_transaction)?,
            pacing_interval: options.get_f64("pacingInterval", defaults.pacing_interval)?,
            initial_tenants,
            buggify_capacity: options.get_bool("buggifyCapacity", defaults.buggify_capacity)?,
        })
    }
}

// ============================================================================
// Workload
// ============================================================================

pub struct RawTenantAccessWorkload {
    client_id: usize,
    config: RawTenantAccessConfig,
    model: TenantModel,
    planner: TransactionPlanner,
    rng: SimRng,
    clock: Arc<dyn Clock>,
    capacity_limit: Option<usize>,
    summary: WorkloadSummary,
}

impl RawTenantAccessWorkload {
    pub const NAME: &'static str = "RawTenantAccess";

    pub fn new(ctx: WorkloadContext) -> Result<Self, WorkloadError> {
        let seed = ctx.client_seed();
        let mut options = ctx.options;
        let config = RawTenantAccessConfig::from_options(&mut options)?;
        for key in options.unused() {
            warn!(workload = Self::NAME, option = key, "unused workload option");
        }
        Ok(Self {
            client_id: ctx.client_id,
            model: TenantModel::new(config.tenant_count),
            planner: TransactionPlanner::new(config.ops_per_transaction),
            rng: SimRng::new(seed),
            clock: ctx.clock,
            capacity_limit: None,
            summary: WorkloadSummary::default(),
            config,
        })
    }

    pub fn config(&self) -> &RawTenantAccessConfig {
        &self.config
    }

    pub fn model(&self) -> &TenantModel {
        &self.model
    }

    /// Tenant capacity injected into the store during setup, if any.
    pub fn capacity_limit(&self) -> Option<usize> {
        self.capacity_limit
    }

    /// Only the first client drives tenant lifecycle work.
    fn is_driver(&self) -> bool {
        self.client_id == 0
    }

    fn limit_capacity<D: Database>(&mut self, db: &D) -> Result<(), WorkloadError> {
        let limit = BUGGIFY_CAPACITY_MIN
            + self
                .rng
                .next_usize(BUGGIFY_CAPACITY_MAX - BUGGIFY_CAPACITY_MIN);
        db.set_knob(Knob::MaxTenantsPerCluster(limit))?;
        self.capacity_limit = Some(limit);
        self.planner = self.planner.clone().with_create_limit(limit);
        info!(limit, "tenant capacity limited");
        Ok(())
    }

    fn record_attempt(&mut self, outcome: &AttemptOutcome) {
        let report: &AttemptReport = outcome.report();
        match outcome {
            AttemptOutcome::Committed(_) => self.summary.commits += 1,
            AttemptOutcome::Abandoned(_) => self.summary.abandoned += 1,
        }
        self.summary.retries += u64::from(report.tries.saturating_sub(1));
        self.summary.illegal_attempts += report.ops.illegal_writes as u64;
        self.summary.illegal_rejections += u64::from(report.illegal_rejections);
        self.summary.legal_writes += report.ops.legal_writes as u64;
    }

    fn record_reconcile(&mut self, outcome: ReconcileOutcome) {
        self.summary.tenants_created += outcome.created as u64;
        self.summary.tenants_deleted += outcome.deleted as u64;
    }
}

impl<D: Database> Workload<D> for RawTenantAccessWorkload {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn setup(&mut self, db: &D) -> Result<(), WorkloadError> {
        if !self.is_driver() {
            return Ok(());
        }
        if self.config.buggify_capacity {
            self.limit_capacity(db)?;
        }

        let population = self
            .config
            .initial_tenants
            .min(self.capacity_limit.unwrap_or(usize::MAX));
        let slots: Vec<TenantSlot> = (0..population).map(slot_at).collect();
        for &slot in &slots {
            self.model.mark_pending_create(slot)?;
        }
        if !slots.is_empty() {
            run_transaction(db, |tr| {
                tr.set_option(TransactionOption::SpecialKeySpaceEnableWrites);
                for &slot in &slots {
                    tr.set(&tenant_map_key(slot), b"");
                }
                Ok(())
            })?;
        }
        let outcome = reconcile(db, &mut self.model)?;
        self.record_reconcile(outcome);
        info!(tenants = outcome.created, slots = self.config.tenant_count, "setup complete");
        Ok(())
    }

    fn start(&mut self, db: &D) -> Result<(), WorkloadError> {
        if !self.is_driver() {
            return Ok(());
        }
        let deadline_ns = self
            .clock
            .now_ns()
            .saturating_add(secs_f64_to_ns(self.config.test_duration));
        let pacing_ns = secs_f64_to_ns(self.config.pacing_interval);

        while self.clock.now_ns() < deadline_ns {
            clear_tenant_data(db, &self.model)?;

            let mut runner = AttemptRunner::new(&self.planner, self.clock.as_ref(), deadline_ns);
            let outcome = runner.run(db, &mut self.model, &mut self.rng)?;
            self.record_attempt(&outcome);
            if let AttemptOutcome::Committed(report) = outcome {
                debug!(tries = report.tries, illegal = report.illegal_attempted, "attempt committed");
                let reconciled = reconcile(db, &mut self.model)?;
                self.record_reconcile(reconciled);
            }

            self.summary.cycles += 1;
            self.clock.sleep_ns(pacing_ns);
        }

        let summary = self.summary;
        info!(
            cycles = summary.cycles,
            commits = summary.commits,
            abandoned = summary.abandoned,
            retries = summary.retries,
            illegal_attempts = summary.illegal_attempts,
            illegal_rejections = summary.illegal_rejections,
            tenants = self.model.confirmed_count(),
            "raw tenant access finished"
        );
        Ok(())
    }

    fn check(&mut self, db: &D) -> Result<(), WorkloadError> {
        if !self.is_driver() {
            return Ok(());
        }
        self.model.check_consistency()?;

        let confirmed: Vec<_> = self.model.confirmed().collect();
        let entries = run_transaction(db, |tr| {
            confirmed
                .iter()
                .map(|&(slot, _)| tr.get(&tenant_map_key(slot)))
                .collect::<Result<Vec<_>, _>>()
        })?;

        for (&(slot, id), entry) in confirmed.iter().zip(entries) {
            let Some(raw) = entry else {
                return Err(WorkloadError::Check(format!(
                    "tenant {} (slot {slot}, id {id}) is missing from the store",
                    tenant_name(slot)
                )));
            };
            let stored = decode_assigned_identifier(&raw)
                .map_err(|source| WorkloadError::Decode { slot, source })?;
            if stored != id {
                return Err(WorkloadError::Check(format!(
                    "tenant {} (slot {slot}) has id {stored} in the store, expected {id}",
                    tenant_name(slot)
                )));
            }
        }
        info!(tenants = confirmed.len(), "check passed");
        Ok(())
    }

    fn summary(&self) -> WorkloadSummary {
        self.summary
    }
}
