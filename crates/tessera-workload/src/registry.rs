//! Name-to-constructor registry of workloads.

use std::collections::BTreeMap;

use tessera_store::Database;
use tracing::{debug, warn};

use crate::error::WorkloadError;
use crate::raw_tenant_access::RawTenantAccessWorkload;
use crate::workload::{Workload, WorkloadContext};

/// Constructs a workload from its context.
pub type WorkloadFactory<D> = fn(WorkloadContext) -> Result<Box<dyn Workload<D>>, WorkloadError>;

pub struct WorkloadRegistry<D: Database> {
    factories: BTreeMap<&'static str, WorkloadFactory<D>>,
}

impl<D: Database + 'static> WorkloadRegistry<D> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with every built-in workload.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(RawTenantAccessWorkload::NAME, raw_tenant_access::<D>);
        registry
    }

    /// Registers `factory` under `name`, replacing any earlier entry.
    pub fn register(&mut self, name: &'static str, factory: WorkloadFactory<D>) {
        if self.factories.insert(name, factory).is_some() {
            warn!(name, "workload registered twice, replacing");
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Instantiates the workload called `name`.
    pub fn create(
        &self,
        name: &str,
        ctx: WorkloadContext,
    ) -> Result<Box<dyn Workload<D>>, WorkloadError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| WorkloadError::UnknownWorkload(name.to_string()))?;
        debug!(name, client_id = ctx.client_id, "creating workload");
        factory(ctx)
    }
}

fn raw_tenant_access<D: Database + 'static>(
    ctx: WorkloadContext,
) -> Result<Box<dyn Workload<D>>, WorkloadError> {
    Ok(Box::new(RawTenantAccessWorkload::new(ctx)?))
}

impl<D: Database + 'static> Default for WorkloadRegistry<D> {
    fn default() -> Self {
        Self::with_builtins()
    }
}
