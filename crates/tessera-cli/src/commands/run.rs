//! Workload execution against the reference store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tessera_config::{StoreConfig, TesseraConfig};
use tessera_sim::{SimClock, SimDatabase, SimStoreConfig};
use tessera_store::{Clock, RetryPolicy};
use tessera_workload::{
    Workload, WorkloadContext, WorkloadOptions, WorkloadRegistry, WorkloadSummary,
};
use tracing::{info, info_span};

/// Folds command-line flags over the loaded configuration.
pub fn apply_overrides(
    config: &mut TesseraConfig,
    workload: Option<String>,
    seed: Option<u64>,
    clients: Option<usize>,
    options: &[String],
) -> Result<()> {
    if let Some(name) = workload {
        config.workload.name = name;
    }
    if let Some(seed) = seed {
        config.workload.seed = seed;
    }
    if let Some(clients) = clients {
        config.workload.clients = clients;
    }
    for pair in options {
        let (key, value) = WorkloadOptions::parse_pair(pair)?;
        // Option names are case-insensitive; env-sourced keys arrive lowercased.
        config
            .workload
            .options
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        config.workload.options.insert(key, value);
    }
    config.validate()?;
    Ok(())
}

/// Maps file-level store settings onto the reference store.
pub fn store_config(store: &StoreConfig, seed: u64) -> SimStoreConfig {
    SimStoreConfig {
        seed,
        conflict_probability: store.conflict_probability,
        too_old_probability: store.too_old_probability,
        unknown_result_probability: store.unknown_result_probability,
        read_fault_probability: store.read_fault_probability,
        min_latency_ns: store.min_latency_us.saturating_mul(1_000),
        max_latency_ns: store.max_latency_us.saturating_mul(1_000),
        retry_policy: RetryPolicy::new(
            Duration::from_millis(store.initial_backoff_ms),
            Duration::from_millis(store.max_backoff_ms),
        ),
    }
}

/// Runs every phase of the configured workload and prints the summary.
pub fn run(config: &TesseraConfig, json: bool) -> Result<()> {
    let workload = &config.workload;
    let db = SimDatabase::new(store_config(&config.store, workload.seed), SimClock::new());
    let clock: Arc<dyn Clock> = Arc::new(db.clock().clone());
    let registry = WorkloadRegistry::<SimDatabase>::with_builtins();

    let _span = info_span!("run", workload = %workload.name, seed = workload.seed).entered();
    let started = Instant::now();

    let options: WorkloadOptions = workload.options.clone().into_iter().collect();
    let mut clients = (0..workload.clients)
        .map(|client| {
            let ctx = WorkloadContext::new(Arc::clone(&clock))
                .with_client(client, workload.clients)
                .with_seed(workload.seed)
                .with_options(options.clone());
            registry.create(&workload.name, ctx)
        })
        .collect::<Result<Vec<_>, _>>()?;

    for client in &mut clients {
        client.setup(&db).context("setup failed")?;
    }
    start_all(&db, &mut clients)?;
    for client in &mut clients {
        client.check(&db).context("check failed")?;
    }

    let mut summary = WorkloadSummary::default();
    for client in &clients {
        summary.merge(&client.summary());
    }
    if summary.commits + summary.abandoned != summary.cycles {
        bail!("summary is inconsistent: {summary:?}");
    }
    let stats = db.stats();
    info!(
        elapsed_ms = started.elapsed().as_millis(),
        commits = stats.commits,
        tenants = db.tenant_count(),
        "run passed"
    );

    print_summary(&workload.name, workload.seed, &summary, json)
}

fn start_all(db: &SimDatabase, clients: &mut [Box<dyn Workload<SimDatabase>>]) -> Result<()> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = clients
            .iter_mut()
            .map(|client| scope.spawn(move || client.start(db)))
            .collect();
        for (index, handle) in handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|_| anyhow!("client {index} panicked"))?
                .with_context(|| format!("client {index} failed"))?;
        }
        Ok(())
    })
}

fn print_summary(name: &str, seed: u64, summary: &WorkloadSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    println!("{name} passed (seed {seed})");
    println!("  cycles:             {}", summary.cycles);
    println!("  commits:            {}", summary.commits);
    println!("  abandoned:          {}", summary.abandoned);
    println!("  retries:            {}", summary.retries);
    println!("  illegal attempts:   {}", summary.illegal_attempts);
    println!("  illegal rejections: {}", summary.illegal_rejections);
    println!("  tenants created:    {}", summary.tenants_created);
    println!("  tenants deleted:    {}", summary.tenants_deleted);
    println!("  legal writes:       {}", summary.legal_writes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_settings_convert_units() {
        let store = StoreConfig {
            min_latency_us: 5,
            max_latency_us: 10,
            initial_backoff_ms: 3,
            max_backoff_ms: 30,
            ..StoreConfig::default()
        };
        let sim = store_config(&store, 9);

        assert_eq!(sim.seed, 9);
        assert_eq!(sim.min_latency_ns, 5_000);
        assert_eq!(sim.max_latency_ns, 10_000);
        assert_eq!(sim.retry_policy.initial_backoff, Duration::from_millis(3));
        assert_eq!(sim.retry_policy.max_backoff, Duration::from_millis(30));
    }

    #[test]
    fn overrides_replace_configured_values() {
        let mut config = TesseraConfig::default();
        config
            .workload
            .options
            .insert("tenantCount".to_string(), "5".to_string());

        apply_overrides(
            &mut config,
            Some("RawTenantAccess".to_string()),
            Some(17),
            Some(2),
            &["tenantCount=9".to_string(), "testDuration=1".to_string()],
        )
        .unwrap();

        assert_eq!(config.workload.seed, 17);
        assert_eq!(config.workload.clients, 2);
        assert_eq!(config.workload.options["tenantCount"], "9");
        assert_eq!(config.workload.options["testDuration"], "1");
    }

    #[test]
    fn flag_wins_over_lowercased_environment_option() {
        let mut config = TesseraConfig::default();
        config
            .workload
            .options
            .insert("tenantcount".to_string(), "5".to_string());

        apply_overrides(&mut config, None, None, None, &["tenantCount=9".to_string()]).unwrap();

        assert_eq!(config.workload.options.len(), 1);
        let mut options: WorkloadOptions = config.workload.options.clone().into_iter().collect();
        assert_eq!(options.get_usize("tenantCount", 1).unwrap(), 9);
    }

    #[test]
    fn malformed_option_is_rejected() {
        let mut config = TesseraConfig::default();
        assert!(apply_overrides(&mut config, None, None, None, &["oops".to_string()]).is_err());
    }

    #[test]
    fn zero_clients_override_is_rejected() {
        let mut config = TesseraConfig::default();
        assert!(apply_overrides(&mut config, None, None, Some(0), &[]).is_err());
    }
}
