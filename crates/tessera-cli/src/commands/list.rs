//! Workload listing.

use tessera_sim::SimDatabase;
use tessera_workload::WorkloadRegistry;

pub fn run() {
    for name in WorkloadRegistry::<SimDatabase>::with_builtins().names() {
        println!("{name}");
    }
}
