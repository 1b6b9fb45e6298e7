/// Worker pool for processing several input files side by side.
/// Each file stays a single-threaded batch; only whole files run in parallel.

use anyhow::Result;
use tracing::info;

/// Number of workers for `jobs` files: one per file, at most one per core.
pub fn worker_count(jobs: usize) -> usize {
    jobs.clamp(1, std::cmp::max(1, num_cpus::get()))
}

/// Initialize the global rayon thread pool sized for `jobs` files.
pub fn init_thread_pool(jobs: usize) -> Result<()> {
    let cores = num_cpus::get();
    let workers = worker_count(jobs);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("psdeob-worker-{}", i))
        .build_global()?;

    info!(
        "Initialized thread pool: {} workers (system has {} cores)",
        workers, cores
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_bounds() {
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(1), 1);
        assert!(worker_count(10_000) <= num_cpus::get());
    }

    #[test]
    fn test_init_thread_pool_only_once() {
        // The global pool can only be built once per process.
        let _ = init_thread_pool(2);
        assert!(init_thread_pool(2).is_err());
    }
}
