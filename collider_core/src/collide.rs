use crate::frame::{Frame, compose_with_leading_crc, parse_with_trailing_crc};
use crate::record::{ConfigRecord, FILE_NAME_LEN};
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Hardware threads left free for the reporting thread and the OS.
const RESERVED_THREADS: usize = 2;

/// Iterations between a worker's progress-counter updates.
const DEFAULT_NOTIFIER_PERIOD: u64 = 1_000_000;

/// Wall-clock interval between aggregate throughput reports.
const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Sleep granularity of the reporting loop, so it can notice the stop flag
/// well before the next report is due.
const REPORT_TICK: Duration = Duration::from_millis(50);

/// Printable ASCII range used for worker file-name prefixes.
const PRINTABLE_MIN: u8 = 0x20;
const PRINTABLE_MAX: u8 = 0x7E;

/// Length of the randomized file-name prefix: everything ahead of the final
/// nonce-sized window and the NUL terminator.
const RANDOM_PREFIX_LEN: usize = FILE_NAME_LEN - size_of::<u64>() - 1;

/// Tuning knobs for the brute-force search.
///
/// `max_iterations` bounds the nonce space each worker walks; the default is
/// the full 64-bit space, which in practice means the search runs until a
/// solution is found or the process is terminated. Tests shrink it to make
/// space exhaustion reachable.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub threads: usize,
    pub notifier_period: u64,
    pub report_interval: Duration,
    pub max_iterations: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            threads: default_thread_count(),
            notifier_period: DEFAULT_NOTIFIER_PERIOD,
            report_interval: DEFAULT_REPORT_INTERVAL,
            max_iterations: u64::MAX,
        }
    }
}

/// One worker per hardware thread, minus a small reserved margin.
pub fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map_or(1, |n| n.get().saturating_sub(RESERVED_THREADS).max(1))
}

/// A record whose leading-CRC frame also validates under the trailing-CRC
/// convention.
#[derive(Debug, Clone)]
pub struct Solution {
    pub record: ConfigRecord,
    pub frame: Frame,
    pub worker: usize,
    pub iterations: u64,
}

/// Distinguishes worker `index`'s slice of the search space: a shifted
/// fw-server id and a fresh random printable prefix over the file name, with
/// the terminator byte forced back to zero. Disjointness across workers is
/// probabilistic, not guaranteed; an overlap costs redundant work only.
pub fn derive_worker_seed<R: Rng + ?Sized>(
    seed: &ConfigRecord,
    index: usize,
    rng: &mut R,
) -> ConfigRecord {
    let mut record = *seed;
    record.fw_server_id = seed.fw_server_id.wrapping_sub(index as u8);
    for byte in &mut record.file_name[..RANDOM_PREFIX_LEN] {
        *byte = rng.random_range(PRINTABLE_MIN..=PRINTABLE_MAX);
    }
    record.file_name[FILE_NAME_LEN - 1] = 0;
    record
}

/// Runs the brute-force search across worker threads until some worker's
/// composed frame coincidentally validates under the trailing convention, or
/// every worker exhausts its `max_iterations` nonce budget.
///
/// The caller's `rng` seeds the per-worker prefixes, so a seeded generator
/// makes the whole search deterministic. Progress reporting is advisory and
/// goes to stderr in single line-atomic writes.
pub fn run_search<R: Rng + ?Sized>(
    seed: &ConfigRecord,
    settings: &SearchSettings,
    rng: &mut R,
) -> Option<Solution> {
    let threads = settings.threads.max(1);
    let worker_seeds: Vec<ConfigRecord> = (0..threads)
        .map(|index| derive_worker_seed(seed, index, rng))
        .collect();
    let counters: Vec<AtomicU64> = (0..threads).map(|_| AtomicU64::new(0)).collect();
    let stop = AtomicBool::new(false);
    let running = AtomicUsize::new(threads);

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(threads);
        for (index, worker_seed) in worker_seeds.into_iter().enumerate() {
            let counter = &counters[index];
            let stop = &stop;
            let running = &running;
            handles.push(scope.spawn(move || {
                let result = worker(worker_seed, index, settings, counter, stop);
                running.fetch_sub(1, Ordering::Release);
                result
            }));
        }

        report_progress(&counters, settings.report_interval, &stop, &running);

        handles
            .into_iter()
            .filter_map(|handle| handle.join().expect("search worker panicked"))
            .next()
    })
}

fn worker(
    mut record: ConfigRecord,
    index: usize,
    settings: &SearchSettings,
    counter: &AtomicU64,
    stop: &AtomicBool,
) -> Option<Solution> {
    eprintln!("initial seed for worker {index}:\n{record}");
    let notifier_period = settings.notifier_period.max(1);
    for iteration in 0..settings.max_iterations {
        if stop.load(Ordering::Relaxed) {
            return None;
        }
        record.set_nonce(record.nonce().wrapping_add(1));
        let frame = compose_with_leading_crc(&record);
        if parse_with_trailing_crc(&frame).is_some() {
            stop.store(true, Ordering::Release);
            eprintln!(
                "worker {index} found a colliding frame after {} candidates",
                iteration + 1
            );
            return Some(Solution {
                record,
                frame,
                worker: index,
                iterations: iteration + 1,
            });
        }
        if iteration % notifier_period == 0 {
            counter.store(iteration, Ordering::Relaxed);
        }
    }
    counter.store(settings.max_iterations, Ordering::Relaxed);
    None
}

/// Aggregates the per-worker counters every `interval` and prints elapsed
/// time, total candidate count and throughput. Returns once a solution was
/// found or the last worker exhausted its space.
fn report_progress(
    counters: &[AtomicU64],
    interval: Duration,
    stop: &AtomicBool,
    running: &AtomicUsize,
) {
    let started_at = Instant::now();
    let mut last_report = Instant::now();
    loop {
        std::thread::sleep(REPORT_TICK.min(interval));
        if stop.load(Ordering::Acquire) || running.load(Ordering::Acquire) == 0 {
            return;
        }
        if last_report.elapsed() < interval {
            continue;
        }
        last_report = Instant::now();
        let elapsed = started_at.elapsed();
        let total: u64 = counters.iter().map(|c| c.load(Ordering::Relaxed)).sum();
        let rate = total as f64 / elapsed.as_secs_f64();
        eprintln!(
            "elapsed {} min; candidates {:.1} M; rate {:.2} MH/s",
            elapsed.as_secs() / 60,
            total as f64 * 1e-6,
            rate * 1e-6
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    fn test_settings(threads: usize, max_iterations: u64) -> SearchSettings {
        SearchSettings {
            threads,
            notifier_period: 64,
            report_interval: Duration::from_secs(3600),
            max_iterations,
        }
    }

    #[test]
    fn worker_seeds_get_distinct_flag_bytes_and_prefixes() {
        let seed = ConfigRecord::new(1_000_000, 50, 127);
        let mut rng = ChaCha8Rng::from_seed([7u8; 32]);
        let first = derive_worker_seed(&seed, 0, &mut rng);
        let second = derive_worker_seed(&seed, 1, &mut rng);
        assert_eq!(first.fw_server_id, 127);
        assert_eq!(second.fw_server_id, 126);
        assert_ne!(
            first.file_name, second.file_name,
            "workers must not share a file-name prefix"
        );
    }

    #[test]
    fn worker_seed_prefix_is_printable_and_terminated() {
        let seed = ConfigRecord::new(1_000_000, 50, 127);
        let mut rng = ChaCha8Rng::from_seed([9u8; 32]);
        let derived = derive_worker_seed(&seed, 3, &mut rng);
        for &byte in &derived.file_name[..RANDOM_PREFIX_LEN] {
            assert!(
                (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&byte),
                "prefix byte {byte:#04x} is outside the printable range"
            );
        }
        assert_eq!(derived.file_name[FILE_NAME_LEN - 1], 0);
    }

    #[test]
    fn worker_seed_derivation_is_deterministic_per_rng_seed() {
        let seed = ConfigRecord::new(500_000, 1, 2);
        let mut rng_a = ChaCha8Rng::from_seed([42u8; 32]);
        let mut rng_b = ChaCha8Rng::from_seed([42u8; 32]);
        assert_eq!(
            derive_worker_seed(&seed, 0, &mut rng_a),
            derive_worker_seed(&seed, 0, &mut rng_b)
        );
    }

    #[test]
    fn search_terminates_when_the_nonce_space_is_exhausted() {
        // A trailing-frame coincidence has probability ~2^-64 per candidate,
        // so a small bounded space reliably exercises the exhaustion path.
        let seed = ConfigRecord::new(1_000_000, 50, 127);
        let mut rng = ChaCha8Rng::from_seed([3u8; 32]);
        let outcome = run_search(&seed, &test_settings(2, 512), &mut rng);
        assert!(
            outcome.is_none(),
            "a 512-candidate walk must not stumble on a 2^-64 coincidence"
        );
    }

    #[test]
    fn single_worker_search_also_terminates() {
        let seed = ConfigRecord::new(1_000_000, 50, 127);
        let mut rng = ChaCha8Rng::from_seed([4u8; 32]);
        assert!(run_search(&seed, &test_settings(1, 256), &mut rng).is_none());
    }
}
