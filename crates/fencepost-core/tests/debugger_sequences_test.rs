use fencepost_core::{
    CappedRaw, DebuggerConfig, FreeOutcome, MemoryDebugger, Site, SystemRaw, Violation,
};

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn gen_range_usize(&mut self, low: usize, high_inclusive: usize) -> usize {
        assert!(low <= high_inclusive);
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Empty,
    Live,
    Freed,
}

const SITES: [Site; 4] = [
    Site::new("alpha.c", 10),
    Site::new("beta.c", 20),
    Site::new("gamma.c", 30),
    Site::new("delta.c", 40),
];

fn silent_debugger() -> MemoryDebugger<CappedRaw<SystemRaw>> {
    MemoryDebugger::with_config(CappedRaw::new(SystemRaw, None), DebuggerConfig::silent())
}

fn assert_accounting<A: fencepost_core::RawAllocator>(
    dbg: &MemoryDebugger<A>,
    seed: u64,
    step: usize,
) {
    let stats = dbg.statistics();
    assert_eq!(
        stats.active_count,
        dbg.live_count() as u64,
        "seed={seed} step={step}: active_count must match ledger size"
    );
    assert_eq!(
        stats.active_bytes,
        dbg.live_bytes(),
        "seed={seed} step={step}: active_bytes must match ledger bytes"
    );
    assert!(
        stats.active_count <= stats.total_count,
        "seed={seed} step={step}: active_count exceeds total_count"
    );
    assert!(
        stats.active_bytes <= stats.total_bytes,
        "seed={seed} step={step}: active_bytes exceeds total_bytes"
    );
    for entry in dbg.leak_report() {
        assert!(
            entry.base >= stats.heap_min && entry.base <= stats.heap_max,
            "seed={seed} step={step}: live base {:#x} outside heap bounds",
            entry.base
        );
    }
}

#[test]
fn deterministic_sequences_hold_accounting_invariants() {
    const SEEDS: [u64; 4] = [1, 2, 3, 4];
    const STEPS: usize = 2_000;
    const SLOTS: usize = 32;

    for seed in SEEDS {
        let mut dbg = silent_debugger();
        let mut rng = XorShift64::new(seed);

        let mut ptrs = [std::ptr::null_mut::<u8>(); SLOTS];
        let mut sizes = [0_usize; SLOTS];
        let mut states = [SlotState::Empty; SLOTS];
        let mut expected_violations = 0_usize;

        for step in 0..STEPS {
            let op = rng.gen_range_usize(0, 99);
            let idx = rng.gen_range_usize(0, SLOTS - 1);
            let site = SITES[idx % SITES.len()];

            match op {
                // allocate (biased)
                0..=44 => {
                    if states[idx] == SlotState::Live {
                        continue;
                    }
                    let size = rng.gen_range_usize(0, 2048);
                    let ptr = dbg.malloc(size, site).expect("malloc");
                    ptrs[idx] = ptr.as_ptr();
                    sizes[idx] = size;
                    states[idx] = SlotState::Live;
                    assert_eq!(
                        dbg.lookup(ptr.as_ptr()).map(|r| r.size),
                        Some(size),
                        "seed={seed} step={step}: fresh block must be in the ledger"
                    );
                }
                // interior free of a live block
                45..=59 => {
                    if states[idx] != SlotState::Live || sizes[idx] < 2 {
                        continue;
                    }
                    let offset = rng.gen_range_usize(1, sizes[idx] - 1);
                    let before = dbg.statistics();
                    let outcome = dbg.free(ptrs[idx].wrapping_add(offset), site);
                    match outcome {
                        FreeOutcome::Rejected(Violation::InteriorFree {
                            offset: got,
                            size,
                            base,
                            ..
                        }) => {
                            assert_eq!(got, offset, "seed={seed} step={step}: offset");
                            assert_eq!(size, sizes[idx], "seed={seed} step={step}: size");
                            assert_eq!(base, ptrs[idx] as usize, "seed={seed} step={step}: base");
                        }
                        other => panic!("seed={seed} step={step}: expected interior free, got {other:?}"),
                    }
                    assert_eq!(dbg.statistics(), before, "seed={seed} step={step}: stats moved");
                    expected_violations += 1;
                }
                // free
                60..=89 => {
                    if states[idx] != SlotState::Live {
                        continue;
                    }
                    let outcome = dbg.free(ptrs[idx], site);
                    assert_eq!(
                        outcome,
                        FreeOutcome::Released,
                        "seed={seed} step={step}: live free must release cleanly"
                    );
                    states[idx] = SlotState::Freed;
                }
                // double free, only while the address has not been handed out again
                _ => {
                    if states[idx] != SlotState::Freed || !dbg.is_freed(ptrs[idx]) {
                        continue;
                    }
                    let before = dbg.statistics();
                    let outcome = dbg.free(ptrs[idx], site);
                    assert!(
                        matches!(outcome, FreeOutcome::Rejected(Violation::DoubleFree { .. })),
                        "seed={seed} step={step}: expected double free, got {outcome:?}"
                    );
                    assert_eq!(dbg.statistics(), before, "seed={seed} step={step}: stats moved");
                    expected_violations += 1;
                }
            }

            assert_accounting(&dbg, seed, step);
        }

        assert_eq!(
            dbg.drain_violations().len(),
            expected_violations,
            "seed={seed}: violation buffer must hold exactly the rejected requests"
        );

        let live = states.iter().filter(|s| **s == SlotState::Live).count();
        assert_eq!(dbg.leak_report().len(), live, "seed={seed}: leak report size");

        let releases_before = dbg.raw().releases();
        dbg.reset();
        assert_eq!(
            dbg.raw().releases() - releases_before,
            live as u64,
            "seed={seed}: reset must release every live block"
        );
        assert_eq!(dbg.live_count(), 0);
    }
}

#[test]
fn total_bytes_equals_sum_of_successful_requests() {
    let mut dbg = silent_debugger();
    let mut rng = XorShift64::new(0xF00D);
    let mut expected = 0_u64;
    let mut live = Vec::new();

    for _ in 0..256 {
        let size = rng.gen_range_usize(0, 512);
        let ptr = dbg.malloc(size, SITES[0]).expect("malloc");
        expected += size as u64;
        live.push(ptr);
        if rng.gen_range_usize(0, 1) == 0 {
            if let Some(ptr) = live.pop() {
                dbg.free(ptr.as_ptr(), SITES[1]);
            }
        }
    }

    let stats = dbg.statistics();
    assert_eq!(stats.total_count, 256);
    assert_eq!(stats.total_bytes, expected);
    assert_eq!(stats.active_count, live.len() as u64);
    assert_eq!(stats.fail_count, 0);
    dbg.reset();
}

#[test]
fn heavy_hitters_track_bytes_per_site() {
    let mut dbg = silent_debugger();
    let big = Site::new("big.c", 1);
    let small = Site::new("small.c", 2);

    let mut ptrs = Vec::new();
    for _ in 0..9 {
        ptrs.push(dbg.malloc(1000, big).expect("malloc"));
    }
    ptrs.push(dbg.malloc(100, small).expect("malloc"));
    // Releases do not change the tallies.
    for ptr in ptrs.drain(..) {
        dbg.free(ptr.as_ptr(), Site::UNKNOWN);
    }

    let hitters = dbg.heavy_hitters();
    assert_eq!(hitters.len(), 1);
    assert_eq!(hitters[0].site, big);
    assert_eq!(hitters[0].bytes, 9000);
    assert_eq!(hitters[0].count, 9);
    assert_eq!(hitters[0].share_permille, 989);

    let everyone = dbg.heavy_hitters_above(0);
    assert_eq!(everyone.len(), 2);
    assert_eq!(everyone[1].site, small);
}
