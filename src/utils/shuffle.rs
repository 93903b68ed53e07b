use rand::{rngs::StdRng, seq::SliceRandom, thread_rng, Rng, SeedableRng};

pub fn new_seed() -> i64 {
    thread_rng().gen()
}

/// Deterministic in-place shuffle: the same seed always yields the same permutation.
pub fn seeded_shuffle<T>(items: &mut [T], seed: i64) {
    let mut rng = StdRng::seed_from_u64(seed as u64);
    items.shuffle(&mut rng);
}
