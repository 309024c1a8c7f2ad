use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Mutex;

/// Produces an ordering for a list of `len` items. Kept object safe so the
/// engine can hold an `Arc<dyn Shuffler>` and tests can pin the order.
pub trait Shuffler: Send + Sync {
    /// Returns a permutation of `0..len`.
    fn permutation(&self, len: usize) -> Vec<usize>;
}

/// Reorders `items` according to `shuffler.permutation(items.len())`.
pub fn shuffle_in_place<T>(shuffler: &dyn Shuffler, items: &mut Vec<T>) {
    let order = shuffler.permutation(items.len());
    let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
    for index in order {
        if let Some(item) = slots.get_mut(index).and_then(Option::take) {
            items.push(item);
        }
    }
    // A malformed permutation must not drop certificates.
    items.extend(slots.into_iter().flatten());
}

pub struct RandomShuffler {
    rng: Mutex<StdRng>,
}

impl RandomShuffler {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Shuffler for RandomShuffler {
    fn permutation(&self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        order.shuffle(&mut *rng);
        order
    }
}

/// Keeps ledger-return order.
pub struct IdentityShuffler;

impl Shuffler for IdentityShuffler {
    fn permutation(&self, len: usize) -> Vec<usize> {
        (0..len).collect()
    }
}

pub struct ReverseShuffler;

impl Shuffler for ReverseShuffler {
    fn permutation(&self, len: usize) -> Vec<usize> {
        (0..len).rev().collect()
    }
}
