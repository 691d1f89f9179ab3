use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// XorShift pseudo-random generator
#[derive(Debug, Clone)]
pub struct XorShift {
    state: u64,
}

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Seed from the wall clock
    pub fn from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);
        Self::new(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    pub fn next_usize(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as usize
    }

    /// Uniform value in `[low, high)`
    pub fn next_f64(&mut self, low: f64, high: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        low + unit * (high - low)
    }
}

/// Shared picker for messages and navigation targets
#[derive(Debug)]
pub struct Picker {
    rng: Mutex<XorShift>,
}

impl Picker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(XorShift::new(seed)),
        }
    }

    pub fn from_clock() -> Self {
        Self {
            rng: Mutex::new(XorShift::from_clock()),
        }
    }

    /// Pick one item, `None` for an empty slice
    pub fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.rng.lock().next_usize(items.len());
        items.get(index)
    }
}

impl Default for Picker {
    fn default() -> Self {
        Self::from_clock()
    }
}
