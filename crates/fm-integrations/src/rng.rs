use ring::rand::{SecureRandom, SystemRandom};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Randomness for the simulated services, drawn from system entropy.
#[derive(Clone)]
pub struct Dice {
    rng: SystemRandom,
}

impl Default for Dice {
    fn default() -> Self {
        Self::new()
    }
}

impl Dice {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    pub fn next_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        match self.rng.fill(&mut bytes) {
            Ok(()) => u64::from_le_bytes(bytes),
            // fall back to uuid's generator
            Err(_) => uuid::Uuid::new_v4().as_u64_pair().0,
        }
    }

    /// Uniform value in `[0, 1)`.
    pub fn unit(&self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// `true` with probability `p`.
    pub fn chance(&self, p: f64) -> bool {
        if p <= 0.0 {
            false
        } else if p >= 1.0 {
            true
        } else {
            self.unit() < p
        }
    }

    /// Uniform integer in `[0, bound)`.
    pub fn below(&self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.next_u64() % bound
    }

    /// Lowercase base-36 identifier of `len` characters.
    pub fn base36(&self, len: usize) -> String {
        (0..len)
            .map(|_| BASE36[self.below(BASE36.len() as u64) as usize] as char)
            .collect()
    }
}
