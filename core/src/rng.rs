//! Seeded pseudo-random stream shared by path and wave generation.

/// Mulberry32 generator operating purely on wrapping `u32` arithmetic.
///
/// The stream is reproducible bit-for-bit on every platform and matches the
/// browser client, so a seed issued by the scoring service yields the same
/// path and wave contents wherever the run is replayed. Restarting a stream
/// means constructing a new generator from the same seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    const INCREMENT: u32 = 0x6d2b_79f5;
    const UNIT_SCALE: f64 = 4_294_967_296.0;

    /// Creates a generator positioned at the start of the seed's stream.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Advances the stream and returns the next raw 32-bit value.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(Self::INCREMENT);
        let t = self.state;
        let mut r = (t ^ (t >> 15)).wrapping_mul(1 | t);
        r ^= r.wrapping_add((r ^ (r >> 7)).wrapping_mul(61 | r));
        r ^ (r >> 14)
    }

    /// Advances the stream and returns a float uniformly distributed in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / Self::UNIT_SCALE
    }
}

impl Iterator for Mulberry32 {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_f64())
    }
}
