use rand::{RngCore, SeedableRng, rngs::SmallRng};

/// Width in bits of a single chunk.
pub const CHUNK_BITS: u32 = 4;

/// Amount of distinct values a chunk can take.
pub const CHUNK_VALUES: u8 = 1 << CHUNK_BITS;

/// Amount of chunks carved out of a single generator word.
pub const CHUNKS_PER_WORD: u32 = u32::BITS / CHUNK_BITS;

/// Exclusive upper bound of the chunks kept by `next_chunk_divisible_by_3`.
///
/// The largest multiple of 3 that fits in a chunk, `16 - 16 % 3 = 15`, so only the value 15
/// gets rejected.
pub const DIVISIBLE_BY_3_BOUND: u8 = CHUNK_VALUES - CHUNK_VALUES % 3;

const CHUNK_MASK: u32 = (1 << CHUNK_BITS) - 1;

/// A per-worker source of small unbiased random values.
///
/// Every call to the underlying generator produces a 32 bit word which is then sliced into
/// `CHUNKS_PER_WORD` chunks of `CHUNK_BITS` bits, so a single generator call serves up to eight
/// decisions.
#[derive(Debug, Clone)]
pub struct EntropySource<R: RngCore = SmallRng> {
    rng: R,
    word: u32,
    consumed: u32,
    words_drawn: u64,
}

impl EntropySource<SmallRng> {
    /// Creates a new `EntropySource` backed by a `SmallRng`.
    ///
    /// # Arguments
    /// * `seed` - The seed for the underlying generator.
    ///
    /// # Returns
    /// A new `EntropySource` instance.
    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> EntropySource<R> {
    /// Creates a new `EntropySource` from an existing generator.
    ///
    /// No word is cached yet, the first chunk request pulls one from `rng`.
    ///
    /// # Arguments
    /// * `rng` - The generator to draw words from.
    ///
    /// # Returns
    /// A new `EntropySource` instance.
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            word: 0,
            consumed: CHUNKS_PER_WORD,
            words_drawn: 0,
        }
    }

    /// Returns the next chunk of the cached word, drawing a new word once it's exhausted.
    ///
    /// # Returns
    /// A uniformly distributed value in `[0, CHUNK_VALUES)`.
    #[inline]
    pub fn next_chunk(&mut self) -> u8 {
        if self.consumed == CHUNKS_PER_WORD {
            self.word = self.rng.next_u32();
            self.consumed = 0;
            self.words_drawn += 1;
        }

        let chunk = (self.word >> (self.consumed * CHUNK_BITS)) & CHUNK_MASK;
        self.consumed += 1;
        chunk as u8
    }

    /// Returns a chunk from a range whose size is a multiple of 3.
    ///
    /// Chunks at or above `DIVISIBLE_BY_3_BOUND` are rejected and redrawn, so reducing the result
    /// `% 3` is exactly uniform.
    ///
    /// # Returns
    /// A uniformly distributed value in `[0, DIVISIBLE_BY_3_BOUND)`.
    #[inline]
    pub fn next_chunk_divisible_by_3(&mut self) -> u8 {
        loop {
            let chunk = self.next_chunk();
            if chunk < DIVISIBLE_BY_3_BOUND {
                return chunk;
            }
        }
    }

    /// Returns a single fair bit, `CHUNK_VALUES` is even so `% 2` has no bias.
    #[inline]
    pub fn next_bit(&mut self) -> bool {
        self.next_chunk() % 2 == 1
    }

    /// Returns how many words were pulled from the underlying generator so far.
    pub fn words_drawn(&self) -> u64 {
        self.words_drawn
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;

    use super::*;

    /// Replays a fixed list of words, to assert on exact chunk slicing.
    struct ScriptedRng {
        words: Vec<u32>,
        next: usize,
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            let word = self.words[self.next % self.words.len()];
            self.next += 1;
            word
        }

        fn next_u64(&mut self) -> u64 {
            self.next_u32() as u64
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.iter_mut().for_each(|b| *b = self.next_u32() as u8);
        }
    }

    fn scripted(words: Vec<u32>) -> EntropySource<ScriptedRng> {
        EntropySource::new(ScriptedRng { words, next: 0 })
    }

    #[test]
    fn chunk_layout_constants() {
        assert_eq!(CHUNK_VALUES, 16);
        assert_eq!(CHUNKS_PER_WORD, 8);
        assert_eq!(DIVISIBLE_BY_3_BOUND, 15);
        assert_eq!(DIVISIBLE_BY_3_BOUND % 3, 0);
    }

    #[test]
    fn chunks_come_out_least_significant_first() {
        let mut source = scripted(vec![0x7654_3210, 0xfedc_ba98]);

        let chunks: Vec<_> = (0..16).map(|_| source.next_chunk()).collect();
        assert_eq!(chunks, (0..16).collect::<Vec<u8>>());
        assert_eq!(source.words_drawn(), 2);
    }

    #[test]
    fn one_word_serves_eight_chunks() {
        let mut source = EntropySource::new(StdRng::seed_from_u64(7));

        for _ in 0..CHUNKS_PER_WORD {
            source.next_chunk();
        }
        assert_eq!(source.words_drawn(), 1);

        source.next_chunk();
        assert_eq!(source.words_drawn(), 2);
    }

    #[test]
    fn rejects_the_top_chunk() {
        // Every chunk of the first word is 15, all of them must be skipped.
        let mut source = scripted(vec![0xffff_ffff, 0x0000_00a5]);

        assert_eq!(source.next_chunk_divisible_by_3(), 5);
        assert_eq!(source.next_chunk_divisible_by_3(), 10);
        assert_eq!(source.words_drawn(), 2);
    }

    #[test]
    fn never_returns_excluded_value() {
        let mut source = EntropySource::seeded(42);

        for _ in 0..100_000 {
            assert!(source.next_chunk_divisible_by_3() < DIVISIBLE_BY_3_BOUND);
        }
    }

    #[test]
    fn mod_3_is_uniform() {
        const SAMPLES: usize = 300_000;
        let mut source = EntropySource::seeded(1234);
        let mut buckets = [0usize; 3];

        for _ in 0..SAMPLES {
            buckets[(source.next_chunk_divisible_by_3() % 3) as usize] += 1;
        }

        // Each bucket is Binomial(n, 1/3), sigma is about 258 here, allow 5 sigma.
        let expected = SAMPLES / 3;
        for (door, &count) in buckets.iter().enumerate() {
            assert!(
                count.abs_diff(expected) < 1_300,
                "door {door} drawn {count} times, expected about {expected}"
            );
        }
    }

    #[test]
    fn raw_chunks_are_uniform() {
        const SAMPLES: usize = 160_000;
        let mut source = EntropySource::seeded(99);
        let mut buckets = [0usize; CHUNK_VALUES as usize];

        for _ in 0..SAMPLES {
            buckets[source.next_chunk() as usize] += 1;
        }

        let expected = SAMPLES / CHUNK_VALUES as usize;
        for (value, &count) in buckets.iter().enumerate() {
            assert!(
                count.abs_diff(expected) < 500,
                "chunk {value} drawn {count} times, expected about {expected}"
            );
        }
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = EntropySource::seeded(5);
        let mut b = EntropySource::seeded(5);

        for _ in 0..1_000 {
            assert_eq!(a.next_chunk(), b.next_chunk());
        }
    }
}
