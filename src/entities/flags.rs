pub const FLAG_WORDS: usize = 4;
pub const BITS_PER_WORD: usize = 32;
pub const FLAG_BITS: usize = FLAG_WORDS * BITS_PER_WORD;

/// Fixed-width bit set persisted as four 32-bit words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagArray([u32; FLAG_WORDS]);

impl FlagArray {
    pub const EMPTY: FlagArray = FlagArray([0; FLAG_WORDS]);

    pub fn from_words(words: [u32; FLAG_WORDS]) -> Self {
        Self(words)
    }

    pub fn words(&self) -> [u32; FLAG_WORDS] {
        self.0
    }

    pub fn word(&self, index: usize) -> u32 {
        self.0.get(index).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|word| *word == 0)
    }

    pub fn is_set(&self, bit: usize) -> bool {
        if bit >= FLAG_BITS {
            return false;
        }
        self.0[bit / BITS_PER_WORD] & (1 << (bit % BITS_PER_WORD)) != 0
    }

    pub fn set(&mut self, bit: usize) {
        if bit < FLAG_BITS {
            self.0[bit / BITS_PER_WORD] |= 1 << (bit % BITS_PER_WORD);
        }
    }

    pub fn clear(&mut self, bit: usize) {
        if bit < FLAG_BITS {
            self.0[bit / BITS_PER_WORD] &= !(1 << (bit % BITS_PER_WORD));
        }
    }

    pub fn with(mut self, bit: usize) -> Self {
        self.set(bit);
        self
    }

    pub fn union_with(&mut self, other: &FlagArray) {
        for (word, other) in self.0.iter_mut().zip(other.0.iter()) {
            *word |= *other;
        }
    }

    /// Parses either the four-word form or the older single-word form, which
    /// only ever carried the first word.
    pub fn parse_ascii(value: &str) -> Self {
        let mut words = [0u32; FLAG_WORDS];
        for (slot, token) in words.iter_mut().zip(value.split_whitespace()) {
            *slot = ascii_to_word(token);
        }
        Self(words)
    }

    pub fn to_ascii(&self) -> String {
        self.0
            .iter()
            .map(|word| word_to_ascii(*word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Letters `a`-`z` are bits 0-25 and `A`-`F` bits 26-31. A token made only
/// of digits (with an optional sign) is read as a plain decimal word.
pub fn ascii_to_word(token: &str) -> u32 {
    let numeric = !token.is_empty()
        && token
            .chars()
            .all(|ch| ch.is_ascii_digit() || ch == '-');
    if numeric {
        return token
            .parse::<i64>()
            .map(|value| value as u32)
            .unwrap_or(0);
    }
    let mut word = 0u32;
    for ch in token.chars() {
        let bit = if ch.is_ascii_lowercase() {
            Some(ch as u32 - 'a' as u32)
        } else if ch.is_ascii_uppercase() {
            Some(26 + ch as u32 - 'A' as u32)
        } else {
            None
        };
        if let Some(bit) = bit.filter(|bit| *bit < BITS_PER_WORD as u32) {
            word |= 1 << bit;
        }
    }
    word
}

pub fn word_to_ascii(word: u32) -> String {
    if word == 0 {
        return "0".to_string();
    }
    (0..BITS_PER_WORD as u32)
        .filter(|bit| word & (1 << bit) != 0)
        .map(|bit| {
            if bit < 26 {
                char::from(b'a' + bit as u8)
            } else {
                char::from(b'A' + (bit - 26) as u8)
            }
        })
        .collect()
}
