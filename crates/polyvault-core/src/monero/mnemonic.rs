//! Monero's 25-word electrum-style seed encoding of a private spend key.
//!
//! Each 4-byte little-endian chunk of the key maps to three words; a
//! checksum word chosen by CRC-32 over the three-letter prefixes is appended.

use zeroize::Zeroizing;

use crate::error::CodecError;

use super::wordlist::WORDS;

const N: u64 = WORDS.len() as u64;
const PREFIX_LEN: usize = 3;
const DATA_WORDS: usize = 24;

/// Encode a 32-byte private spend key as 25 words.
pub fn encode(spend_key: &[u8; 32]) -> String {
    let mut words: Vec<&'static str> = Vec::with_capacity(DATA_WORDS + 1);
    for chunk in spend_key.chunks_exact(4) {
        let x = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as u64;
        let w1 = x % N;
        let w2 = (x / N + w1) % N;
        let w3 = (x / N / N + w2) % N;
        words.extend([w1, w2, w3].map(|i| WORDS[i as usize]));
    }
    words.push(words[checksum_index(&words)]);
    words.join(" ")
}

/// Decode a 25-word phrase back to the private spend key, verifying the
/// checksum word.
pub fn decode(phrase: &str) -> Result<Zeroizing<[u8; 32]>, CodecError> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.len() != DATA_WORDS + 1 {
        return Err(CodecError::InvalidLength {
            expected: DATA_WORDS + 1,
            got: words.len(),
        });
    }
    let indices = words
        .iter()
        .map(|w| word_index(w).ok_or_else(|| CodecError::UnknownWord((*w).to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    let expected = words[checksum_index(&words[..DATA_WORDS])];
    if prefix(expected) != prefix(words[DATA_WORDS]) {
        return Err(CodecError::InvalidChecksum);
    }

    let mut key = Zeroizing::new([0u8; 32]);
    for (chunk, triple) in key.chunks_exact_mut(4).zip(indices[..DATA_WORDS].chunks_exact(3)) {
        let (w1, w2, w3) = (triple[0], triple[1], triple[2]);
        let x = w1 + N * ((N - w1 + w2) % N) + N * N * ((N - w2 + w3) % N);
        if x > u32::MAX as u64 {
            return Err(CodecError::OutOfRange(format!(
                "word triple {} {} {}",
                WORDS[w1 as usize], WORDS[w2 as usize], WORDS[w3 as usize]
            )));
        }
        chunk.copy_from_slice(&(x as u32).to_le_bytes());
    }
    Ok(key)
}

fn word_index(word: &str) -> Option<u64> {
    WORDS.iter().position(|w| *w == word).map(|i| i as u64)
}

fn prefix(word: &str) -> &str {
    word.get(..PREFIX_LEN).unwrap_or(word)
}

fn checksum_index(words: &[&str]) -> usize {
    let joined: String = words.iter().map(|w| prefix(w)).collect();
    (crc32(joined.as_bytes()) % DATA_WORDS as u32) as usize
}

/// CRC-32 (IEEE 802.3, reflected polynomial `0xEDB88320`).
pub fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (POLY & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "132d0ca6e9a1f3ae316c12682d132ffa0f1112131415161718191a1b1c1d1e0f";
    const PHRASE: &str = "tossed mural diplomat jump peaches gearbox yoga hyper sphere biscuit \
        rated powder upcoming vacation zigzags boxes ornament renting glass gained island \
        bemused alarms bakery ornament";

    fn key() -> [u8; 32] {
        hex::decode(KEY).unwrap().try_into().unwrap()
    }

    fn normalized(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn encode_known_key() {
        assert_eq!(encode(&key()), normalized(PHRASE));
    }

    #[test]
    fn zero_key_is_all_first_word() {
        let phrase = encode(&[0u8; 32]);
        assert!(phrase.split(' ').all(|w| w == "abbey"));
        assert_eq!(phrase.split(' ').count(), 25);
    }

    #[test]
    fn checksum_word_is_deterministic() {
        let a = encode(&key());
        let b = encode(&key());
        assert_eq!(a, b);
        let words: Vec<&str> = a.split(' ').collect();
        assert_eq!(words[24], words[checksum_index(&words[..24])]);
    }

    #[test]
    fn decode_roundtrip() {
        assert_eq!(*decode(PHRASE).unwrap(), key());
        let k = [0xa5u8; 32];
        assert_eq!(*decode(&encode(&k)).unwrap(), k);
    }

    #[test]
    fn decode_rejects_bad_checksum() {
        let mut words: Vec<&str> = PHRASE.split_whitespace().collect();
        words[24] = if words[24] == "abbey" { "zoom" } else { "abbey" };
        assert_eq!(
            decode(&words.join(" ")).unwrap_err(),
            CodecError::InvalidChecksum
        );
    }

    #[test]
    fn decode_rejects_unknown_word() {
        let phrase = PHRASE.replacen("tossed", "bitcoin", 1);
        assert_eq!(
            decode(&phrase).unwrap_err(),
            CodecError::UnknownWord("bitcoin".into())
        );
    }

    #[test]
    fn decode_rejects_word_count() {
        assert!(matches!(
            decode("abbey abbey"),
            Err(CodecError::InvalidLength { expected: 25, got: 2 })
        ));
    }
}
