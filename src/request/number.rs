//! Human-facing request numbers ("HM" + six digits).
//!
//! Candidates are drawn from the injected entropy source. The caller checks
//! for collisions and relies on the store's unique index as the final word.

use crate::environment::Entropy;

pub const REQUEST_NUMBER_PREFIX: &str = "HM";

/// Random "HM" + 6 digit candidate
pub fn candidate(entropy: &dyn Entropy) -> String {
    format!("{REQUEST_NUMBER_PREFIX}{:06}", entropy.next_u32() % 1_000_000)
}

/// Wider fallback once the bounded candidate attempts are exhausted
pub fn fallback(entropy: &dyn Entropy) -> String {
    let mut bytes = [0u8; 16];
    entropy.fill_bytes(&mut bytes);
    let id = uuid::Builder::from_random_bytes(bytes).into_uuid();
    let hex = id.simple().to_string().to_ascii_uppercase();
    format!("{REQUEST_NUMBER_PREFIX}{}", &hex[..10])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::SeededEntropy;

    #[test]
    fn test_candidate_shape() {
        let e = SeededEntropy::new(42);
        for _ in 0..100 {
            let n = candidate(&e);
            assert_eq!(n.len(), 8);
            assert!(n.starts_with("HM"));
            assert!(n[2..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_fallback_shape() {
        let e = SeededEntropy::new(1);
        let n = fallback(&e);
        assert_eq!(n.len(), 12);
        assert!(n.starts_with("HM"));
        assert!(n[2..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(n, fallback(&e));
    }
}
