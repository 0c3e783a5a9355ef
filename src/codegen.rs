//! Short identifier generation
//!
//! Produces random alphanumeric codes for short links. The generator itself
//! never checks collisions; uniqueness depends on the target namespace, so
//! callers pass a probe to [`unique_code`].

use crate::{Error, Result};
use rand::{distributions::Alphanumeric, Rng};

/// Default length for generated short codes
pub const DEFAULT_CODE_LEN: usize = 6;

/// Upper bound on collision retries before giving up
pub const MAX_CODE_ATTEMPTS: usize = 100;

/// Generate a random code of `length` characters from the 62-character
/// alphanumeric alphabet. No uniqueness guarantee.
pub fn new_code(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate a code that is free in the caller's namespace.
///
/// `taken` probes whether a candidate already exists. Candidates are
/// regenerated on collision, up to [`MAX_CODE_ATTEMPTS`] times; past the
/// bound the caller gets [`Error::CodeSpaceExhausted`] rather than an
/// unbounded loop.
pub fn unique_code<F>(length: usize, mut taken: F) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    for _ in 0..MAX_CODE_ATTEMPTS {
        let candidate = new_code(length);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(Error::CodeSpaceExhausted(MAX_CODE_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_code_length_and_alphabet() {
        for len in [1, 6, 20] {
            let code = new_code(len);
            assert_eq!(code.len(), len);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_unique_code_skips_taken() {
        // Force collisions on the first few candidates
        let mut seen = 0;
        let code = unique_code(6, |_| {
            seen += 1;
            Ok(seen <= 3)
        })
        .unwrap();
        assert_eq!(code.len(), 6);
        assert_eq!(seen, 4);
    }

    #[test]
    fn test_unique_code_bounded() {
        let err = unique_code(6, |_| Ok(true)).unwrap_err();
        assert!(matches!(err, Error::CodeSpaceExhausted(MAX_CODE_ATTEMPTS)));
    }

    #[test]
    fn test_unique_code_propagates_probe_errors() {
        let err = unique_code(6, |_| Err(Error::BackendUnavailable("down".into())));
        assert!(matches!(err, Err(Error::BackendUnavailable(_))));
    }

    #[test]
    fn test_repeated_generation_against_growing_namespace() {
        // Generating N codes against a namespace holding the previous N-1
        // never produces a duplicate.
        let mut namespace: HashSet<String> = HashSet::new();
        for _ in 0..200 {
            let code = unique_code(6, |c| Ok(namespace.contains(c))).unwrap();
            assert!(namespace.insert(code));
        }
    }
}
