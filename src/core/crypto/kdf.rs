//! HKDF-SHA256 subkey derivation.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Largest subkey [`derive`] will produce, in bytes.
pub const MAX_OUTPUT_LEN: usize = 255;

/// Derive `len` bytes from `master` under `context`.
///
/// No salt is used, so the same master key and context always produce the
/// same subkey. Contexts are fixed literals, one per purpose and version.
pub fn derive(
    master: &[u8],
    context: &str,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if len == 0 || len > MAX_OUTPUT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "output length {} outside 1..={}",
            len, MAX_OUTPUT_LEN
        )));
    }

    let hk = Hkdf::<Sha256>::new(None, master);
    let mut out = Zeroizing::new(vec![0u8; len]);
    hk.expand(context.as_bytes(), &mut out)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(out)
}

/// Fixed-size variant of [`derive`].
pub fn derive_array<const N: usize>(
    master: &[u8],
    context: &str,
) -> Result<Zeroizing<[u8; N]>, CryptoError> {
    let bytes = derive(master, context, N)?;
    let mut out = Zeroizing::new([0u8; N]);
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_deterministic() {
        let master = [7u8; 32];
        let a = derive(&master, "email-encryption-v1", 32).unwrap();
        let b = derive(&master, "email-encryption-v1", 32).unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_context_separates_output() {
        let master = [7u8; 32];
        let key = derive(&master, "email-encryption-v1", 32).unwrap();
        let nonce = derive(&master, "email-nonce-v1", 32).unwrap();
        assert_ne!(*key, *nonce);
    }

    #[test]
    fn test_length_bounds() {
        let master = [1u8; 32];
        assert!(derive(&master, "ctx", 0).is_err());
        assert!(derive(&master, "ctx", 256).is_err());
        assert_eq!(derive(&master, "ctx", 1).unwrap().len(), 1);
        assert_eq!(derive(&master, "ctx", 255).unwrap().len(), 255);
    }

    #[test]
    fn test_shorter_output_is_prefix() {
        let master = [9u8; 32];
        let long = derive(&master, "ctx", 32).unwrap();
        let short = derive(&master, "ctx", 12).unwrap();
        assert_eq!(&long[..12], &short[..]);
    }

    #[test]
    fn test_rfc5869_case_3() {
        // RFC 5869 test case 3: zero-length salt and info
        let ikm = [0x0bu8; 22];
        let okm = derive(&ikm, "", 42).unwrap();
        assert_eq!(
            hex::encode(&*okm),
            "8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d9d201395faa4b61a96c8"
        );
    }

    proptest! {
        #[test]
        fn prop_same_inputs_same_output(master in proptest::array::uniform32(any::<u8>()), ctx in "[a-z0-9-]{1,24}", len in 1usize..=64) {
            let a = derive(&master, &ctx, len).unwrap();
            let b = derive(&master, &ctx, len).unwrap();
            prop_assert_eq!(&*a, &*b);
        }

        #[test]
        fn prop_distinct_contexts_differ(master in proptest::array::uniform32(any::<u8>()), a in "[a-z]{1,12}", b in "[a-z]{1,12}") {
            prop_assume!(a != b);
            let x = derive(&master, &a, 32).unwrap();
            let y = derive(&master, &b, 32).unwrap();
            prop_assert_ne!(&*x, &*y);
        }
    }
}
