use subtle::ConstantTimeEq;

/// Compare a client-supplied token against the configured secret.
///
/// The byte comparison runs in constant time for equal-length inputs; a length
/// mismatch returns early, which only reveals the secret's length.
pub fn tokens_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
