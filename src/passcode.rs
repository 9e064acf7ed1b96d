//! Lobby passcode generation seam.

use rand::Rng;

/// Alphabet without lookalike characters so codes survive being read aloud.
const PASSCODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const PASSCODE_LENGTH: usize = 8;

/// Source of lobby passcodes, provided by the environment.
///
/// Uniqueness across active games is enforced by the caller (codes are
/// claimed against the shared registry), not by the source itself.
pub trait PasscodeSource: Send + Sync {
    /// Draw a fresh candidate passcode.
    fn generate(&self) -> String;
}

/// Production source drawing random codes from [`PASSCODE_ALPHABET`].
#[derive(Debug, Default)]
pub struct RandomPasscodes;

impl PasscodeSource for RandomPasscodes {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..PASSCODE_LENGTH)
            .map(|_| {
                let index = rng.random_range(0..PASSCODE_ALPHABET.len());
                PASSCODE_ALPHABET[index] as char
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_fixed_length_and_alphabet() {
        let source = RandomPasscodes;
        for _ in 0..50 {
            let code = source.generate();
            assert_eq!(code.len(), PASSCODE_LENGTH);
            assert!(code.bytes().all(|b| PASSCODE_ALPHABET.contains(&b)));
        }
    }
}
