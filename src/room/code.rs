//! Room code generation.

use rand::Rng;

/// Number of digits in a generated room code.
pub const CODE_LENGTH: usize = 5;

/// Source of candidate room codes.
///
/// Candidates are not guaranteed unique; the Room Manager collision-checks
/// each one against the store and retries. Tests substitute a fixed-sequence
/// generator to force collisions.
pub trait CodeGenerator: Send + Sync {
    /// Produce one candidate code.
    fn generate(&self) -> String;
}

/// Uniform 5-digit numeric codes, zero-padded.
pub struct NumericCodeGenerator;

impl CodeGenerator for NumericCodeGenerator {
    fn generate(&self) -> String {
        let value = rand::rng().random_range(0..100_000u32);
        format!("{value:05}")
    }
}
