//! Random password generation with an entropy-based strength rating.

use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::envelope::SecretString;
use crate::error::{VaultError, VaultResult};

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>/?";

pub const MIN_LENGTH: usize = 8;
pub const MAX_LENGTH: usize = 64;

/// Which characters to draw from, and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorOptions {
    pub length: usize,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: 16,
            uppercase: true,
            lowercase: true,
            digits: true,
            symbols: true,
        }
    }
}

impl GeneratorOptions {
    fn pool(&self) -> Vec<char> {
        [
            (self.uppercase, UPPERCASE),
            (self.lowercase, LOWERCASE),
            (self.digits, DIGITS),
            (self.symbols, SYMBOLS),
        ]
        .iter()
        .filter(|(enabled, _)| *enabled)
        .flat_map(|(_, set)| set.chars())
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStrength {
    VeryWeak,
    Weak,
    Medium,
    Strong,
    VeryStrong,
}

impl PasswordStrength {
    /// Rating for `bits` of entropy.
    pub fn from_entropy(bits: f64) -> Self {
        if bits < 35.0 {
            PasswordStrength::VeryWeak
        } else if bits < 60.0 {
            PasswordStrength::Weak
        } else if bits < 80.0 {
            PasswordStrength::Medium
        } else if bits < 100.0 {
            PasswordStrength::Strong
        } else {
            PasswordStrength::VeryStrong
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PasswordStrength::VeryWeak => "Very Weak",
            PasswordStrength::Weak => "Weak",
            PasswordStrength::Medium => "Medium",
            PasswordStrength::Strong => "Strong",
            PasswordStrength::VeryStrong => "Very Strong",
        }
    }
}

/// Entropy of a uniformly random password: `length * log2(pool_size)`.
pub fn entropy_bits(length: usize, pool_size: usize) -> f64 {
    if pool_size == 0 {
        return 0.0;
    }
    length as f64 * (pool_size as f64).log2()
}

#[derive(Debug, Clone)]
pub struct GeneratedPassword {
    pub password: SecretString,
    pub entropy_bits: f64,
    pub strength: PasswordStrength,
}

/// Draw a password uniformly from the selected character classes.
pub fn generate_password(options: &GeneratorOptions) -> VaultResult<GeneratedPassword> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&options.length) {
        return Err(VaultError::InvalidInput(format!(
            "length must be between {} and {}",
            MIN_LENGTH, MAX_LENGTH
        )));
    }

    let pool = options.pool();
    if pool.is_empty() {
        return Err(VaultError::InvalidInput(
            "Select at least one character type".to_string(),
        ));
    }

    let mut rng = OsRng;
    let password: String = (0..options.length)
        .map(|_| pool[rng.gen_range(0..pool.len())])
        .collect();

    let bits = entropy_bits(options.length, pool.len());
    Ok(GeneratedPassword {
        password: Zeroizing::new(password),
        entropy_bits: bits,
        strength: PasswordStrength::from_entropy(bits),
    })
}
