use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest value a 24-bit RGB color can hold.
const MAX_RGB: u32 = 0xFF_FF_FF;

/// A color in canonical `#RRGGBB` form (uppercase, always six digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexCode(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexCodeError {
    #[error("Invalid hex color '{0}': expected 6 hex digits, optionally prefixed with '#'")]
    Malformed(String),
}

impl HexCode {
    /// Builds a hex code from a packed 24-bit RGB value.
    pub fn from_rgb(rgb: u32) -> Self {
        Self(format!("#{:06X}", rgb & MAX_RGB))
    }

    /// Picks a uniformly random color.
    pub fn random() -> Self {
        Self::random_with(&mut rand::rng())
    }

    pub fn random_with<R: Rng>(rng: &mut R) -> Self {
        Self::from_rgb(rng.random_range(0..=MAX_RGB))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn rgb(&self) -> u32 {
        // Always valid: the inner string is checked on construction.
        u32::from_str_radix(&self.0[1..], 16).unwrap_or_default()
    }
}

impl FromStr for HexCode {
    type Err = HexCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HexCodeError::Malformed(s.to_string()));
        }

        Ok(Self(format!("#{}", digits.to_ascii_uppercase())))
    }
}

impl TryFrom<String> for HexCode {
    type Error = HexCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexCode> for String {
    fn from(hex: HexCode) -> Self {
        hex.0
    }
}

impl fmt::Display for HexCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_normalizes_to_uppercase_with_hash() {
        assert_eq!(HexCode::from_str("abc123").unwrap().as_str(), "#ABC123");
        assert_eq!(HexCode::from_str("#abc123").unwrap().as_str(), "#ABC123");
        assert_eq!(HexCode::from_str(" #00ff7F ").unwrap().as_str(), "#00FF7F");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(HexCode::from_str("").is_err());
        assert!(HexCode::from_str("#12345").is_err());
        assert!(HexCode::from_str("#1234567").is_err());
        assert!(HexCode::from_str("#GG0000").is_err());
        assert!(HexCode::from_str("##123456").is_err());
    }

    #[test]
    fn test_from_rgb_pads_and_masks() {
        assert_eq!(HexCode::from_rgb(0).as_str(), "#000000");
        assert_eq!(HexCode::from_rgb(0xABC).as_str(), "#000ABC");
        assert_eq!(HexCode::from_rgb(0x1FFFFFF).as_str(), "#FFFFFF");
    }

    #[test]
    fn test_random_is_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let hex = HexCode::random_with(&mut rng);
            assert_eq!(hex.as_str().len(), 7);
            assert_eq!(HexCode::from_str(hex.as_str()).unwrap(), hex);
        }
    }

    #[test]
    fn test_rgb_matches_digits() {
        assert_eq!(HexCode::from_str("#0A0B0C").unwrap().rgb(), 0x0A0B0C);
    }

    #[test]
    fn test_serde_rejects_malformed() {
        let json = serde_json::to_string(&HexCode::from_rgb(0xFF0000)).unwrap();
        assert_eq!(json, "\"#FF0000\"");
        assert!(serde_json::from_str::<HexCode>("\"red\"").is_err());
    }
}
