//! Dice rolling and skill checks.
//!
//! Supports standard dice notation: `XdY+Z`, chained terms such as
//! `2d6+1d4+3`, and bare constants. All randomness flows through the
//! [`Roller`] trait so the engine can be driven by a seeded RNG in play
//! and by scripted faces in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
}

/// Source of die faces.
pub trait Roller {
    /// Roll one die, returning a face in `1..=sides`.
    fn roll_die(&mut self, sides: u32) -> u32;
}

impl<T: Roller + ?Sized> Roller for &mut T {
    fn roll_die(&mut self, sides: u32) -> u32 {
        (**self).roll_die(sides)
    }
}

impl<T: Roller + ?Sized> Roller for Box<T> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        (**self).roll_die(sides)
    }
}

/// A [`Roller`] backed by any `rand` RNG.
#[derive(Debug, Clone)]
pub struct RngRoller<R = StdRng> {
    rng: R,
}

impl RngRoller<StdRng> {
    /// Seed from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic roller for reproducible sessions.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RngRoller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Roller for RngRoller<R> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        self.rng.gen_range(1..=sides)
    }
}

/// One `NdS` term of a dice expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceComponent {
    pub count: u32,
    pub sides: u32,
}

/// A complete dice expression (e.g., `2d6+3`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceExpression {
    pub components: Vec<DiceComponent>,
    pub modifier: i32,
}

impl DiceExpression {
    /// Build `count`d`sides`+`modifier` without parsing.
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            components: vec![DiceComponent { count, sides }],
            modifier,
        }
    }

    /// A fixed value with no dice.
    pub fn constant(value: i32) -> Self {
        Self {
            components: Vec::new(),
            modifier: value,
        }
    }

    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut components = Vec::new();
        let mut modifier: i32 = 0;
        let mut current = String::new();
        let mut sign: i32 = 1;

        for ch in notation.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        Self::parse_term(&current, sign, &mut components, &mut modifier)?;
                        current.clear();
                    } else if !components.is_empty() || modifier != 0 {
                        return Err(DiceError::InvalidNotation(notation.clone()));
                    }
                    sign = if ch == '+' { 1 } else { -1 };
                }
                _ => current.push(ch),
            }
        }

        if current.is_empty() {
            return Err(DiceError::InvalidNotation(notation));
        }
        Self::parse_term(&current, sign, &mut components, &mut modifier)?;

        Ok(DiceExpression {
            components,
            modifier,
        })
    }

    fn parse_term(
        s: &str,
        sign: i32,
        components: &mut Vec<DiceComponent>,
        modifier: &mut i32,
    ) -> Result<(), DiceError> {
        if let Some(d_pos) = s.find('d') {
            if sign < 0 {
                return Err(DiceError::InvalidNotation(s.to_string()));
            }
            let count_str = &s[..d_pos];
            let count: u32 = if count_str.is_empty() {
                1
            } else {
                count_str
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
            };
            let sides: u32 = s[d_pos + 1..]
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            if sides == 0 {
                return Err(DiceError::InvalidDieSize(sides));
            }
            components.push(DiceComponent { count, sides });
        } else {
            let value: i32 = s
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            *modifier += sign * value;
        }
        Ok(())
    }

    /// Roll the expression.
    pub fn roll<R: Roller + ?Sized>(&self, roller: &mut R) -> DiceRoll {
        let faces: Vec<u32> = self
            .components
            .iter()
            .flat_map(|c| std::iter::repeat(c.sides).take(c.count as usize))
            .map(|sides| roller.roll_die(sides))
            .collect();

        let dice_total: i32 = faces.iter().map(|&f| f as i32).sum();
        let total = dice_total + self.modifier;

        let mut detail = faces
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("+");
        if detail.is_empty() {
            detail = self.modifier.to_string();
        } else if self.modifier != 0 {
            detail.push_str(&format!("{:+}", self.modifier));
        }

        DiceRoll {
            total,
            faces,
            detail,
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl TryFrom<String> for DiceExpression {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DiceExpression::parse(&value)
    }
}

impl From<DiceExpression> for String {
    fn from(value: DiceExpression) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .components
            .iter()
            .map(|c| format!("{}d{}", c.count, c.sides))
            .collect();
        if terms.is_empty() {
            return write!(f, "{}", self.modifier);
        }
        write!(f, "{}", terms.join("+"))?;
        if self.modifier != 0 {
            write!(f, "{:+}", self.modifier)?;
        }
        Ok(())
    }
}

/// Result of rolling an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    /// Sum of faces plus modifier. May be zero or negative.
    pub total: i32,
    pub faces: Vec<u32>,
    /// Faces joined with `+`, then the signed modifier (`"3+5+2"`).
    pub detail: String,
}

/// Outcome of a d20 check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Check {
    pub success: bool,
    pub roll: u32,
    pub total: i32,
}

/// Roll a d20, add `stat_bonus`, and compare against `dc`.
pub fn check<R: Roller + ?Sized>(stat_bonus: i32, dc: i32, roller: &mut R) -> Check {
    let roll = roller.roll_die(20);
    let total = roll as i32 + stat_bonus;
    Check {
        success: total >= dc,
        roll,
        total,
    }
}

/// Convenience function to parse and roll in one step.
pub fn roll<R: Roller + ?Sized>(notation: &str, roller: &mut R) -> Result<DiceRoll, DiceError> {
    Ok(DiceExpression::parse(notation)?.roll(roller))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDice;

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d20").unwrap();
        assert_eq!(expr.components, vec![DiceComponent { count: 1, sides: 20 }]);
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn test_parse_with_modifier() {
        assert_eq!(DiceExpression::parse("1d8+1").unwrap().modifier, 1);
        assert_eq!(DiceExpression::parse("1d4 - 1").unwrap().modifier, -1);
    }

    #[test]
    fn test_parse_implicit_count_and_constant() {
        let expr = DiceExpression::parse("d6").unwrap();
        assert_eq!(expr.components[0].count, 1);

        let expr = DiceExpression::parse("7").unwrap();
        assert!(expr.components.is_empty());
        assert_eq!(expr.modifier, 7);
    }

    #[test]
    fn test_parse_multiple_dice() {
        let expr = DiceExpression::parse("2d6+1d4+3").unwrap();
        assert_eq!(expr.components.len(), 2);
        assert_eq!(expr.modifier, 3);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(DiceExpression::parse(""), Err(DiceError::NoDice));
        assert_eq!(DiceExpression::parse("2d0"), Err(DiceError::InvalidDieSize(0)));
        assert!(matches!(
            DiceExpression::parse("xd6"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert!(matches!(
            DiceExpression::parse("1d6+"),
            Err(DiceError::InvalidNotation(_))
        ));
    }

    #[test]
    fn test_roll_detail_format() {
        let mut dice = ScriptedDice::sequence([3, 5]);
        let roll = DiceExpression::parse("2d6+2").unwrap().roll(&mut dice);
        assert_eq!(roll.total, 10);
        assert_eq!(roll.detail, "3+5+2");

        let mut dice = ScriptedDice::constant(1);
        let roll = DiceExpression::parse("1d4-1").unwrap().roll(&mut dice);
        assert_eq!(roll.total, 0);
        assert_eq!(roll.detail, "1-1");
    }

    #[test]
    fn test_check_compares_total() {
        let mut dice = ScriptedDice::constant(10);
        let result = check(3, 13, &mut dice);
        assert!(result.success);
        assert_eq!(result.roll, 10);
        assert_eq!(result.total, 13);
        assert!(!check(2, 13, &mut dice).success);
    }

    #[test]
    fn test_roll_range() {
        let mut roller = RngRoller::seeded(7);
        for _ in 0..100 {
            let result = roll("1d20+5", &mut roller).unwrap();
            assert!(result.total >= 6 && result.total <= 25);
        }
    }

    #[test]
    fn test_serde_as_notation() {
        let expr = DiceExpression::new(1, 6, 2);
        let json = serde_json::to_string(&expr).unwrap();
        assert_eq!(json, "\"1d6+2\"");
        let back: DiceExpression = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }
}
