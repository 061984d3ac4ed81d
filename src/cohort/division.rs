//! Division label parsing
//!
//! Age-group labels such as `M30-34`, `F25-29` or `M80+` form a natural
//! ordering within each gender. Labels that do not follow that shape (`PRO`,
//! `overall`, relay categories, ...) are not orderable.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

/// Sort key of an orderable division: gender, then lower age bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DivisionKey {
    pub gender: Gender,
    pub age_from: u32,
}

impl DivisionKey {
    /// Parse a gender + age-band label, `None` when the label is not orderable
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let mut chars = label.chars();
        let gender = match chars.next()?.to_ascii_uppercase() {
            'M' => Gender::Male,
            'F' | 'W' => Gender::Female,
            _ => return None,
        };

        let rest = chars.as_str().trim_start();
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 || digits_end > 3 {
            return None;
        }
        let age_from: u32 = rest[..digits_end].parse().ok()?;

        let tail = &rest[digits_end..];
        let well_formed = match tail {
            "" | "+" => true,
            _ => tail
                .strip_prefix('-')
                .map(|upper| {
                    !upper.is_empty()
                        && upper.len() <= 3
                        && upper.chars().all(|c| c.is_ascii_digit())
                })
                .unwrap_or(false),
        };

        if well_formed {
            Some(Self { gender, age_from })
        } else {
            None
        }
    }
}
