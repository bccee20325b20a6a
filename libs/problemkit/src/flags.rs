//! Visibility flags for generated data (stack traces and identifiers).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Controls whether a stack trace or identifier is generated (or inherited),
/// and where it becomes visible on the resolved [`Problem`](crate::Problem).
///
/// - [`Flags::DISABLED`]: nothing is generated or inherited.
/// - [`Flags::FIELD`]: exposed on the public field (and therefore serialized).
/// - [`Flags::LOG`]: exposed only on the log view.
/// - [`Flags::ALL`]: both.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(u8);

impl Flags {
    pub const DISABLED: Self = Self(0);
    pub const FIELD: Self = Self(1);
    pub const LOG: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::FIELD.0 | Self::LOG.0);

    /// Combines a list of flags as passed to a builder setter.
    ///
    /// An empty list means [`Flags::ALL`]; any [`Flags::DISABLED`] entry wins
    /// over every other entry.
    #[must_use]
    pub fn resolve(flags: &[Flags]) -> Self {
        if flags.is_empty() {
            return Self::ALL;
        }
        if flags.contains(&Self::DISABLED) {
            return Self::DISABLED;
        }
        flags.iter().fold(Self::DISABLED, |acc, f| acc | *f)
    }

    #[must_use]
    pub const fn is_disabled(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set. Never true for [`Flags::DISABLED`].
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn field(self) -> bool {
        self.contains(Self::FIELD)
    }

    #[must_use]
    pub const fn log(self) -> bool {
        self.contains(Self::LOG)
    }
}

impl BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.field(), self.log()) {
            (false, false) => f.write_str("Flags(DISABLED)"),
            (true, false) => f.write_str("Flags(FIELD)"),
            (false, true) => f.write_str("Flags(LOG)"),
            (true, true) => f.write_str("Flags(FIELD | LOG)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FlagName {
    Disabled,
    Field,
    Log,
    All,
}

impl From<FlagName> for Flags {
    fn from(name: FlagName) -> Self {
        match name {
            FlagName::Disabled => Flags::DISABLED,
            FlagName::Field => Flags::FIELD,
            FlagName::Log => Flags::LOG,
            FlagName::All => Flags::ALL,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagsRepr {
    One(FlagName),
    Many(Vec<FlagName>),
}

impl<'de> Deserialize<'de> for Flags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match FlagsRepr::deserialize(deserializer)? {
            FlagsRepr::One(name) => name.into(),
            FlagsRepr::Many(names) => {
                let flags: Vec<Flags> = names.into_iter().map(Flags::from).collect();
                Flags::resolve(&flags)
            }
        })
    }
}

impl Serialize for Flags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let name = match (self.field(), self.log()) {
            (false, false) => FlagName::Disabled,
            (true, false) => FlagName::Field,
            (false, true) => FlagName::Log,
            (true, true) => FlagName::All,
        };
        name.serialize(serializer)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn empty_list_means_field_and_log() {
        assert_eq!(Flags::resolve(&[]), Flags::ALL);
    }

    #[test]
    fn disabled_wins() {
        assert_eq!(
            Flags::resolve(&[Flags::FIELD, Flags::DISABLED, Flags::LOG]),
            Flags::DISABLED
        );
    }

    #[test]
    fn entries_are_combined() {
        let flags = Flags::resolve(&[Flags::FIELD, Flags::LOG]);
        assert!(flags.field());
        assert!(flags.log());
        assert!(!Flags::FIELD.log());
        assert!(!Flags::DISABLED.contains(Flags::DISABLED));
    }

    #[test]
    fn deserializes_names_and_lists() {
        let one: Flags = serde_json::from_str("\"log\"").unwrap();
        assert_eq!(one, Flags::LOG);
        let many: Flags = serde_json::from_str("[\"field\", \"log\"]").unwrap();
        assert_eq!(many, Flags::ALL);
        let none: Flags = serde_json::from_str("[]").unwrap();
        assert_eq!(none, Flags::ALL);
        assert_eq!(serde_json::to_string(&Flags::FIELD).unwrap(), "\"field\"");
    }
}
