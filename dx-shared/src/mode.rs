//! This module contains the [`Mode`] enum.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The arrangement that the tree particles are moving towards.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Mode {
    /// The particles form the tree.
    #[default]
    Assembled,

    /// The particles are spread over a large sphere around the tree.
    Exploded,
}

impl Mode {
    /// Return the other mode.
    #[inline]
    pub fn toggled(self) -> Self {
        match self {
            Self::Assembled => Self::Exploded,
            Self::Exploded => Self::Assembled,
        }
    }

    /// Is this [`Mode::Exploded`]?
    #[inline]
    pub fn is_exploded(self) -> bool {
        self == Self::Exploded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn toggling_twice_is_identity() {
        for mode in Mode::iter() {
            assert_ne!(mode.toggled(), mode);
            assert_eq!(mode.toggled().toggled(), mode);
        }
    }

    #[test]
    fn default_is_assembled() {
        assert_eq!(Mode::default(), Mode::Assembled);
        assert!(!Mode::default().is_exploded());
    }
}
