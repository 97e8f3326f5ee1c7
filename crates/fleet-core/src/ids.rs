//! Strongly typed driver identifier.
//!
//! `DriverId` is `Copy + Ord + Hash` so it can be used as a map key and
//! sorted without ceremony.  Ids are assigned sequentially at generation and
//! never reused, so the inner integer doubles as the generation order.

use std::fmt;

/// Stable identifier of one simulated driver.  Max ~4.3 billion drivers.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DriverId(pub u32);

impl DriverId {
    /// Sentinel meaning "no valid ID", equal to `u32::MAX`.
    pub const INVALID: DriverId = DriverId(u32::MAX);

    /// Cast to `usize`.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for DriverId {
    /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
    #[inline(always)]
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DriverId({})", self.0)
    }
}

impl From<DriverId> for usize {
    #[inline(always)]
    fn from(id: DriverId) -> usize {
        id.0 as usize
    }
}

impl TryFrom<usize> for DriverId {
    type Error = std::num::TryFromIntError;
    fn try_from(n: usize) -> Result<DriverId, Self::Error> {
        u32::try_from(n).map(DriverId)
    }
}
