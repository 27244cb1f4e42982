//! Target device selection.
//!
//! The watch is either known up front by address or discovered from its
//! Complete Local Name. Once an address is fixed it never changes.

use crate::mac_address::MacAddress;

/// Name prefix advertised by the watches this tool understands.
pub const DEVICE_NAME_PREFIX: &str = "Polar Vantage";

/// Which device is being monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetSelector {
    /// No target yet; waiting for a matching name advertisement.
    #[default]
    Unresolved,
    /// Target address, either supplied by the user or discovered.
    Fixed(MacAddress),
}

impl TargetSelector {
    pub fn new(mac: Option<MacAddress>) -> Self {
        mac.map_or(TargetSelector::Unresolved, TargetSelector::Fixed)
    }

    pub fn target(&self) -> Option<MacAddress> {
        match self {
            TargetSelector::Unresolved => None,
            TargetSelector::Fixed(mac) => Some(*mac),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TargetSelector::Fixed(_))
    }

    /// Whether events from `mac` may be looked at at all.
    ///
    /// Everything is a candidate while unresolved; afterwards only the target is.
    pub fn accepts(&self, mac: MacAddress) -> bool {
        match self {
            TargetSelector::Unresolved => true,
            TargetSelector::Fixed(target) => *target == mac,
        }
    }

    /// Fix the target to `mac` if it is not fixed yet.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn resolve(&mut self, mac: MacAddress) -> bool {
        match self {
            TargetSelector::Unresolved => {
                *self = TargetSelector::Fixed(mac);
                true
            }
            TargetSelector::Fixed(_) => false,
        }
    }
}

/// Whether an advertised name belongs to a supported watch.
pub fn is_target_name(name: &str) -> bool {
    name.starts_with(DEVICE_NAME_PREFIX)
}
