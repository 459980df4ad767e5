use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Kind of event that ends an interval.
///
/// Variant order is meaningful: at equal times sample events sort before coalescent events.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "camelCase")]
pub enum IntervalType {
  /// A lineage enters at a tip.
  #[strum(serialize = "sample")]
  Sample,

  /// Two lineages merge at an internal node.
  #[strum(serialize = "coalescent")]
  Coalescent,
}

impl IntervalType {
  #[inline]
  pub const fn from_is_external(is_external: bool) -> Self {
    if is_external {
      Self::Sample
    } else {
      Self::Coalescent
    }
  }

  /// Change in the number of extant lineages caused by an event of this type.
  #[inline]
  pub const fn lineage_delta(self) -> isize {
    match self {
      Self::Sample => 1,
      Self::Coalescent => -1,
    }
  }
}
