use crate::tree::tree_change::TreeChange;
use crate::tree::tree_view::NodeId;
use log::warn;

/// Recomputation owed to the event table since it was last brought up to date.
///
/// Variants are ordered by cost. Absorbing a change never moves to a cheaper variant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PendingUpdate {
  /// Event table matches the tree.
  #[default]
  Clean,

  /// Heights of these nodes changed, in this order. Each is moved to its new place on its own.
  NeedsIncrementalPatch(Vec<NodeId>),

  /// Heights changed without changing the order of nodes. Only times and interval lengths are refreshed.
  NeedsTimesRefresh,

  /// Nothing can be assumed about the table. It is sorted again from scratch.
  NeedsFullRebuild,
}

impl PendingUpdate {
  #[inline]
  pub fn is_clean(&self) -> bool {
    matches!(self, Self::Clean)
  }

  /// Folds a change notification into the pending state.
  ///
  /// Per-node patches and order-preserving refreshes cannot be combined: a refresh keeps the current event order, but
  /// the patched nodes may no longer fit into it. Mixing them escalates to a full rebuild. Letting the refresh
  /// supersede the pending nodes would be cheaper, but breaks the time order of the events.
  pub fn absorb(&mut self, change: &TreeChange) {
    *self = match (std::mem::take(self), change) {
      (_, TreeChange::TopologyChanged) | (Self::NeedsFullRebuild, _) => Self::NeedsFullRebuild,
      (Self::Clean | Self::NeedsTimesRefresh, TreeChange::OrderPreserved) => Self::NeedsTimesRefresh,
      (Self::Clean, TreeChange::NodeHeightChanged(node)) => Self::NeedsIncrementalPatch(vec![*node]),
      (Self::NeedsIncrementalPatch(mut nodes), TreeChange::NodeHeightChanged(node)) => {
        nodes.push(*node);
        Self::NeedsIncrementalPatch(nodes)
      }
      (Self::NeedsIncrementalPatch(nodes), TreeChange::OrderPreserved) => {
        warn!(
          "Order-preserving tree change received while {} node height changes are pending. Falling back to a full rebuild of the intervals.",
          nodes.len()
        );
        Self::NeedsFullRebuild
      }
      (Self::NeedsTimesRefresh, TreeChange::NodeHeightChanged(node)) => {
        warn!(
          "Height of node {node} changed while an order-preserving refresh is pending. Falling back to a full rebuild of the intervals."
        );
        Self::NeedsFullRebuild
      }
    };
  }
}
