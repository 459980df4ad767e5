use crate::tree::tree_view::NodeId;
use serde::{Deserialize, Serialize};

/// Notification fired by a tree after it has been mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeChange {
  /// Height of a single node has changed. Topology is intact.
  NodeHeightChanged(NodeId),

  /// Heights have changed in a way that keeps the relative order of all nodes, e.g. a uniform rescaling.
  OrderPreserved,

  /// Topology, or everything at once, has been replaced.
  TopologyChanged,
}

/// Receiver of tree change notifications.
pub trait TreeChangeListener {
  fn handle_tree_changed(&mut self, change: &TreeChange);
}
