/// Index of a node in the tree. Stable for the lifetime of the tree, whatever happens to node heights.
pub type NodeId = usize;

/// Read access to a rooted, strictly bifurcating tree whose nodes carry heights (time before the present).
///
/// Node ids are dense: `0..node_count()`.
pub trait TreeView {
  fn node_count(&self) -> usize;

  fn external_node_count(&self) -> usize;

  fn internal_node_count(&self) -> usize {
    self.node_count().saturating_sub(self.external_node_count())
  }

  fn node_height(&self, node: NodeId) -> f64;

  fn is_external(&self, node: NodeId) -> bool;

  fn parent(&self, node: NodeId) -> Option<NodeId>;

  fn is_root(&self, node: NodeId) -> bool {
    self.parent(node).is_none()
  }
}
