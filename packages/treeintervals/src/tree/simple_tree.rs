use crate::make_error;
use crate::tree::tree_change::TreeChange;
use crate::tree::tree_view::{NodeId, TreeView};
use crate::utils::error::{check_capacity, check_index};
use eyre::{Report, WrapErr};
use getset::{CopyGetters, Getters};
use itertools::Itertools;

/// Strictly bifurcating rooted tree stored as a parent array plus node heights.
///
/// Every mutating method returns the [`TreeChange`] that listeners of this tree must receive.
#[derive(Clone, Debug, PartialEq, Getters, CopyGetters)]
pub struct SimpleTree {
  parents: Vec<Option<NodeId>>,

  #[getset(get = "pub")]
  heights: Vec<f64>,

  children: Vec<Vec<NodeId>>,

  #[getset(get_copy = "pub")]
  root: NodeId,

  external_count: usize,
}

impl SimpleTree {
  pub fn new(parents: Vec<Option<NodeId>>, heights: Vec<f64>) -> Result<Self, Report> {
    let Topology {
      children,
      root,
      external_count,
    } = Topology::from_parents(&parents, &heights).wrap_err("When creating a tree")?;

    Ok(Self {
      parents,
      heights,
      children,
      root,
      external_count,
    })
  }

  pub fn children(&self, node: NodeId) -> &[NodeId] {
    &self.children[node]
  }

  /// Heights of the nodes directly below `node`. Empty for tips.
  pub fn child_heights(&self, node: NodeId) -> impl Iterator<Item = f64> + '_ {
    self.children[node].iter().map(|&child| self.heights[child])
  }

  pub fn set_node_height(&mut self, node: NodeId, height: f64) -> Result<TreeChange, Report> {
    check_index("When setting node height", "node", node, self.node_count())?;
    if !height.is_finite() {
      return make_error!("When setting height of node {node}: height must be a finite number, but found {height}");
    }
    self.heights[node] = height;
    Ok(TreeChange::NodeHeightChanged(node))
  }

  /// Multiplies all heights by a positive factor. Relative order of the nodes is kept.
  pub fn scale_heights(&mut self, factor: f64) -> Result<TreeChange, Report> {
    if !(factor.is_finite() && factor > 0.0) {
      return make_error!("When scaling tree heights: scale factor must be a positive finite number, but found {factor}");
    }
    self.heights.iter_mut().for_each(|height| *height *= factor);
    Ok(TreeChange::OrderPreserved)
  }

  /// Replaces topology and heights at once. The number of nodes must stay the same.
  pub fn replace_topology(&mut self, parents: Vec<Option<NodeId>>, heights: Vec<f64>) -> Result<TreeChange, Report> {
    check_capacity("When replacing tree topology", "nodes", self.node_count(), parents.len())?;
    let Topology {
      children,
      root,
      external_count,
    } = Topology::from_parents(&parents, &heights).wrap_err("When replacing tree topology")?;

    self.parents = parents;
    self.heights = heights;
    self.children = children;
    self.root = root;
    self.external_count = external_count;
    Ok(TreeChange::TopologyChanged)
  }
}

impl TreeView for SimpleTree {
  fn node_count(&self) -> usize {
    self.parents.len()
  }

  fn external_node_count(&self) -> usize {
    self.external_count
  }

  fn node_height(&self, node: NodeId) -> f64 {
    self.heights[node]
  }

  fn is_external(&self, node: NodeId) -> bool {
    self.children[node].is_empty()
  }

  fn parent(&self, node: NodeId) -> Option<NodeId> {
    self.parents[node]
  }
}

struct Topology {
  children: Vec<Vec<NodeId>>,
  root: NodeId,
  external_count: usize,
}

impl Topology {
  fn from_parents(parents: &[Option<NodeId>], heights: &[f64]) -> Result<Self, Report> {
    let node_count = parents.len();
    check_capacity("When reading node heights", "heights", node_count, heights.len())?;
    if node_count == 0 {
      return make_error!("A tree must contain at least one node");
    }

    if let Some((node, height)) = heights.iter().find_position(|height| !height.is_finite()) {
      return make_error!("Height of node {node} must be a finite number, but found {height}");
    }

    let mut children = vec![vec![]; node_count];
    let mut roots = vec![];
    for (node, parent) in parents.iter().enumerate() {
      match *parent {
        None => roots.push(node),
        Some(parent) if parent >= node_count => {
          return make_error!("Parent {parent} of node {node} is out of range (there are {node_count} nodes)");
        }
        Some(parent) if parent == node => {
          return make_error!("Node {node} is its own parent");
        }
        Some(parent) => children[parent].push(node),
      }
    }

    let root = match roots.as_slice() {
      [root] => *root,
      [] => return make_error!("Tree has no root: every node has a parent"),
      _ => return make_error!("Tree has {} roots, but exactly one is expected: {}", roots.len(), roots.iter().join(", ")),
    };

    if let Some((node, node_children)) = children.iter().find_position(|c| !(c.is_empty() || c.len() == 2)) {
      return make_error!(
        "Tree is not strictly bifurcating: node {node} has {} children, but 0 or 2 are expected",
        node_children.len()
      );
    }

    let reachable = count_reachable(root, &children);
    if reachable != node_count {
      return make_error!("Only {reachable} of {node_count} nodes are reachable from root {root}: the tree contains a cycle");
    }

    let external_count = children.iter().filter(|c| c.is_empty()).count();

    Ok(Self {
      children,
      root,
      external_count,
    })
  }
}

fn count_reachable(root: NodeId, children: &[Vec<NodeId>]) -> usize {
  let mut stack = vec![root];
  let mut count = 0;
  while let Some(node) = stack.pop() {
    count += 1;
    stack.extend(children[node].iter().copied());
  }
  count
}
