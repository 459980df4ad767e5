use crate::{make_error, make_internal_report};
use crate::tree::simple_tree::SimpleTree;
use crate::tree::tree_view::{NodeId, TreeView};
use crate::utils::random::{random_choice, random_swap_remove};
use eyre::Report;
use rand::Rng;

/// Builds a random tree by repeatedly joining two randomly chosen extant lineages.
///
/// Tips get ids `0..leaf_count` and heights drawn uniformly from `[0, tip_height_spread)`. Internal nodes are numbered
/// in creation order, so the root is the last node. Every internal node is strictly higher than both of its children.
pub fn random_binary_tree(leaf_count: usize, tip_height_spread: f64, rng: &mut impl Rng) -> Result<SimpleTree, Report> {
  if leaf_count == 0 {
    return make_error!("When generating a random tree: at least one tip is required");
  }

  let node_count = 2 * leaf_count - 1;
  let mut parents = vec![None; node_count];
  let mut heights = vec![0.0; node_count];

  if tip_height_spread > 0.0 {
    for height in &mut heights[..leaf_count] {
      *height = rng.gen_range(0.0..tip_height_spread);
    }
  }

  let mut extant: Vec<NodeId> = (0..leaf_count).collect();
  for node in leaf_count..node_count {
    let left = random_swap_remove(&mut extant, rng).ok_or_else(|| make_internal_report!("No lineages left to join"))?;
    let right = random_swap_remove(&mut extant, rng).ok_or_else(|| make_internal_report!("No lineages left to join"))?;
    heights[node] = heights[left].max(heights[right]) + rng.gen_range(0.01..1.0);
    parents[left] = Some(node);
    parents[right] = Some(node);
    extant.push(node);
  }

  SimpleTree::new(parents, heights)
}

/// Picks a random node and a new height for it which keeps it above its children and below its parent.
pub fn random_height_perturbation(tree: &SimpleTree, rng: &mut impl Rng) -> Result<(NodeId, f64), Report> {
  let node = random_choice(0..tree.node_count(), rng)?;
  let lower = tree.child_heights(node).fold(0.0, f64::max);
  let upper = match tree.parent(node) {
    Some(parent) => tree.node_height(parent),
    None => lower + 1.0,
  };
  if lower >= upper {
    return Ok((node, tree.node_height(node)));
  }
  Ok((node, rng.gen_range(lower..upper)))
}
