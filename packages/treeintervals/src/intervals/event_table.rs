use crate::intervals::interval_type::IntervalType;
use crate::tree::tree_view::NodeId;
use crate::utils::error::{check_capacity, check_index};
use crate::utils::float_fmt::float_to_significant_digits;
use crate::{make_error, make_internal_error};
use eyre::Report;
use getset::CopyGetters;
use itertools::Itertools;
use log::trace;
use rayon::slice::ParallelSliceMut;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Interval length stored for the earliest event, which has no predecessor.
pub const NO_INTERVAL: f64 = -1.0;

/// One row of the event table.
#[derive(Copy, Clone, Debug, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Event {
  time: f64,
  kind: IntervalType,
  node: NodeId,
  interval: f64,
  lineage_count: isize,
}

/// Sample and coalescent events of a binary tree, one per node, sorted by time.
///
/// Rows are stored as parallel arrays of fixed length, together with the reverse `node -> position` index. After a
/// rebuild, and after any complete batch of moves of a valid tree, the table satisfies:
///  - the event at position 0 is a sample event
///  - times never decrease
///  - `lineage_count[0] == 1` and every later count differs from the previous one by the lineage delta of its type
///  - `positions[nodes[p]] == p` for every position `p`
///
/// In the middle of a batch a coalescent event may sit at position 0, with the lineage counts shifted accordingly.
///
/// Lineage counts are the number of lineages extant right after the event, i.e. during the interval that starts at it.
#[derive(Clone, Debug, PartialEq)]
pub struct EventTable {
  times: Vec<f64>,
  types: Vec<IntervalType>,
  nodes: Vec<NodeId>,
  intervals: Vec<f64>,
  lineage_counts: Vec<isize>,
  positions: Vec<usize>,
}

impl EventTable {
  /// Allocates a table for a tree of `node_count` nodes. Contents are meaningless until the first rebuild.
  pub fn new(node_count: usize) -> Result<Self, Report> {
    if node_count == 0 {
      return make_error!("When creating event table: a tree must have at least one node");
    }
    Ok(Self {
      times: vec![0.0; node_count],
      types: vec![IntervalType::Sample; node_count],
      nodes: (0..node_count).collect(),
      intervals: vec![NO_INTERVAL; node_count],
      lineage_counts: vec![0; node_count],
      positions: (0..node_count).collect(),
    })
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  #[inline]
  pub fn time(&self, position: usize) -> f64 {
    self.times[position]
  }

  #[inline]
  pub fn event_type(&self, position: usize) -> IntervalType {
    self.types[position]
  }

  #[inline]
  pub fn node(&self, position: usize) -> NodeId {
    self.nodes[position]
  }

  #[inline]
  pub fn interval(&self, position: usize) -> f64 {
    self.intervals[position]
  }

  #[inline]
  pub fn lineage_count(&self, position: usize) -> isize {
    self.lineage_counts[position]
  }

  #[inline]
  pub fn position_of(&self, node: NodeId) -> usize {
    self.positions[node]
  }

  pub fn event(&self, position: usize) -> Event {
    Event {
      time: self.times[position],
      kind: self.types[position],
      node: self.nodes[position],
      interval: self.intervals[position],
      lineage_count: self.lineage_counts[position],
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
    (0..self.len()).map(|position| self.event(position))
  }

  /// Sorts all nodes by height and recomputes every row and the whole index.
  ///
  /// Ties are broken by event type (samples first), then by node id, so the resulting order is total and the same
  /// whether or not the sort runs in parallel. Nothing is modified when an error is returned.
  pub fn rebuild_from(
    &mut self,
    heights: &[f64],
    is_external: &[bool],
    parallel_sort_threshold: usize,
  ) -> Result<(), Report> {
    let node_count = self.len();
    check_capacity("When rebuilding event table", "node heights", node_count, heights.len())?;
    check_capacity("When rebuilding event table", "external node flags", node_count, is_external.len())?;

    if let Some((node, height)) = heights.iter().find_position(|height| !height.is_finite()) {
      return make_error!("When rebuilding event table: height of node {node} must be a finite number, but found {height}");
    }

    let compare = |&a: &NodeId, &b: &NodeId| -> Ordering {
      heights[a]
        .total_cmp(&heights[b])
        .then_with(|| IntervalType::from_is_external(is_external[a]).cmp(&IntervalType::from_is_external(is_external[b])))
        .then_with(|| a.cmp(&b))
    };

    let mut order = (0..node_count).collect_vec();
    if node_count >= parallel_sort_threshold {
      order.par_sort_unstable_by(compare);
    } else {
      order.sort_unstable_by(compare);
    }

    let first = order[0];
    if !is_external[first] {
      return make_error!(
        "When rebuilding event table: the earliest event belongs to internal node {first} at height {}, \
         but the lowest node of a tree must be a tip",
        heights[first]
      );
    }

    let mut lineages: isize = 0;
    for (position, &node) in order.iter().enumerate() {
      let kind = IntervalType::from_is_external(is_external[node]);
      lineages += kind.lineage_delta();
      self.times[position] = heights[node];
      self.types[position] = kind;
      self.nodes[position] = node;
      self.lineage_counts[position] = lineages;
      self.positions[node] = position;
      self.refresh_interval(position);
    }

    Ok(())
  }

  /// Overwrites every event time with the current height of its node, keeping the order of events.
  ///
  /// The table is only consistent afterwards if the heights are still sorted in the current event order.
  pub fn refresh_times(&mut self, height_of: impl Fn(NodeId) -> f64) {
    for position in 0..self.len() {
      self.times[position] = height_of(self.nodes[position]);
      self.refresh_interval(position);
    }
  }

  /// Moves the event of a single node whose height has changed to its new place in the time order.
  ///
  /// The new position is found by binary search in the part of the table the event moves into. Lineage counts of the
  /// events it overtakes are shifted by one, and only the interval lengths next to its old and new positions are
  /// recomputed. Nothing is modified when an error is returned.
  ///
  /// A coalescent event may end up first. This is expected halfway through a batch of moves, when the table mixes new
  /// and old heights, so the caller checks the earliest event once the whole batch is applied.
  pub fn update_for_changed_node(&mut self, node: NodeId, new_time: f64) -> Result<(), Report> {
    let node_count = self.len();
    check_index("When updating event table", "node", node, node_count)?;
    if !new_time.is_finite() {
      return make_error!("When updating event table: new height of node {node} must be a finite number, but found {new_time}");
    }

    let old_position = self.positions[node];
    if self.nodes[old_position] != node {
      return make_internal_error!(
        "When updating event table: node index is out of sync: node {node} is indexed at position {old_position}, \
         but the event there belongs to node {}",
        self.nodes[old_position]
      );
    }

    let old_time = self.times[old_position];
    let new_position = match new_time.partial_cmp(&old_time) {
      Some(Ordering::Greater) => self.first_greater(new_time, old_position, node_count) - 1,
      Some(Ordering::Less) => self.first_greater(new_time, 0, old_position),
      _ => old_position,
    };

    trace!("Moving node {node} from position {old_position} (height {old_time}) to position {new_position} (height {new_time})");

    if new_position != old_position {
      self.relocate(old_position, new_position);
    }

    self.times[new_position] = new_time;
    for position in [old_position, old_position + 1, new_position, new_position + 1] {
      if position < node_count {
        self.refresh_interval(position);
      }
    }

    for position in old_position.min(new_position)..=old_position.max(new_position) {
      self.positions[self.nodes[position]] = position;
    }

    Ok(())
  }

  /// Deep copy of all rows and of the index from a table of the same size.
  pub fn copy_events(&mut self, source: &EventTable) -> Result<(), Report> {
    check_capacity("When copying event table", "events", self.len(), source.len())?;
    self.times.copy_from_slice(&source.times);
    self.types.copy_from_slice(&source.types);
    self.nodes.copy_from_slice(&source.nodes);
    self.intervals.copy_from_slice(&source.intervals);
    self.lineage_counts.copy_from_slice(&source.lineage_counts);
    self.positions.copy_from_slice(&source.positions);
    Ok(())
  }

  /// Checks every table invariant.
  pub fn validate(&self) -> Result<(), Report> {
    if self.types[0] != IntervalType::Sample {
      return make_internal_error!("Event table is invalid: the earliest event (node {}) is not a sample", self.nodes[0]);
    }

    if self.lineage_counts[0] != 1 {
      return make_internal_error!(
        "Event table is invalid: lineage count after the earliest event must be 1, but found {}",
        self.lineage_counts[0]
      );
    }

    if self.intervals[0].to_bits() != NO_INTERVAL.to_bits() {
      return make_internal_error!(
        "Event table is invalid: the earliest event must not have an interval, but found {}",
        self.intervals[0]
      );
    }

    for position in 1..self.len() {
      let (previous, current) = (self.event(position - 1), self.event(position));
      if current.time < previous.time {
        return make_internal_error!(
          "Event table is invalid: event {position} (node {}, height {}) is earlier than its predecessor (node {}, height {})",
          current.node,
          current.time,
          previous.node,
          previous.time
        );
      }

      let expected_count = previous.lineage_count + current.kind.lineage_delta();
      if current.lineage_count != expected_count {
        return make_internal_error!(
          "Event table is invalid: lineage count at event {position} (node {}) is {}, but {expected_count} is expected",
          current.node,
          current.lineage_count
        );
      }

      let expected_interval = current.time - previous.time;
      if current.interval.to_bits() != expected_interval.to_bits() {
        return make_internal_error!(
          "Event table is invalid: interval ending at event {position} (node {}) is {}, but {expected_interval} is expected",
          current.node,
          current.interval
        );
      }
    }

    for (position, &node) in self.nodes.iter().enumerate() {
      if node >= self.len() || self.positions[node] != position {
        return make_internal_error!("Event table is invalid: node index does not point back to event {position} (node {node})");
      }
    }

    Ok(())
  }

  /// First position in `[start, end)` whose time is strictly greater than `value`, or `end` if there is none.
  /// The range must be sorted.
  fn first_greater(&self, value: f64, start: usize, end: usize) -> usize {
    start + self.times[start..end].partition_point(|&time| time <= value)
  }

  /// Moves the row at `from` to `to`, shifting the rows in between by one slot, and repairs lineage counts.
  /// Times, intervals and the index are left to the caller.
  fn relocate(&mut self, from: usize, to: usize) {
    let node = self.nodes[from];
    let kind = self.types[from];
    let delta = kind.lineage_delta();

    if to > from {
      let block = from + 1..=to;
      self.times.copy_within(block.clone(), from);
      self.types.copy_within(block.clone(), from);
      self.nodes.copy_within(block.clone(), from);
      self.intervals.copy_within(block.clone(), from);
      self.lineage_counts.copy_within(block, from);
      // overtaken events no longer have the moved event before them
      for count in &mut self.lineage_counts[from..to] {
        *count -= delta;
      }
    } else {
      let block = to..from;
      self.times.copy_within(block.clone(), to + 1);
      self.types.copy_within(block.clone(), to + 1);
      self.nodes.copy_within(block.clone(), to + 1);
      self.intervals.copy_within(block.clone(), to + 1);
      self.lineage_counts.copy_within(block, to + 1);
      for count in &mut self.lineage_counts[to + 1..=from] {
        *count += delta;
      }
    }

    self.nodes[to] = node;
    self.types[to] = kind;
    self.lineage_counts[to] = if to == 0 { delta } else { self.lineage_counts[to - 1] + delta };
  }

  #[inline]
  fn refresh_interval(&mut self, position: usize) {
    self.intervals[position] = if position == 0 {
      NO_INTERVAL
    } else {
      self.times[position] - self.times[position - 1]
    };
  }
}

impl Display for EventTable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    writeln!(f, "{:>8} {:>8} {:>10} {:>12} {:>12} {:>8}", "position", "node", "type", "time", "interval", "lineages")?;
    for (position, event) in self.iter().enumerate() {
      writeln!(
        f,
        "{position:>8} {:>8} {:>10} {:>12} {:>12} {:>8}",
        event.node,
        event.kind.to_string(),
        float_to_significant_digits(event.time, 6),
        float_to_significant_digits(event.interval, 6),
        event.lineage_count
      )?;
    }
    Ok(())
  }
}
