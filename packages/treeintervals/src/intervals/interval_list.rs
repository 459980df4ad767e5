use crate::intervals::change_tracking::first_changed_interval;
use crate::intervals::event_table::EventTable;
use crate::intervals::interval_type::IntervalType;
use crate::intervals::intervals_options::IntervalsOptions;
use crate::intervals::pending_update::PendingUpdate;
use crate::intervals::units::Units;
use crate::tree::tree_change::{TreeChange, TreeChangeListener};
use crate::tree::tree_view::{NodeId, TreeView};
use crate::utils::error::check_index;
use crate::{make_error, make_internal_report};
use eyre::{Report, WrapErr};
use getset::{CopyGetters, Getters, Setters};
use itertools::Itertools;
use log::{debug, trace};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TransactionPhase {
  Idle,
  Stored,
}

/// Coalescent intervals of a tree, kept up to date lazily and incrementally as the tree changes.
///
/// The tree reports its mutations through [`TreeChangeListener::handle_tree_changed`]. Nothing is recomputed until
/// the next query, which then applies the single cheapest strategy that is still valid: nothing, an in-place move of
/// each changed node, a refresh of all times, or a full sort.
///
/// Interval `i` spans from event `i` to event `i + 1`, so there are `node_count - 1` intervals.
///
/// For MCMC use, bracket each proposal with [`IntervalList::store_state`] and then either
/// [`IntervalList::accept_state`] or [`IntervalList::restore_state`].
#[derive(Debug, Getters, CopyGetters, Setters)]
pub struct IntervalList<T: TreeView> {
  #[getset(get = "pub")]
  tree: T,

  #[getset(get = "pub")]
  options: IntervalsOptions,

  #[getset(get_copy = "pub", set = "pub")]
  units: Units,

  events: EventTable,
  stored_events: EventTable,
  snapshot_events: EventTable,

  pending: PendingUpdate,
  stored_pending: PendingUpdate,

  phase: TransactionPhase,
}

impl<T: TreeView> IntervalList<T> {
  pub fn new(tree: T, options: IntervalsOptions) -> Result<Self, Report> {
    let node_count = tree.node_count();
    let events = EventTable::new(node_count).wrap_err("When creating interval list")?;

    let mut intervals = Self {
      tree,
      units: options.units,
      options,
      stored_events: events.clone(),
      snapshot_events: events.clone(),
      events,
      pending: PendingUpdate::NeedsFullRebuild,
      stored_pending: PendingUpdate::Clean,
      phase: TransactionPhase::Idle,
    };
    intervals.calculate_intervals()?;
    Ok(intervals)
  }

  /// Mutable access to the tree. Every mutation must be followed by the matching
  /// [`TreeChangeListener::handle_tree_changed`] call, otherwise queries keep returning stale intervals.
  pub fn tree_mut(&mut self) -> &mut T {
    &mut self.tree
  }

  pub fn into_tree(self) -> T {
    self.tree
  }

  /// Whether the event table currently reflects the tree.
  pub fn intervals_known(&self) -> bool {
    self.pending.is_clean()
  }

  /// Forces a full rebuild on the next query.
  pub fn make_dirty(&mut self) {
    self.pending = PendingUpdate::NeedsFullRebuild;
  }

  /// Applies the pending recomputation, if any.
  ///
  /// On failure the list falls back to a full rebuild, to be attempted again on the next query.
  pub fn calculate_intervals(&mut self) -> Result<(), Report> {
    if self.pending.is_clean() {
      return Ok(());
    }

    let pending = std::mem::take(&mut self.pending);
    let result = self.apply(pending).and_then(|()| {
      if self.options.validate {
        self.events.validate().wrap_err("When validating intervals after recomputation")
      } else {
        Ok(())
      }
    });

    if result.is_err() {
      self.pending = PendingUpdate::NeedsFullRebuild;
    }
    result
  }

  /// Same as [`IntervalList::calculate_intervals`], and also reports the earliest interval whose duration or ending
  /// node has changed since the previous recomputation. `None` means nothing has changed.
  pub fn recalculate_tracked(&mut self) -> Result<Option<usize>, Report> {
    if self.pending.is_clean() {
      return Ok(None);
    }
    self.snapshot_events.copy_events(&self.events)?;
    self.calculate_intervals()?;
    Ok(first_changed_interval(&self.snapshot_events, &self.events))
  }

  /// Up-to-date event table.
  pub fn events(&mut self) -> Result<&EventTable, Report> {
    self.calculate_intervals()?;
    Ok(&self.events)
  }

  pub fn interval_count(&mut self) -> Result<usize, Report> {
    Ok(self.events()?.len() - 1)
  }

  /// Number of tips in the tree.
  pub fn sample_count(&self) -> usize {
    self.tree.external_node_count()
  }

  /// Height of the earliest event.
  pub fn start_time(&mut self) -> Result<f64, Report> {
    Ok(self.events()?.time(0))
  }

  pub fn interval_duration(&mut self, interval: usize) -> Result<f64, Report> {
    Ok(self.interval_events(interval)?.interval(interval + 1))
  }

  /// Height of the event at which the interval starts.
  pub fn interval_start_time(&mut self, interval: usize) -> Result<f64, Report> {
    Ok(self.interval_events(interval)?.time(interval))
  }

  /// Number of lineages extant during the interval.
  pub fn lineage_count(&mut self, interval: usize) -> Result<usize, Report> {
    let count = self.interval_events(interval)?.lineage_count(interval);
    usize::try_from(count).map_err(|_| {
      make_internal_report!("Lineage count of interval {interval} is negative ({count}): the tree is not time-consistent")
    })
  }

  /// Number of coalescent events at the end of the interval: 1 for coalescent intervals, 0 for sample intervals.
  pub fn coalescent_event_count(&mut self, interval: usize) -> Result<usize, Report> {
    Ok(match self.interval_type(interval)? {
      IntervalType::Coalescent => 1,
      IntervalType::Sample => 0,
    })
  }

  /// Type of the event that ends the interval.
  pub fn interval_type(&mut self, interval: usize) -> Result<IntervalType, Report> {
    Ok(self.interval_events(interval)?.event_type(interval + 1))
  }

  /// Height of the latest event, i.e. of the root.
  pub fn total_duration(&mut self) -> Result<f64, Report> {
    let events = self.events()?;
    Ok(events.time(events.len() - 1))
  }

  /// Intervals bordered by the node's event: the one ending at it and the one starting at it.
  /// The earliest and the latest event border only one interval each.
  pub fn node_to_intervals(&mut self, node: NodeId) -> Result<Vec<usize>, Report> {
    let events = self.events()?;
    check_index("When looking up intervals of a node", "node", node, events.len())?;
    let position = events.position_of(node);
    let ending = position.checked_sub(1);
    let starting = (position + 1 < events.len()).then_some(position);
    Ok(ending.into_iter().chain(starting).collect_vec())
  }

  /// Nodes at the start and at the end of the interval.
  pub fn interval_to_nodes(&mut self, interval: usize) -> Result<[NodeId; 2], Report> {
    let events = self.interval_events(interval)?;
    Ok([events.node(interval), events.node(interval + 1)])
  }

  /// Node whose coalescence ends the interval. Fails for sample intervals.
  pub fn coalescent_node(&mut self, interval: usize) -> Result<NodeId, Report> {
    self.ending_node_of_type(interval, IntervalType::Coalescent)
  }

  /// Tip whose sampling ends the interval. Fails for coalescent intervals.
  pub fn sampling_node(&mut self, interval: usize) -> Result<NodeId, Report> {
    self.ending_node_of_type(interval, IntervalType::Sample)
  }

  /// Durations of all coalescent intervals, earliest first.
  pub fn coalescent_intervals(&mut self) -> Result<Vec<f64>, Report> {
    let events = self.events()?;
    Ok(
      (1..events.len())
        .filter(|&position| events.event_type(position) == IntervalType::Coalescent)
        .map(|position| events.interval(position))
        .collect_vec(),
    )
  }

  /// Every internal node joins exactly two lineages.
  pub fn is_binary_coalescent(&self) -> bool {
    true
  }

  /// Events are only ever samples and coalescences.
  pub fn is_coalescent_only(&self) -> bool {
    true
  }

  /// Saves the event table and the pending recomputation, before a proposal is made.
  pub fn store_state(&mut self) -> Result<(), Report> {
    if self.phase == TransactionPhase::Stored {
      return make_error!("When storing interval state: state is already stored. Call accept_state() or restore_state() first");
    }
    self.stored_events.copy_events(&self.events)?;
    self.stored_pending.clone_from(&self.pending);
    self.phase = TransactionPhase::Stored;
    Ok(())
  }

  /// Rolls back everything that happened since the last [`IntervalList::store_state`], when a proposal is rejected.
  ///
  /// The tree itself must be restored by its owner. No change notification is needed for that.
  pub fn restore_state(&mut self) -> Result<(), Report> {
    if self.phase != TransactionPhase::Stored {
      return make_error!("When restoring interval state: there is no stored state. Call store_state() first");
    }
    self.events.copy_events(&self.stored_events)?;
    std::mem::swap(&mut self.pending, &mut self.stored_pending);
    self.phase = TransactionPhase::Idle;
    Ok(())
  }

  /// Keeps the current state, when a proposal is accepted.
  pub fn accept_state(&mut self) -> Result<(), Report> {
    if self.phase != TransactionPhase::Stored {
      return make_error!("When accepting interval state: there is no stored state. Call store_state() first");
    }
    self.phase = TransactionPhase::Idle;
    Ok(())
  }

  fn apply(&mut self, pending: PendingUpdate) -> Result<(), Report> {
    match pending {
      PendingUpdate::Clean => Ok(()),
      PendingUpdate::NeedsFullRebuild => {
        debug!("Rebuilding intervals of {} nodes from scratch", self.tree.node_count());
        let node_count = self.tree.node_count();
        let heights = (0..node_count).map(|node| self.tree.node_height(node)).collect_vec();
        let is_external = (0..node_count).map(|node| self.tree.is_external(node)).collect_vec();
        self
          .events
          .rebuild_from(&heights, &is_external, self.options.parallel_sort_threshold)
          .wrap_err("When rebuilding intervals")
      }
      PendingUpdate::NeedsTimesRefresh => {
        debug!("Refreshing times of {} events", self.events.len());
        let tree = &self.tree;
        self.events.refresh_times(|node| tree.node_height(node));
        Ok(())
      }
      PendingUpdate::NeedsIncrementalPatch(nodes) => {
        debug!("Updating intervals for {} changed nodes", nodes.len());
        for node in nodes {
          check_index("When updating intervals", "changed node", node, self.events.len())?;
          let height = self.tree.node_height(node);
          self
            .events
            .update_for_changed_node(node, height)
            .wrap_err_with(|| format!("When updating intervals for node {node}"))?;
        }
        if self.events.event_type(0) != IntervalType::Sample {
          debug!(
            "Earliest event belongs to internal node {} after incremental update. Rebuilding intervals from scratch",
            self.events.node(0)
          );
          return self.apply(PendingUpdate::NeedsFullRebuild);
        }
        trace!("Intervals after update:\n{}", self.events);
        Ok(())
      }
    }
  }

  fn interval_events(&mut self, interval: usize) -> Result<&EventTable, Report> {
    let events = self.events()?;
    check_index("When querying intervals", "interval", interval, events.len() - 1)?;
    Ok(events)
  }

  fn ending_node_of_type(&mut self, interval: usize, expected: IntervalType) -> Result<NodeId, Report> {
    let events = self.interval_events(interval)?;
    let actual = events.event_type(interval + 1);
    if actual != expected {
      return make_error!("Interval {interval} ends with a {actual} event, but a {expected} event was requested");
    }
    Ok(events.node(interval + 1))
  }
}

impl<T: TreeView> TreeChangeListener for IntervalList<T> {
  fn handle_tree_changed(&mut self, change: &TreeChange) {
    trace!("Tree changed: {change:?}");
    self.pending.absorb(change);
  }
}
