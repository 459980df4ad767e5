use crate::intervals::event_table::EventTable;

/// Index of the earliest interval that differs between two states of an event table, or `None` if none does.
///
/// Both tables are walked in lockstep from the earliest event until the node or the interval length at a position
/// differs. Interval `i` ends at event `i + 1`, so a difference at event `p` invalidates interval `p - 1` and every
/// later one. Tables of different sizes cannot be compared position by position and are reported as changed from the
/// start.
pub fn first_changed_interval(before: &EventTable, after: &EventTable) -> Option<usize> {
  if before.len() != after.len() {
    return Some(0);
  }

  (0..before.len())
    .find(|&position| {
      before.node(position) != after.node(position)
        || before.interval(position).to_bits() != after.interval(position).to_bits()
    })
    .map(|position| position.saturating_sub(1))
}
