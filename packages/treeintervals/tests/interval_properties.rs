use ctor::ctor;
use eyre::Report;
use log::LevelFilter;
use pretty_assertions::assert_eq;
use rstest::rstest;
use treeintervals::intervals::event_table::{EventTable, NO_INTERVAL};
use treeintervals::intervals::interval_list::IntervalList;
use treeintervals::intervals::interval_type::IntervalType;
use treeintervals::intervals::intervals_options::IntervalsOptions;
use treeintervals::tree::random_tree::{random_binary_tree, random_height_perturbation};
use treeintervals::tree::simple_tree::SimpleTree;
use treeintervals::tree::tree_change::TreeChangeListener;
use treeintervals::tree::tree_view::TreeView;
use treeintervals::utils::global_init::{global_init, setup_logger};
use treeintervals::utils::random::get_random_number_generator;

#[ctor]
fn init() {
  global_init();
  setup_logger(LevelFilter::Warn);
}

const PERTURBATIONS: usize = 200;

fn validating() -> IntervalsOptions {
  IntervalsOptions {
    validate: true,
    ..IntervalsOptions::default()
  }
}

fn rebuilt_from_tree(tree: &SimpleTree) -> Result<EventTable, Report> {
  let node_count = tree.node_count();
  let heights = (0..node_count).map(|node| tree.node_height(node)).collect::<Vec<_>>();
  let is_external = (0..node_count).map(|node| tree.is_external(node)).collect::<Vec<_>>();
  let mut events = EventTable::new(node_count)?;
  events.rebuild_from(&heights, &is_external, usize::MAX)?;
  Ok(events)
}

fn check_table_invariants(events: &EventTable, tree: &SimpleTree) {
  assert_eq!(events.event_type(0), IntervalType::Sample);
  assert_eq!(events.lineage_count(0), 1);
  assert_eq!(events.interval(0), NO_INTERVAL);

  for position in 1..events.len() {
    assert!(events.time(position - 1) <= events.time(position));
    let delta = match events.event_type(position) {
      IntervalType::Sample => 1,
      IntervalType::Coalescent => -1,
    };
    assert_eq!(events.lineage_count(position), events.lineage_count(position - 1) + delta);
    assert_eq!(events.interval(position), events.time(position) - events.time(position - 1));
  }

  for position in 0..events.len() {
    let node = events.node(position);
    assert_eq!(events.position_of(node), position);
    assert_eq!(events.time(position), tree.node_height(node));
    assert_eq!(events.event_type(position), IntervalType::from_is_external(tree.is_external(node)));
  }

  assert_eq!(events.lineage_count(events.len() - 1), 1);
}

#[rstest]
#[case(1, 3)]
#[case(2, 10)]
#[case(3, 50)]
#[case(4, 257)]
fn test_incremental_updates_match_full_rebuild(#[case] seed: u64, #[case] leaf_count: usize) -> Result<(), Report> {
  let mut rng = get_random_number_generator(Some(seed));
  let tree = random_binary_tree(leaf_count, 0.5, &mut rng)?;
  let mut intervals = IntervalList::new(tree, validating())?;

  for _ in 0..PERTURBATIONS {
    let (node, height) = random_height_perturbation(intervals.tree(), &mut rng)?;
    let change = intervals.tree_mut().set_node_height(node, height)?;
    intervals.handle_tree_changed(&change);

    let expected = rebuilt_from_tree(intervals.tree())?;
    let tree = intervals.tree().clone();
    let actual = intervals.events()?;
    check_table_invariants(actual, &tree);
    assert_eq!(actual, &expected);
  }
  Ok(())
}

#[rstest]
#[case(11, 20)]
#[case(12, 100)]
fn test_batched_changes_match_full_rebuild(#[case] seed: u64, #[case] leaf_count: usize) -> Result<(), Report> {
  let mut rng = get_random_number_generator(Some(seed));
  let tree = random_binary_tree(leaf_count, 0.5, &mut rng)?;
  let mut intervals = IntervalList::new(tree, validating())?;

  for _ in 0..PERTURBATIONS / 10 {
    for _ in 0..7 {
      let (node, height) = random_height_perturbation(intervals.tree(), &mut rng)?;
      let change = intervals.tree_mut().set_node_height(node, height)?;
      intervals.handle_tree_changed(&change);
    }
    let expected = rebuilt_from_tree(intervals.tree())?;
    assert_eq!(intervals.events()?, &expected);
  }
  Ok(())
}

#[rstest]
#[case(21, 30)]
#[case(22, 120)]
fn test_rejected_proposals_restore_exact_state(#[case] seed: u64, #[case] leaf_count: usize) -> Result<(), Report> {
  let mut rng = get_random_number_generator(Some(seed));
  let tree = random_binary_tree(leaf_count, 0.5, &mut rng)?;
  let mut intervals = IntervalList::new(tree, validating())?;

  for iteration in 0..PERTURBATIONS {
    let saved_tree = intervals.tree().clone();
    let saved_events = intervals.events()?.clone();

    intervals.store_state()?;
    let (node, height) = random_height_perturbation(intervals.tree(), &mut rng)?;
    let change = intervals.tree_mut().set_node_height(node, height)?;
    intervals.handle_tree_changed(&change);
    intervals.calculate_intervals()?;

    if iteration % 2 == 0 {
      intervals.accept_state()?;
    } else {
      *intervals.tree_mut() = saved_tree;
      intervals.restore_state()?;
      assert_eq!(intervals.events()?, &saved_events);
    }

    let expected = rebuilt_from_tree(intervals.tree())?;
    assert_eq!(intervals.events()?, &expected);
  }
  Ok(())
}

#[rstest]
#[case::sequential(usize::MAX)]
#[case::parallel(1)]
fn test_parallel_and_sequential_rebuilds_agree(#[case] parallel_sort_threshold: usize) -> Result<(), Report> {
  let mut rng = get_random_number_generator(Some(31));
  // all tips at height 0
  let tree = random_binary_tree(500, 0.0, &mut rng)?;

  let options = IntervalsOptions {
    parallel_sort_threshold,
    ..validating()
  };
  let mut intervals = IntervalList::new(tree.clone(), options)?;
  assert_eq!(intervals.events()?, &rebuilt_from_tree(&tree)?);
  Ok(())
}

#[test]
fn test_interval_queries_on_random_tree() -> Result<(), Report> {
  let mut rng = get_random_number_generator(Some(41));
  let tree = random_binary_tree(64, 0.5, &mut rng)?;
  let mut intervals = IntervalList::new(tree, validating())?;

  let interval_count = intervals.interval_count()?;
  assert_eq!(interval_count, 126);

  let mut total = 0.0;
  let mut coalescences = 0;
  for interval in 0..interval_count {
    total += intervals.interval_duration(interval)?;
    coalescences += intervals.coalescent_event_count(interval)?;
    assert!(intervals.lineage_count(interval)? >= 1);

    let [start, end] = intervals.interval_to_nodes(interval)?;
    assert!(intervals.node_to_intervals(start)?.contains(&interval));
    assert!(intervals.node_to_intervals(end)?.contains(&interval));
  }

  approx::assert_relative_eq!(
    total,
    intervals.total_duration()? - intervals.start_time()?,
    max_relative = 1e-12
  );
  assert_eq!(coalescences, 63);
  assert_eq!(intervals.coalescent_intervals()?.len(), 63);
  Ok(())
}
