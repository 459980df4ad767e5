use crate::make_internal_report;
use eyre::Report;
use rand::{seq::IteratorRandom, Rng, SeedableRng};
use rand_isaac::Isaac64Rng;

pub fn get_random_number_generator(seed: Option<u64>) -> (impl Rng + Send + Sync + Clone) {
  match seed {
    None => Isaac64Rng::from_entropy(),
    Some(seed) => Isaac64Rng::seed_from_u64(seed),
  }
}

pub fn random_choice_maybe<T>(iter: impl IntoIterator<Item = T>, rng: &mut impl Rng) -> Option<T> {
  iter.into_iter().choose(rng)
}

pub fn random_choice<T>(iter: impl IntoIterator<Item = T>, rng: &mut impl Rng) -> Result<T, Report> {
  random_choice_maybe(iter, rng)
    .ok_or_else(|| make_internal_report!("random_choice: expected at least one item, but none found"))
}

/// Removes and returns a uniformly chosen element. Order of the remaining elements is not preserved.
pub fn random_swap_remove<T>(v: &mut Vec<T>, rng: &mut impl Rng) -> Option<T> {
  if v.is_empty() {
    return None;
  }
  let index: usize = rng.gen_range(0..v.len());
  Some(v.swap_remove(index))
}
