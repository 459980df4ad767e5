use crate::intervals::units::Units;
use crate::io::json::{json_read_str, json_write_str, JsonPretty};
use eyre::{Report, WrapErr};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Tuning knobs of an interval list. Missing fields take their default values when read from JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, SmartDefault)]
#[serde(rename_all = "camelCase", default)]
pub struct IntervalsOptions {
  /// Node count from which a full rebuild sorts events in parallel.
  #[default = 4096]
  pub parallel_sort_threshold: usize,

  /// Check every event table invariant after each recomputation and fail if one is broken.
  pub validate: bool,

  pub units: Units,
}

impl IntervalsOptions {
  pub fn from_json_str(s: impl AsRef<str>) -> Result<Self, Report> {
    json_read_str(s).wrap_err("When reading interval list options")
  }

  pub fn to_json_string(&self) -> Result<String, Report> {
    json_write_str(self, JsonPretty(true)).wrap_err("When writing interval list options")
  }
}
