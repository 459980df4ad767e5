use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use strum_macros::Display;

/// Units in which node heights, and therefore interval durations, are measured.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, SmartDefault, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase")]
pub enum Units {
  Substitutions,
  #[default]
  Generations,
  Days,
  Months,
  Years,
}
