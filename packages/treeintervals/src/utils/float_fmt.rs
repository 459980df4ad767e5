use lazy_static::lazy_static;
use pretty_dtoa::{dtoa, FmtFloatConfig};

lazy_static! {
  static ref FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .force_no_e_notation()
    .add_point_zero(true)
    .max_significant_digits(6)
    .radix_point('.')
    .round();
}

fn float_format<F: Into<f64>>(x: F, config: FmtFloatConfig) -> String {
  let formatted = dtoa(x.into(), config);
  if formatted.contains('.') {
    formatted.trim_end_matches('0').trim_end_matches('.').to_owned()
  } else {
    formatted
  }
}

pub fn float_to_significant_digits<F: Into<f64>>(x: F, max_significant_digits: u8) -> String {
  float_format(x, FLOAT_CONFIG.max_significant_digits(max_significant_digits))
}
