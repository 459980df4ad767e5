use color_eyre::Report;

pub fn report_to_string(report: &Report) -> String {
  let strings: Vec<String> = report.chain().map(std::string::ToString::to_string).collect();
  strings.join(": ")
}

#[macro_export(local_inner_macros)]
macro_rules! make_error {
  ($($arg:tt)*) => {
    {
      Err(eyre::eyre!(std::format!($($arg)*)))
    }
  };
}

pub use make_error;

#[macro_export(local_inner_macros)]
macro_rules! make_report {
  ($($arg:tt)*) => {
    {
      eyre::eyre!($($arg)*)
    }
  };
}

pub use make_report;

#[macro_export(local_inner_macros)]
macro_rules! make_internal_error {
  ($($arg:tt)*) => {
    {
      let msg_external = std::format!($($arg)*);
      let msg = std::format!("{msg_external}. This is an internal error. The interval list is likely corrupted.");
      Err(eyre::eyre!(msg))
    }
  };
}

pub use make_internal_error;

#[macro_export(local_inner_macros)]
macro_rules! make_internal_report {
  ($($arg:tt)*) => {
    {
      let msg_external = std::format!($($arg)*);
      let msg = std::format!("{msg_external}. This is an internal error. The interval list is likely corrupted.");
      eyre::eyre!(msg)
    }
  };
}

pub use make_internal_report;

/// Fails when a caller hands over a buffer whose length differs from the fixed node count of a structure.
pub fn check_capacity(context: &str, what: &str, expected: usize, actual: usize) -> Result<(), Report> {
  if expected == actual {
    Ok(())
  } else {
    make_error!("{context}: capacity mismatch: expected {expected} {what}, but found {actual}")
  }
}

/// Fails when `index` is not a valid index into a collection of `len` items.
pub fn check_index(context: &str, what: &str, index: usize, len: usize) -> Result<(), Report> {
  if index < len {
    Ok(())
  } else {
    make_error!("{context}: {what} {index} is out of range (there are {len})")
  }
}
