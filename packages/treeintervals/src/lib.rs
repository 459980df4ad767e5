pub mod intervals;
pub mod io;
pub mod tree;
pub mod utils;
