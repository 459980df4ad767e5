pub mod change_tracking;
pub mod event_table;
pub mod interval_list;
pub mod interval_type;
pub mod intervals_options;
pub mod pending_update;
pub mod units;
