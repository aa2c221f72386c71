pub mod campaign;
mod db;
pub mod device;
pub mod device_schedule;
pub mod play_counter;
pub mod testing;

pub use db::*;
