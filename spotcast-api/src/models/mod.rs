pub mod campaign;
pub mod device;
pub mod device_schedule;
pub mod playback;
pub mod scheduled_jingle;

// Re-export models for easier access
pub use campaign::*;
pub use device::*;
pub use device_schedule::*;
pub use playback::*;
pub use scheduled_jingle::*;
