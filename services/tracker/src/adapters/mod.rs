pub mod clock;
pub mod json_store;
pub mod roster;
pub mod volumes;

pub use clock::SystemClock;
pub use json_store::JsonFileStore;
pub use roster::SessionRoster;
pub use volumes::VolumeTable;
