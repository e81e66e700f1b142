pub mod domain;
pub mod error;
pub mod events;
mod persist;
pub mod ports;
pub mod region;
pub mod region_store;
pub mod registry;
pub mod testing;
pub mod time;
pub mod visits;

pub use domain::{
    CompletedVisit, Occupant, Quaternion, RegionDescriptor, RegionGeometry, RegionId, Transform,
    UserId, Vector3, VisitDatabase, VisitRecord,
};
pub use error::{TrackingError, TrackingResult};
pub use events::{EventOutcome, HostEvent};
pub use ports::{Clock, DocumentStore, PortError, PortResult, UserDirectory, VolumeHost};
pub use region::{EnterOutcome, PresenceRegion};
pub use region_store::RegionDescriptorStore;
pub use registry::RegionRegistry;
pub use time::{breakdown, merge, TimeBreakdown};
pub use visits::VisitRecordStore;
