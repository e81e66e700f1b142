//! services/tracker/src/web/protocol.rs
//!
//! Request and response payloads of the HTTP surface the hosting world drives.
//! Presence events themselves are `presence_core::HostEvent`, posted as-is.

use presence_core::{
    CompletedVisit, RegionDescriptor, RegionGeometry, RegionId, Transform, UserId, VisitRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

//=========================================================================================
// Payloads Sent FROM the Host
//=========================================================================================

/// Creates a region. Omitted geometry or transform falls back to the defaults.
#[derive(Deserialize, Debug)]
pub struct CreateRegionRequest {
    pub id: RegionId,
    #[serde(default)]
    pub geometry: Option<RegionGeometry>,
    #[serde(default)]
    pub transform: Option<Transform>,
}

//=========================================================================================
// Payloads Sent TO the Host
//=========================================================================================

/// A region definition together with its current head count.
#[derive(Serialize, Debug)]
pub struct RegionView {
    #[serde(flatten)]
    pub descriptor: RegionDescriptor,
    pub occupants: usize,
}

#[derive(Serialize, Debug)]
pub struct DeleteRegionResponse {
    pub region_id: RegionId,
    pub closed_visits: Vec<CompletedVisit>,
}

#[derive(Serialize, Debug)]
pub struct UserVisitsResponse {
    pub user_id: UserId,
    pub visits: BTreeMap<RegionId, VisitRecord>,
}
