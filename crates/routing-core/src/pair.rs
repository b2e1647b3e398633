//! Pickup/delivery pairs (spec §3): `vehicle(p) = vehicle(d)` and,
//! optionally, `cumul_t(p) <= cumul_t(d)` for a time-like dimension.

use crate::index::VarIndex;

#[derive(Debug, Clone, Copy)]
pub struct PickupDeliveryPair {
    pub pickup: VarIndex,
    pub delivery: VarIndex,
}
