//! Flat tick records and the reuse pool.
//!
//! A `TickRecord` is one heap-allocated block of fifteen doubles holding a
//! full `TickSnapshot`. Records travel by move from the producing driver to
//! the consumer and come back through a return channel, so steady-state
//! streaming allocates nothing.

use crate::physics::race::TickSnapshot;
use crate::physics::vehicle::VehicleSnapshot;

/// Slots in a flat record: the clock plus seven values per vehicle.
pub const TICK_RECORD_LEN: usize = 15;

/// Slots per vehicle block: position, velocity, acceleration, net force,
/// kinetic energy, work, peak velocity, in that order.
const VEHICLE_SLOTS: usize = 7;

/// One snapshot flattened into a fixed-size heap block.
#[derive(Debug, Clone, PartialEq)]
pub struct TickRecord(Box<[f64; TICK_RECORD_LEN]>);

impl TickRecord {
    /// Fresh all-zero record.
    pub fn zeroed() -> Self {
        Self(Box::new([0.0; TICK_RECORD_LEN]))
    }

    /// Overwrite every slot from `snap`.
    pub fn encode(&mut self, snap: &TickSnapshot) {
        self.0[0] = snap.sim_time;
        Self::write_vehicle(&mut self.0[1..1 + VEHICLE_SLOTS], &snap.vehicle1);
        Self::write_vehicle(&mut self.0[1 + VEHICLE_SLOTS..], &snap.vehicle2);
    }

    /// Rebuild the structured snapshot this record was encoded from.
    pub fn decode(&self) -> TickSnapshot {
        TickSnapshot {
            sim_time: self.0[0],
            vehicle1: Self::read_vehicle(&self.0[1..1 + VEHICLE_SLOTS]),
            vehicle2: Self::read_vehicle(&self.0[1 + VEHICLE_SLOTS..]),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0[..]
    }

    fn write_vehicle(slots: &mut [f64], v: &VehicleSnapshot) {
        slots[0] = v.position;
        slots[1] = v.velocity;
        slots[2] = v.acceleration;
        slots[3] = v.net_force;
        slots[4] = v.kinetic_energy;
        slots[5] = v.work;
        slots[6] = v.max_velocity;
    }

    fn read_vehicle(slots: &[f64]) -> VehicleSnapshot {
        VehicleSnapshot {
            position: slots[0],
            velocity: slots[1],
            acceleration: slots[2],
            net_force: slots[3],
            kinetic_energy: slots[4],
            work: slots[5],
            max_velocity: slots[6],
        }
    }
}

impl Default for TickRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Free list of returned records. `acquire` hands out a recycled block when
/// one is available and allocates only when the list is empty, which happens
/// when the consumer is slower than the producer. Returns past `MAX_FREE`
/// are dropped so a one-off burst cannot pin memory for the rest of the run.
#[derive(Debug, Default)]
pub struct RecordPool {
    free: Vec<TickRecord>,
}

impl RecordPool {
    /// Most idle records kept around.
    pub const MAX_FREE: usize = 8;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self) -> TickRecord {
        self.free.pop().unwrap_or_default()
    }

    pub fn release(&mut self, record: TickRecord) {
        if self.free.len() < Self::MAX_FREE {
            self.free.push(record);
        }
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }
}
