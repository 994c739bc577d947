// SPDX-License-Identifier: MIT OR Apache-2.0
//! GPU-visible binding table space, partitioned per frames-in-flight
//! slot.
//!
//! Descriptor and sampler tables are written by the CPU while the GPU
//! may still be reading the previous frame's tables. Each frame slot
//! gets its own region, so a write for frame N can never race a read
//! for frame N-1. A slot's allocation cursor resets when its frame
//! index comes around again, which is safe because the pacer guarantees
//! the prior use is fenced by then.

use crate::backend::GpuError;
use parking_lot::Mutex;

/// View of one frame slot's descriptor region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSlice {
    /// Frame slot index
    pub slot: u32,
    /// First descriptor index of the slot's region
    pub base: u32,
    /// Number of descriptors in the region
    pub capacity: u32,
}

/// A contiguous range of descriptors allocated out of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRange {
    /// Absolute index of the first descriptor
    pub offset: u32,
    /// Number of descriptors
    pub count: u32,
}

/// Per-frame-slot descriptor allocator.
pub struct DescriptorArena {
    frames_in_flight: u32,
    slot_capacity: u32,
    cursors: Mutex<Vec<u32>>,
}

impl DescriptorArena {
    /// Create an arena with `slot_capacity` descriptors per frame slot.
    pub fn new(frames_in_flight: u32, slot_capacity: u32) -> Self {
        let frames_in_flight = frames_in_flight.max(1);
        Self {
            frames_in_flight,
            slot_capacity,
            cursors: Mutex::new(vec![0; frames_in_flight as usize]),
        }
    }

    /// The region backing a frame number's slot, with its cursor reset
    /// for this frame's writes.
    pub fn begin_frame(&self, frame_number: u64) -> DescriptorSlice {
        let slot = (frame_number % u64::from(self.frames_in_flight)) as u32;
        self.cursors.lock()[slot as usize] = 0;
        DescriptorSlice {
            slot,
            base: slot * self.slot_capacity,
            capacity: self.slot_capacity,
        }
    }

    /// Allocate `count` descriptors from a frame's slice.
    pub fn allocate(
        &self,
        slice: &DescriptorSlice,
        count: u32,
    ) -> Result<DescriptorRange, GpuError> {
        let mut cursors = self.cursors.lock();
        let cursor = &mut cursors[slice.slot as usize];
        if *cursor + count > slice.capacity {
            return Err(GpuError::ResourceCreationFailed(format!(
                "descriptor slot {} exhausted ({} + {} > {})",
                slice.slot, cursor, count, slice.capacity
            )));
        }
        let offset = slice.base + *cursor;
        *cursor += count;
        Ok(DescriptorRange { offset, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_do_not_overlap() {
        let arena = DescriptorArena::new(2, 128);
        let a = arena.begin_frame(0);
        let b = arena.begin_frame(1);
        assert_ne!(a.slot, b.slot);
        assert!(a.base + a.capacity <= b.base || b.base + b.capacity <= a.base);
    }

    #[test]
    fn test_allocation_is_sequential_and_bounded() {
        let arena = DescriptorArena::new(2, 4);
        let slice = arena.begin_frame(0);
        let first = arena.allocate(&slice, 3).unwrap();
        assert_eq!(first.offset, slice.base);
        let second = arena.allocate(&slice, 1).unwrap();
        assert_eq!(second.offset, slice.base + 3);
        assert!(arena.allocate(&slice, 1).is_err());
    }

    #[test]
    fn test_cursor_resets_when_slot_comes_around() {
        let arena = DescriptorArena::new(2, 4);
        let slice = arena.begin_frame(0);
        arena.allocate(&slice, 4).unwrap();
        let again = arena.begin_frame(2); // same slot, two frames later
        assert_eq!(again.slot, slice.slot);
        assert!(arena.allocate(&again, 4).is_ok());
    }
}
