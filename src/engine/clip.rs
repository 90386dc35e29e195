//! Per-frame, per-column clip storage.
//!
//! Wall traversal narrows these bands as opaque geometry is drawn; the plane
//! code only owns the storage and the once-per-frame reset.  Clip values are
//! the solid pixel bounding the open range: `floor_clip` starts at
//! `viewheight`, `ceil_clip` at `-1` (nothing occluded yet).

use smallvec::SmallVec;

use crate::fixed::Fixed;

/// Upper bound on simultaneously tracked extra-floor clip slots.
pub const MAX_FFLOORS: usize = 40;

/// Clip pair for one stacked extra-floor surface.
pub struct FfloorClipBand {
    pub f_clip: Vec<i16>,
    pub c_clip: Vec<i16>,
}

pub struct ClipBands {
    pub floor_clip: Vec<i16>,
    pub ceil_clip: Vec<i16>,
    /// Nearest wall scale per column, used by sprite clipping downstream.
    pub frontscale: Vec<Fixed>,
    slots: SmallVec<[FfloorClipBand; 4]>,
    active_slots: usize,
    width: usize,
    height: usize,
}

impl ClipBands {
    pub fn new(max_width: usize) -> Self {
        Self {
            floor_clip: vec![0; max_width],
            ceil_clip: vec![0; max_width],
            frontscale: vec![Fixed::MAX; max_width],
            slots: SmallVec::new(),
            active_slots: 0,
            width: 0,
            height: 0,
        }
    }

    /// Open every column for the given viewport; drop all extra-floor slots.
    pub fn clear_frame(&mut self, viewwidth: i32, viewheight: i32) {
        self.width = viewwidth as usize;
        self.height = viewheight as usize;
        for i in 0..self.width {
            self.floor_clip[i] = viewheight as i16;
            self.ceil_clip[i] = -1;
            self.frontscale[i] = Fixed::MAX;
        }
        self.clear_ffloor_clips();
        self.active_slots = 0;
    }

    /// Re-open the extra-floor clip pairs without touching floor/ceiling.
    /// Runs between masked passes within a frame.
    pub fn clear_ffloor_clips(&mut self) {
        for slot in &mut self.slots {
            for i in 0..self.width {
                slot.f_clip[i] = self.height as i16;
                slot.c_clip[i] = -1;
            }
        }
    }

    /// Claim the next extra-floor clip slot for this frame.
    /// `None` once all [`MAX_FFLOORS`] slots are taken.
    pub fn push_ffloor(&mut self) -> Option<usize> {
        if self.active_slots >= MAX_FFLOORS {
            return None;
        }
        if self.active_slots == self.slots.len() {
            self.slots.push(FfloorClipBand {
                f_clip: vec![self.height as i16; self.floor_clip.len()],
                c_clip: vec![-1; self.floor_clip.len()],
            });
        }
        let idx = self.active_slots;
        self.active_slots += 1;
        Some(idx)
    }

    pub fn ffloor(&self, slot: usize) -> &FfloorClipBand {
        &self.slots[slot]
    }

    pub fn ffloor_mut(&mut self, slot: usize) -> &mut FfloorClipBand {
        &mut self.slots[slot]
    }

    pub fn active_ffloors(&self) -> usize {
        self.active_slots
    }
}
