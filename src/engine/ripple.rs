//! Water ripple: a time- and depth-varying sine displacement added to the
//! texture coordinates (flat planes) or to the sampled screen row (tilted
//! and water-translucent planes).

use crate::fixed::{Angle, FINEANGLES, FINEMASK, FRACBITS, Fixed, finecosine, finesine};

pub struct RippleState {
    pub active: bool,
    /// Texture-space displacement of the current span, set by `rotate`.
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    /// Alternating half-texel bob applied by the water span drawer.
    pub waterofs: Fixed,
    offset: i32,
}

impl RippleState {
    pub fn new() -> Self {
        Self {
            active: false,
            xfrac: Fixed::ZERO,
            yfrac: Fixed::ZERO,
            waterofs: Fixed::ZERO,
            offset: 0,
        }
    }

    /// Advance the animation; once per frame from the elapsed-tics counter.
    pub fn update(&mut self, leveltime: u32) {
        self.waterofs = Fixed(((leveltime & 1) * 16384) as i32);
        self.offset = leveltime.wrapping_mul(140) as i32;
    }

    /// Horizontal displacement for one scanline of a plane at `planeheight`.
    /// Amplitude falls off with distance so far-away water barely moves.
    pub fn offset_at(&self, planeheight: Fixed, yslope: Fixed) -> Fixed {
        let distance = planeheight.mul(yslope);
        let yay = (self.offset.wrapping_add(distance.0 >> 9)) as usize & FINEMASK;
        finesine(yay).div(Fixed((1 << 12) + (distance.0 >> 11)))
    }

    /// Split `bgofs` into texture-space x/y displacement, rotated 90° from
    /// the plane's view angle.
    pub fn rotate(&mut self, angle: Angle, bgofs: Fixed) {
        let a = (angle.fine() + FINEANGLES / 4) & FINEMASK;
        self.xfrac = finecosine(a).mul(bgofs);
        self.yfrac = finesine(a).mul(bgofs);
    }

    /// Clamp a row displacement so `y + ofs` stays inside the viewport.
    #[inline]
    pub fn clamp_row_offset(bgofs: Fixed, y: i32, viewheight: i32) -> i32 {
        let mut ofs = bgofs.0 >> FRACBITS;
        if y + ofs >= viewheight {
            ofs = viewheight - y - 1;
        }
        if y + ofs < 0 {
            ofs = -y;
        }
        ofs
    }
}

impl Default for RippleState {
    fn default() -> Self {
        Self::new()
    }
}
