//! Scanline texture mapping for untilted planes.
//!
//! A horizontal plane projects each screen row to a single world-space
//! distance, so `distance`, `xstep` and `ystep` depend only on the row and
//! the plane height.  Consecutive planes at the same height hit the
//! per-row cache and skip the divides; the cache is keyed by plane height
//! and survives until the configured view angle changes.

use crate::fixed::{ANG90, Angle, Fixed, finecosine, finesine};

/// Texture-space walk for one scanline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappedSpan {
    pub distance: Fixed,
    pub xfrac: Fixed,
    pub yfrac: Fixed,
    pub xstep: Fixed,
    pub ystep: Fixed,
}

pub struct FlatMapper {
    cur_angle: Angle,
    configured: bool,
    basexscale: Fixed,
    baseyscale: Fixed,

    planeheight: Fixed,
    xoffs: Fixed,
    yoffs: Fixed,

    cached_height: Vec<Fixed>,
    cached_distance: Vec<Fixed>,
    cached_xstep: Vec<Fixed>,
    cached_ystep: Vec<Fixed>,
}

impl FlatMapper {
    pub fn new(max_height: usize) -> Self {
        Self {
            cur_angle: Angle::ZERO,
            configured: false,
            basexscale: Fixed::ZERO,
            baseyscale: Fixed::ZERO,
            planeheight: Fixed::ZERO,
            xoffs: Fixed::ZERO,
            yoffs: Fixed::ZERO,
            cached_height: vec![Fixed::MIN; max_height],
            cached_distance: vec![Fixed::ZERO; max_height],
            cached_xstep: vec![Fixed::ZERO; max_height],
            cached_ystep: vec![Fixed::ZERO; max_height],
        }
    }

    /// Point the mapper at a view direction (view angle plus plane
    /// rotation).  A direction change invalidates the row cache and
    /// recomputes the vanishing-point scale factors.
    pub fn configure(&mut self, angle: Angle, centerxfrac: Fixed) {
        if self.configured && angle == self.cur_angle {
            return;
        }
        self.configured = true;
        self.cur_angle = angle;
        let fine = (angle - ANG90).fine();
        self.basexscale = finecosine(fine).div(centerxfrac);
        self.baseyscale = -finesine(fine).div(centerxfrac);
        self.reset_cache();
    }

    pub fn angle(&self) -> Angle {
        self.cur_angle
    }

    /// Select the plane the next `map` calls belong to.
    pub fn set_plane(&mut self, planeheight: Fixed, xoffs: Fixed, yoffs: Fixed) {
        self.planeheight = planeheight;
        self.xoffs = xoffs;
        self.yoffs = yoffs;
    }

    pub fn planeheight(&self) -> Fixed {
        self.planeheight
    }

    pub fn reset_cache(&mut self) {
        self.cached_height.fill(Fixed::MIN);
        self.cached_distance.fill(Fixed::ZERO);
        self.cached_xstep.fill(Fixed::ZERO);
        self.cached_ystep.fill(Fixed::ZERO);
    }

    /// Texture walk for the span starting at `(x1, y)`.  The stored offsets
    /// already carry the view origin (the registry folds it in when the
    /// plane is created), so they alone anchor the texture to world space.
    pub fn map(&mut self, y: i32, x1: i32, centerx: i32, centery: i32, yslope: Fixed) -> MappedSpan {
        let yi = y as usize;
        let fine = self.cur_angle.fine();

        let (distance, xstep, ystep);
        if self.planeheight != self.cached_height[yi] {
            self.cached_height[yi] = self.planeheight;
            distance = self.planeheight.mul(yslope);
            self.cached_distance[yi] = distance;

            let span = (centery - y).unsigned_abs() as i32;
            if span != 0 {
                xstep = Fixed(finesine(fine).mul(self.planeheight).0 / span);
                ystep = Fixed(finecosine(fine).mul(self.planeheight).0 / span);
            } else {
                // at the horizon row the ray is parallel to the plane;
                // fall back to the precomputed vanishing-point scales
                xstep = distance.mul(self.basexscale);
                ystep = distance.mul(self.baseyscale);
            }
            self.cached_xstep[yi] = xstep;
            self.cached_ystep[yi] = ystep;
        } else {
            distance = self.cached_distance[yi];
            xstep = self.cached_xstep[yi];
            ystep = self.cached_ystep[yi];
        }

        let dx = x1 - centerx;
        let xfrac = self.xoffs + finecosine(fine).mul(distance) + xstep * dx;
        let yfrac = self.yoffs - finesine(fine).mul(distance) + ystep * dx;

        MappedSpan {
            distance,
            xfrac,
            yfrac,
            xstep,
            ystep,
        }
    }
}
