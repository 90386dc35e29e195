//! Per-frame view state shared by every raster unit.
//!
//! Built once per resolution change, then updated with the camera position
//! each frame.  Everything the plane mapper reads per scanline (`yslope`,
//! `xtoviewangle`, the projection constants) is precomputed here.

use crate::fixed::{Angle, Fixed};

#[derive(Clone)]
pub struct ViewFrame {
    pub width: i32,
    pub height: i32,
    pub centerx: i32,
    pub centery: i32,
    pub centerxfrac: Fixed,
    pub centeryfrac: Fixed,
    /// Focal length in pixels as a float, used by the sloped-plane solver.
    pub focallenf: f32,

    pub viewx: Fixed,
    pub viewy: Fixed,
    pub viewz: Fixed,
    pub viewangle: Angle,

    /// Inverse-perspective slope per screen row:
    /// `yslope[y] = centerx / |y - centery + 0.5|`.
    pub yslope: Vec<Fixed>,
    /// View-relative angle of each screen column (0 at centerx).
    pub xtoviewangle: Vec<Angle>,
    /// Vertical texel step base for the sky column drawer.
    pub skyscale: Fixed,
}

impl ViewFrame {
    /// 90° horizontal FOV: focal length equals half the width.
    pub fn new(width: i32, height: i32) -> Self {
        let centerx = width / 2;
        let centery = height / 2;
        let focal = centerx as f64;

        let yslope = (0..height)
            .map(|y| {
                let dy = ((y - centery) as f64 + 0.5).abs();
                Fixed::from_f64(focal / dy)
            })
            .collect();

        let xtoviewangle = (0..width)
            .map(|x| {
                let tangent = (centerx - x) as f64 / focal;
                Angle::from_radians(tangent.atan())
            })
            .collect();

        ViewFrame {
            width,
            height,
            centerx,
            centery,
            centerxfrac: Fixed::from_int(centerx),
            centeryfrac: Fixed::from_int(centery),
            focallenf: focal as f32,
            viewx: Fixed::ZERO,
            viewy: Fixed::ZERO,
            viewz: Fixed::ZERO,
            viewangle: Angle::ZERO,
            yslope,
            xtoviewangle,
            skyscale: Fixed::from_f64(320.0 / width as f64),
        }
    }

    pub fn set_view(&mut self, x: Fixed, y: Fixed, z: Fixed, angle: Angle) {
        self.viewx = x;
        self.viewy = y;
        self.viewz = z;
        self.viewangle = angle;
    }
}
