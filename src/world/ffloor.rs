//! Read-only descriptors consumed by the plane pipeline: stacked "extra"
//! floors, polyobjects and slope definitions.  The world simulation owns
//! these tables; planes refer to them by index so records stay `Copy`-cheap
//! and comparable.

use bitflags::bitflags;

use crate::fixed::{Angle, FRACUNIT, Fixed};

pub type FfloorId = u16;
pub type PolyobjId = u16;
pub type SlopeId = u16;

bitflags! {
    /// Rendering-relevant subset of the extra-floor flag set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FfloorFlags: u32 {
        const TRANSLUCENT = 1 << 0;
        const FOG         = 1 << 1;
        const RIPPLE      = 1 << 2;
        /// Keep transparent texel holes open even when otherwise opaque.
        const SPLAT       = 1 << 3;
        const EXTRA       = 1 << 4;
        const CUTEXTRA    = 1 << 5;
        const SWIMMABLE   = 1 << 6;
    }
}

/// A stacked 3D floor surface.  Planes created for one of these never merge
/// with ordinary planes or with each other.
#[derive(Clone, Copy, Debug)]
pub struct Ffloor {
    pub flags: FfloorFlags,
    /// 0 invisible .. 255 opaque; only meaningful with `TRANSLUCENT`.
    pub alpha: u8,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PolyFlags: u32 {
        const SPLAT = 1 << 0;
    }
}

/// A rotatable group of geometry with its own transform; affects the plane
/// offset calculation and draws through its own path.
#[derive(Clone, Copy, Debug)]
pub struct Polyobj {
    pub angle: Angle,
    pub center_x: Fixed,
    pub center_y: Fixed,
    /// 0 opaque .. 9 graded, >= 10 invisible.
    pub translucency: i32,
    pub flags: PolyFlags,
}

/// Parametric plane `z = o.z + ((x-o.x)*d.x + (y-o.y)*d.y) * zdelta`.
#[derive(Clone, Copy, Debug)]
pub struct Slope {
    pub origin: (Fixed, Fixed, Fixed),
    pub direction: (Fixed, Fixed),
    pub zdelta: Fixed,
}

impl Slope {
    /// Height of the plane at `(x, y)`, evaluated in 64-bit intermediates so
    /// steep slopes far from the origin cannot overflow.
    pub fn z_at(&self, x: Fixed, y: Fixed) -> Fixed {
        let dx = (x.0 as i64 - self.origin.0.0 as i64) * self.direction.0.0 as i64 / FRACUNIT as i64;
        let dy = (y.0 as i64 - self.origin.1.0 as i64) * self.direction.1.0 as i64 / FRACUNIT as i64;
        let z = self.origin.2.0 as i64 + (dx + dy) * self.zdelta.0 as i64 / FRACUNIT as i64;
        Fixed(z as i32)
    }
}

/// Borrowed descriptor tables, passed into every registry/emitter call that
/// has to chase a reference.
#[derive(Clone, Copy, Default)]
pub struct WorldRefs<'a> {
    pub ffloors: &'a [Ffloor],
    pub polyobjs: &'a [Polyobj],
    pub slopes: &'a [Slope],
}
