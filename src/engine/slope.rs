//! Sloped-plane projection math.
//!
//! This module is the crate's one floating-point island: the fixed-point
//! pipeline proved numerically hopeless for tilted surfaces, so the solver
//! works in `f32` (`glam::Vec3`) and fixed↔float conversion happens only at
//! this module's entry points.  The emitter calls [`slope_plane`] +
//! [`span_vectors`] per plane (or per row when rippling) and hands the
//! resulting [`SpanVectors`] to the drawer, which interpolates texture
//! coordinates and depth per pixel.

use glam::Vec3;

use crate::fixed::{ANG180, ANG270, Angle, FRACBITS, Fixed, finecosine, finesine};
use crate::world::ffloor::Slope;

/// Texture origin and u/v basis of a sloped plane, in view space.
pub struct SlopeVectors {
    pub origin: Vec3,
    pub u: Vec3,
    pub v: Vec3,
}

/// Cross-product span vectors consumed by the tilted span drawer:
/// at pixel `(x, y)` the interpolants are
/// `q.z + q.y*(centery - y) + q.x*(x - centerx)` for each of `su/sv/sz`.
#[derive(Clone, Copy, Default)]
pub struct SpanVectors {
    pub su: Vec3,
    pub sv: Vec3,
    pub sz: Vec3,
}

/// Texture origin of the sloped plane in view space.  The texture offsets
/// shift the origin through the slope's own height function rather than the
/// final coordinates, otherwise rotated flats drift.
fn slope_plane_origin(
    slope: &Slope,
    xpos: Fixed,
    ypos: Fixed,
    zpos: Fixed,
    xoff: Fixed,
    yoff: Fixed,
    angle: Angle,
) -> Vec3 {
    let vx = xpos.0 as i64 + xoff.0 as i64;
    let vy = ypos.0 as i64 - yoff.0 as i64;

    let vxf = vx as f32 / (1 << FRACBITS) as f32;
    let vyf = vy as f32 / (1 << FRACBITS) as f32;
    let ang = (ANG270 - angle).to_radians();

    Vec3 {
        x: vxf * ang.cos() - vyf * ang.sin(),
        z: vxf * ang.sin() + vyf * ang.cos(),
        y: (slope.z_at(-xoff, yoff) - zpos).to_f32(),
    }
}

/// All vectors necessary for drawing a sloped plane under the given view
/// snapshot and plane rotation.
pub fn slope_plane(
    slope: &Slope,
    xpos: Fixed,
    ypos: Fixed,
    zpos: Fixed,
    xoff: Fixed,
    yoff: Fixed,
    angle: Angle,
    plangle: Angle,
) -> SlopeVectors {
    let origin = slope_plane_origin(slope, xpos, ypos, zpos, xoff, yoff, angle);
    let height = slope.z_at(xpos, ypos);

    // v is the texture's y direction in view space
    let ang = (ANG180 - (angle + plangle)).to_radians();
    let mut v = Vec3 {
        x: ang.cos(),
        y: 0.0,
        z: ang.sin(),
    };
    // u is the texture's x direction in view space
    let mut u = Vec3 {
        x: ang.sin(),
        y: 0.0,
        z: -ang.cos(),
    };

    let pfine = plangle.fine();
    v.y = (slope.z_at(xpos + finesine(pfine), ypos + finecosine(pfine)) - height).to_f32();
    u.y = (slope.z_at(xpos + finecosine(pfine), ypos - finesine(pfine)) - height).to_f32();

    SlopeVectors { origin, u, v }
}

/// Cross the plane vectors into per-span interpolants.  The z components
/// carry the focal length so screen-x stepping works in pixel units, and the
/// u/v vectors are pre-scaled into 16.16 texture units.
pub fn span_vectors(sv: &SlopeVectors, focallenf: f32) -> SpanVectors {
    let mut su = sv.origin.cross(sv.v);
    let mut svec = sv.origin.cross(sv.u);
    let mut sz = sv.v.cross(sv.u);

    su.z *= focallenf;
    svec.z *= focallenf;
    sz.z *= focallenf;

    const SFMULT: f32 = 65536.0;
    su *= SFMULT;
    svec *= SFMULT;

    SpanVectors { su, sv: svec, sz }
}

/// Fold the slope origin into the texture offsets so coordinates stay small,
/// wrapping with power-of-two masks.
pub fn adjust_offsets_po2(xoffs: &mut Fixed, yoffs: &mut Fixed, origin: (Fixed, Fixed), shift: u32) {
    let modmask: i32 = (1 << (FRACBITS as u32 + shift)) - 1;

    let ox = origin.0.0 & modmask;
    let oy = -(origin.1.0 & modmask);

    xoffs.0 &= modmask;
    yoffs.0 &= modmask;

    xoffs.0 = xoffs.0.wrapping_sub(origin.0.0 - ox);
    yoffs.0 = yoffs.0.wrapping_add(origin.1.0 + oy);
}

/// Arbitrary-size variant: modulo instead of masking.
pub fn adjust_offsets_npo2(
    xoffs: &mut Fixed,
    yoffs: &mut Fixed,
    origin: (Fixed, Fixed),
    flatwidth: u32,
    flatheight: u32,
) {
    let modw = (flatwidth as i32) << FRACBITS;
    let modh = (flatheight as i32) << FRACBITS;

    let ox = origin.0.0 % modw;
    let oy = -(origin.1.0 % modh);

    xoffs.0 %= modw;
    yoffs.0 %= modh;

    xoffs.0 = xoffs.0.wrapping_sub(origin.0.0 - ox);
    yoffs.0 = yoffs.0.wrapping_add(origin.1.0 + oy);
}
