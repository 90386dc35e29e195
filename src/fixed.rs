//! 16.16 fixed-point scalars, binary angles and the fine trig tables.
//!
//! The whole plane pipeline runs on `Fixed` except the sloped-plane solver,
//! which converts to `f32` at its boundary (see [`crate::engine::slope`]).
//! Arithmetic wraps on overflow, matching the classic renderer's behaviour.

use once_cell::sync::Lazy;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

pub const FRACBITS: i32 = 16;
pub const FRACUNIT: i32 = 1 << FRACBITS;

/// 16.16 fixed-point number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed(pub i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const UNIT: Fixed = Fixed(FRACUNIT);
    pub const MAX: Fixed = Fixed(i32::MAX);
    pub const MIN: Fixed = Fixed(i32::MIN);

    #[inline]
    pub fn from_int(v: i32) -> Fixed {
        Fixed(v.wrapping_shl(FRACBITS as u32))
    }

    #[inline]
    pub fn to_int(self) -> i32 {
        self.0 >> FRACBITS
    }

    #[inline]
    pub fn from_f32(v: f32) -> Fixed {
        Fixed((v * FRACUNIT as f32) as i32)
    }

    #[inline]
    pub fn from_f64(v: f64) -> Fixed {
        Fixed((v * FRACUNIT as f64) as i32)
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / FRACUNIT as f32
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / FRACUNIT as f64
    }

    /// FixedMul: widening multiply, keeps the middle 32 bits.
    #[inline]
    pub fn mul(self, rhs: Fixed) -> Fixed {
        Fixed(((self.0 as i64 * rhs.0 as i64) >> FRACBITS) as i32)
    }

    /// FixedDiv.  Division by zero is a programming error and panics.
    #[inline]
    pub fn div(self, rhs: Fixed) -> Fixed {
        Fixed((((self.0 as i64) << FRACBITS) / rhs.0 as i64) as i32)
    }

    #[inline]
    pub fn abs(self) -> Fixed {
        Fixed(self.0.wrapping_abs())
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed(self.0.wrapping_sub(rhs.0))
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(self.0.wrapping_neg())
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, rhs: Fixed) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, rhs: Fixed) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

/// Scale by a pixel count (span stepping).
impl Mul<i32> for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, rhs: i32) -> Fixed {
        Fixed(self.0.wrapping_mul(rhs))
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({:.4})", self.to_f64())
    }
}

/*──────────────────────────── Angles ───────────────────────────────*/

pub const FINEANGLES: usize = 8192;
pub const FINEMASK: usize = FINEANGLES - 1;
pub const ANGLETOFINESHIFT: u32 = 19;
pub const ANGLETOSKYSHIFT: u32 = 22;

/// Binary angle (full turn == 2^32).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Angle(pub u32);

pub const ANG45: Angle = Angle(0x2000_0000);
pub const ANG90: Angle = Angle(0x4000_0000);
pub const ANG180: Angle = Angle(0x8000_0000);
pub const ANG270: Angle = Angle(0xC000_0000);

impl Angle {
    pub const ZERO: Angle = Angle(0);

    pub fn from_degrees(deg: f64) -> Angle {
        Angle(((deg / 360.0) * 4294967296.0) as i64 as u32)
    }

    pub fn from_radians(rad: f64) -> Angle {
        Angle(((rad / std::f64::consts::TAU) * 4294967296.0) as i64 as u32)
    }

    #[inline]
    pub fn to_radians(self) -> f32 {
        self.0 as f32 * (std::f32::consts::TAU / 4294967296.0)
    }

    /// Index into the fine trig tables.
    #[inline]
    pub fn fine(self) -> usize {
        (self.0 >> ANGLETOFINESHIFT) as usize
    }
}

impl Add for Angle {
    type Output = Angle;
    #[inline]
    fn add(self, rhs: Angle) -> Angle {
        Angle(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Angle {
    type Output = Angle;
    #[inline]
    fn sub(self, rhs: Angle) -> Angle {
        Angle(self.0.wrapping_sub(rhs.0))
    }
}

impl fmt::Debug for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Angle({:.2}°)", self.0 as f64 * 360.0 / 4294967296.0)
    }
}

/*─────────────────────── Fine trig tables ──────────────────────────*/

// Sine for a full turn plus a quarter, so cosine is a plain offset read.
static FINESINE: Lazy<Vec<Fixed>> = Lazy::new(|| {
    (0..FINEANGLES + FINEANGLES / 4)
        .map(|i| {
            let rad = (i as f64 + 0.5) * std::f64::consts::TAU / FINEANGLES as f64;
            Fixed::from_f64(rad.sin())
        })
        .collect()
});

/// `i` must be below `FINEANGLES + FINEANGLES/4`; [`Angle::fine`] and the
/// ripple index mask both guarantee that.
#[inline]
pub fn finesine(i: usize) -> Fixed {
    FINESINE[i]
}

#[inline]
pub fn finecosine(i: usize) -> Fixed {
    FINESINE[i + FINEANGLES / 4]
}

/*──────────────────────────────── Tests ───────────────────────────────*/
