// Format-agnostic providers for flats, light tables and blend tables.
// The plane pipeline interacts through `FlatId`/`ColormapId` only; how the
// pixel data got here (WAD, PNG, generated) is the loader's business.

use std::collections::HashMap;

use crate::fixed::Fixed;

/// Runtime handle for a flat in the bank, stable for the bank's lifetime.
pub type FlatId = u16;

/// `FlatId` whose pixels are the checkerboard fallback.
/// Always = 0 because `FlatBank::new()` inserts it first.
pub const NO_FLAT: FlatId = 0;

/// Palette index treated as a hole by the splat span drawers.
pub const TRANSPARENT_PIXEL: u8 = 247;

/// One floor/ceiling texture: 8-bit palette indices in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Flat {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// `Some(log2(width))` when both dimensions are powers of two; the span
    /// drawers then wrap with masks instead of modulo.
    pub shift: Option<u32>,
}

impl Flat {
    pub fn new<S: Into<String>>(name: S, width: u32, height: u32, pixels: Vec<u8>) -> Result<Flat, AssetError> {
        if pixels.len() != (width * height) as usize {
            return Err(AssetError::SizeMismatch {
                expected: (width * height) as usize,
                got: pixels.len(),
            });
        }
        let shift = (width.is_power_of_two() && height.is_power_of_two()).then(|| width.trailing_zeros());
        Ok(Flat {
            name: name.into(),
            width,
            height,
            pixels,
            shift,
        })
    }
}

/// Convenience checkerboard 8×8 (dark/light grey).
impl Default for Flat {
    fn default() -> Self {
        const LIGHT_IDX: u8 = 8;
        const DARK_IDX: u8 = 16;
        let mut pix = vec![0u8; 8 * 8];
        for y in 0..8 {
            for x in 0..8 {
                pix[y * 8 + x] = if (x ^ y) & 1 == 0 { LIGHT_IDX } else { DARK_IDX };
            }
        }
        Flat::new("CHECKER", 8, 8, pix).unwrap()
    }
}

/// The sky is a texture, not a flat: the sky path draws vertical columns, so
/// pixels are stored column-major.
#[derive(Clone)]
pub struct SkyTexture {
    pub width: u32,
    pub height: u32,
    pub columns: Vec<u8>,
    pub texturemid: Fixed,
}

impl SkyTexture {
    pub fn new(width: u32, height: u32, columns: Vec<u8>, texturemid: Fixed) -> Result<SkyTexture, AssetError> {
        if columns.len() != (width * height) as usize {
            return Err(AssetError::SizeMismatch {
                expected: (width * height) as usize,
                got: columns.len(),
            });
        }
        Ok(SkyTexture {
            width,
            height,
            columns,
            texturemid,
        })
    }

    #[inline]
    pub fn column(&self, x: u32) -> &[u8] {
        let x = (x % self.width) as usize;
        &self.columns[x * self.height as usize..(x + 1) * self.height as usize]
    }
}

impl Default for SkyTexture {
    /// Flat mid-grey sky, 256×128.
    fn default() -> Self {
        SkyTexture::new(256, 128, vec![100u8; 256 * 128], Fixed::from_int(100)).unwrap()
    }
}

/// Things that can go wrong when using the banks.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssetError {
    /// Attempted to insert a second flat with an existing name.
    #[error("flat name `{0}` already present in bank")]
    Duplicate(String),

    /// Requested ID is outside `0 .. bank.len()`.
    #[error("flat id {0} out of range")]
    BadId(FlatId),

    /// Pixel buffer does not match the declared dimensions.
    #[error("pixel buffer holds {got} bytes, dimensions require {expected}")]
    SizeMismatch { expected: usize, got: usize },
}

/// Repository of flats plus the designated sky.
///
/// * Stores exactly one copy of every name.
/// * ID **0** is always the "missing" checkerboard.
/// * Access from a single thread; the renderer core is frame-synchronous.
pub struct FlatBank {
    by_name: HashMap<String, FlatId>,
    data: Vec<Flat>,
    sky_flat: FlatId,
    sky_texture: SkyTexture,
}

impl FlatBank {
    pub fn new(missing: Flat) -> Self {
        let mut by_name = HashMap::new();
        by_name.insert(missing.name.clone(), NO_FLAT);
        Self {
            by_name,
            data: vec![missing],
            sky_flat: FlatId::MAX,
            sky_texture: SkyTexture::default(),
        }
    }

    pub fn default_with_checker() -> Self {
        Self::new(Flat::default())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 1
    }

    pub fn id(&self, name: &str) -> Option<FlatId> {
        self.by_name.get(name).copied()
    }

    pub fn flat(&self, id: FlatId) -> Result<&Flat, AssetError> {
        self.data.get(id as usize).ok_or(AssetError::BadId(id))
    }

    pub fn insert(&mut self, flat: Flat) -> Result<FlatId, AssetError> {
        if self.by_name.contains_key(&flat.name) {
            return Err(AssetError::Duplicate(flat.name.clone()));
        }
        let id = self.data.len() as FlatId;
        self.by_name.insert(flat.name.clone(), id);
        self.data.push(flat);
        Ok(id)
    }

    /// Register `id` as the reserved sky surface.  A plane carrying this id
    /// is drawn through the sky column path, never as a textured span.
    pub fn mark_sky(&mut self, id: FlatId, texture: SkyTexture) {
        self.sky_flat = id;
        self.sky_texture = texture;
    }

    pub fn sky_flat(&self) -> FlatId {
        self.sky_flat
    }

    pub fn sky_texture(&self) -> &SkyTexture {
        &self.sky_texture
    }
}

/*─────────────────────────── Light tables ─────────────────────────────*/

pub const LIGHTLEVELS: i32 = 32;
pub const LIGHTSEGSHIFT: i32 = 3;
pub const MAXLIGHTZ: usize = 128;
pub const LIGHTZSHIFT: i32 = 20;
pub const NUMCOLORMAPS: usize = 32;

pub type ColormapRow = [u8; 256];

/// Handle into [`LightBank::extra`].
pub type ColormapId = u16;

/// Sector-attached colormap replacing the base shade rows (tinted water,
/// fog volumes).
#[derive(Clone)]
pub struct ExtraColormap {
    pub rows: Vec<ColormapRow>,
    pub fog: bool,
}

/// Base shade rows plus the distance-bucketed row selector.
pub struct LightBank {
    rows: Vec<ColormapRow>,
    zlight: Box<[[u8; MAXLIGHTZ]; LIGHTLEVELS as usize]>,
    extra: Vec<ExtraColormap>,
}

impl LightBank {
    /// `rows` must hold [`NUMCOLORMAPS`] shade rows, row 0 brightest.
    pub fn new(rows: Vec<ColormapRow>) -> Self {
        assert_eq!(rows.len(), NUMCOLORMAPS, "colormap must have {NUMCOLORMAPS} shade rows");
        Self {
            rows,
            zlight: build_zlight(),
            extra: Vec::new(),
        }
    }

    /// Identity colormap: every shade row maps a texel to itself.  Handy for
    /// tests where output should equal input.
    pub fn identity() -> Self {
        let mut row = [0u8; 256];
        for (i, v) in row.iter_mut().enumerate() {
            *v = i as u8;
        }
        Self::new(vec![row; NUMCOLORMAPS])
    }

    pub fn add_extra(&mut self, map: ExtraColormap) -> ColormapId {
        assert_eq!(map.rows.len(), NUMCOLORMAPS);
        let id = self.extra.len() as ColormapId;
        self.extra.push(map);
        id
    }

    pub fn extra(&self, id: ColormapId) -> &ExtraColormap {
        &self.extra[id as usize]
    }

    /// Shade row index for a light level and a distance zone.
    #[inline]
    pub fn zlight(&self, light: i32, pindex: usize) -> u8 {
        self.zlight[light as usize][pindex]
    }

    /// The whole zone table for one light level (tilted spans pick a row per
    /// pixel).
    #[inline]
    pub fn zlight_row(&self, light: i32) -> &[u8; MAXLIGHTZ] {
        &self.zlight[light as usize]
    }

    /// Shade rows, honouring an optional extra colormap.
    #[inline]
    pub fn shade_rows<'a>(&'a self, extra: Option<&'a ExtraColormap>) -> &'a [ColormapRow] {
        match extra {
            Some(e) => &e.rows,
            None => &self.rows,
        }
    }
}

/// Classic distance-light precomputation: brighter sectors fade out later.
fn build_zlight() -> Box<[[u8; MAXLIGHTZ]; LIGHTLEVELS as usize]> {
    const DISTMAP: i32 = 2;
    const LIGHTSCALESHIFT: i32 = 12;
    let mut zlight = Box::new([[0u8; MAXLIGHTZ]; LIGHTLEVELS as usize]);
    for (i, row) in zlight.iter_mut().enumerate() {
        let startmap = ((LIGHTLEVELS - 1 - i as i32) * 2 * NUMCOLORMAPS as i32) / LIGHTLEVELS;
        for (j, cell) in row.iter_mut().enumerate() {
            // scale of an object at this zone's distance, on a 320-wide view
            let dist = ((j as i64 + 1) << LIGHTZSHIFT) as i64;
            let scale = (((160 * crate::fixed::FRACUNIT as i64) << crate::fixed::FRACBITS) / dist) as i32;
            let level = (startmap - (scale >> LIGHTSCALESHIFT) / DISTMAP)
                .clamp(0, NUMCOLORMAPS as i32 - 1);
            *cell = level as u8;
        }
    }
    zlight
}

/*──────────────────────── Translucency tables ─────────────────────────*/

/// Number of graded blend strengths (10%..90%).
pub const NUMTRANSMAPS: u8 = 9;

/// 256×256 lookup: `table[(src << 8) | dst]` is the blended palette index.
pub type TransTable = [u8; 256 * 256];

pub struct TransTables {
    tables: Vec<Box<TransTable>>,
}

impl TransTables {
    /// Build the nine graded tables from a blend rule.
    /// `f(transnum, src, dst)` returns the blended palette index, where
    /// `transnum` 1 is the most opaque grade.
    pub fn build<F: Fn(u8, u8, u8) -> u8>(f: F) -> Self {
        let mut tables = Vec::with_capacity(NUMTRANSMAPS as usize);
        for t in 1..=NUMTRANSMAPS {
            let mut table: Box<TransTable> = vec![0u8; 256 * 256].into_boxed_slice().try_into().unwrap();
            for src in 0..256usize {
                for dst in 0..256usize {
                    table[(src << 8) | dst] = f(t, src as u8, dst as u8);
                }
            }
            tables.push(table);
        }
        Self { tables }
    }

    /// Tables that always yield the source texel — fully opaque blending,
    /// useful in tests.
    pub fn passthrough() -> Self {
        Self::build(|_, src, _| src)
    }

    /// `transnum` must be in `1..=NUMTRANSMAPS`.
    #[inline]
    pub fn get(&self, transnum: u8) -> &TransTable {
        &self.tables[(transnum - 1) as usize]
    }

    /// Map an 8-bit alpha onto a graded table index.
    /// `None` means invisible (skip the plane), `Some(0)` means opaque.
    pub fn alpha_to_transnum(alpha: u8) -> Option<u8> {
        match alpha {
            0..=11 => None,
            244..=255 => Some(0),
            a => {
                let t = ((255 - a as i32) * 10 + 128) / 256;
                Some(t.clamp(1, NUMTRANSMAPS as i32) as u8)
            }
        }
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
