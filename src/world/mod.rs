pub mod assets;
pub mod ffloor;
pub mod view;

pub use assets::{
    AssetError, ColormapId, ColormapRow, ExtraColormap, Flat, FlatBank, FlatId, LIGHTLEVELS,
    LIGHTSEGSHIFT, LIGHTZSHIFT, LightBank, MAXLIGHTZ, NO_FLAT, NUMCOLORMAPS, NUMTRANSMAPS,
    SkyTexture, TRANSPARENT_PIXEL, TransTable, TransTables,
};
pub use ffloor::{
    Ffloor, FfloorFlags, FfloorId, PolyFlags, Polyobj, PolyobjId, Slope, SlopeId, WorldRefs,
};
pub use view::ViewFrame;
