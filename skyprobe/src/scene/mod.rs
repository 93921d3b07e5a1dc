//! Streaming scene model.
//!
//! A scene is an optional terrain surface plus a set of independently
//! loadable tiles. Geometry arrives asynchronously from a [`SceneSource`] as
//! a stream of [`TileEvent`]s, which the readiness tracker applies to a
//! [`SceneAsset`]. Queries never touch the live tile map; they work on a
//! [`SceneSnapshot`] taken under a read lock.

mod asset;
mod descriptor;
mod source;
mod tile;

pub use asset::{LoadProgress, LoadedTile, SceneAsset, SceneSnapshot};
pub use descriptor::{
    AssetLocation, BoxDescriptor, DescriptorSceneSource, DEFAULT_FETCH_TIMEOUT, SceneDescriptor, TerrainDescriptor,
    TileDescriptor,
};
pub use source::{BoxFuture, SceneSource, SceneStream, SourceError, StaticSceneSource, StaticTile};
pub use tile::{
    FeatureAttributes, Tile, TileEvent, TileId, TileLoadState, TilePayload, TransitionError,
};
