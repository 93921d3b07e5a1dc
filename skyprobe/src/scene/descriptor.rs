//! JSON scene descriptors.
//!
//! A descriptor is a small demo/test format: an optional terrain offset plus
//! tiles made of boxes placed in local east/north/up metres around a
//! geodetic anchor.
//!
//! ```json
//! {
//!   "name": "xiaoshan-demo",
//!   "terrain": { "height": 5.0 },
//!   "tiles": [
//!     {
//!       "id": "tower-a",
//!       "anchor": { "longitude": 120.26, "latitude": 30.18, "height": 0.0 },
//!       "boxes": [ { "min": [-10, -10, 0], "max": [10, 10, 80] } ],
//!       "attributes": { "name": "Tower A" },
//!       "load_delay_ms": 250
//!     }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use glam::DVec3;
use serde::Deserialize;
use tracing::info;

use super::source::{BoxFuture, SceneSource, SceneStream, SourceError, StaticSceneSource};
use super::tile::{FeatureAttributes, TilePayload};
use crate::geodesy::{CoordinateConverter, GeodeticInput, GeodeticPosition};
use crate::geometry::{Aabb, EllipsoidTerrain, Ray, Surface, TriangleMesh};

/// Top-level descriptor document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub terrain: Option<TerrainDescriptor>,
    #[serde(default)]
    pub tiles: Vec<TileDescriptor>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerrainDescriptor {
    /// Ground height above the ellipsoid in metres.
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TileDescriptor {
    pub id: String,
    pub anchor: GeodeticInput,
    #[serde(default)]
    pub boxes: Vec<BoxDescriptor>,
    #[serde(default)]
    pub attributes: FeatureAttributes,
    #[serde(default)]
    pub load_delay_ms: u64,
    /// Request the tile but never deliver it.
    #[serde(default)]
    pub stalled: bool,
}

/// Box corners in local metres (east, north, up) from the tile anchor.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoxDescriptor {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl SceneDescriptor {
    pub fn from_json(text: &str) -> Result<Self, SourceError> {
        serde_json::from_str(text).map_err(|e| SourceError::Invalid(e.to_string()))
    }

    /// Build an in-memory source from this descriptor.
    pub fn into_source(self, converter: &CoordinateConverter) -> Result<StaticSceneSource, SourceError> {
        let mut source = StaticSceneSource::new(self.name.unwrap_or_else(|| "scene".to_string()));

        if let Some(terrain) = self.terrain {
            if !terrain.height.is_finite() {
                return Err(SourceError::Invalid(format!(
                    "terrain height must be finite, got {}",
                    terrain.height
                )));
            }
            source = source.with_terrain(Arc::new(EllipsoidTerrain::new(
                *converter.ellipsoid(),
                terrain.height,
            )));
        }

        for tile in self.tiles {
            if tile.stalled {
                source = source.with_stalled_tile(tile.id);
                continue;
            }
            let payload = tile_payload(&tile, converter)?;
            source = source.with_delayed_tile(
                tile.id,
                payload,
                Duration::from_millis(tile.load_delay_ms),
            );
        }

        Ok(source)
    }
}

fn tile_payload(
    tile: &TileDescriptor,
    converter: &CoordinateConverter,
) -> Result<TilePayload, SourceError> {
    let anchor = GeodeticPosition::try_from(tile.anchor)
        .map_err(|e| SourceError::Invalid(format!("tile {}: {}", tile.id, e)))?;

    if tile.boxes.is_empty() {
        return Err(SourceError::Invalid(format!("tile {} has no boxes", tile.id)));
    }

    let frame = converter.local_frame(&anchor);
    let mut parts = Vec::with_capacity(tile.boxes.len());
    let mut top = f64::NEG_INFINITY;

    for b in &tile.boxes {
        let min = DVec3::from_array(b.min);
        let max = DVec3::from_array(b.max);
        if !min.is_finite() || !max.is_finite() {
            return Err(SourceError::Invalid(format!(
                "tile {} has a non-finite box corner",
                tile.id
            )));
        }
        top = top.max(min.z.max(max.z));
        parts.push(TriangleMesh::cuboid(&frame, min, max));
    }

    let surface = BoxCluster::new(parts)
        .ok_or_else(|| SourceError::Invalid(format!("tile {} has no geometry", tile.id)))?;

    Ok(TilePayload::new(Arc::new(surface))
        .with_attributes(tile.attributes.clone())
        .with_object_height(anchor.height() + top))
}

/// Several closed boxes treated as one feature.
///
/// Each box keeps its own inside test, so overlapping boxes still report a
/// zero-distance hit for a point inside either of them.
#[derive(Debug)]
struct BoxCluster {
    parts: Vec<TriangleMesh>,
    bounds: Aabb,
}

impl BoxCluster {
    fn new(parts: Vec<TriangleMesh>) -> Option<Self> {
        let bounds = parts
            .iter()
            .filter_map(|p| p.bounds())
            .reduce(|a, b| Aabb {
                min: a.min.min(b.min),
                max: a.max.max(b.max),
            })?;
        Some(Self { parts, bounds })
    }
}

impl Surface for BoxCluster {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        if !self.bounds.intersects(ray) {
            return None;
        }
        self.parts
            .iter()
            .filter_map(|p| p.intersect(ray))
            .min_by(f64::total_cmp)
    }

    fn bounds(&self) -> Option<Aabb> {
        Some(self.bounds)
    }
}

/// Where a descriptor lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    File(PathBuf),
    Url(String),
}

impl FromStr for AssetLocation {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SourceError::Invalid("empty scene location".to_string()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(AssetLocation::Url(s.to_string()))
        } else {
            Ok(AssetLocation::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetLocation::File(path) => write!(f, "{}", path.display()),
            AssetLocation::Url(url) => f.write_str(url),
        }
    }
}

/// Default limit on a whole descriptor download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Scene source backed by a JSON descriptor file or URL.
///
/// The descriptor is re-read on every open, so isolated-model queries pick
/// up edits without a restart.
#[derive(Debug, Clone)]
pub struct DescriptorSceneSource {
    location: AssetLocation,
    converter: CoordinateConverter,
    client: reqwest::Client,
}

impl DescriptorSceneSource {
    /// Create a source with the default fetch timeout.
    pub fn new(location: AssetLocation) -> Result<Self, SourceError> {
        Self::with_timeout(location, DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a source whose URL fetches give up after `timeout`.
    pub fn with_timeout(location: AssetLocation, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Http {
                url: location.to_string(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            location,
            converter: CoordinateConverter::default(),
            client,
        })
    }

    pub fn location(&self) -> &AssetLocation {
        &self.location
    }

    async fn fetch(&self) -> Result<String, SourceError> {
        match &self.location {
            AssetLocation::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| SourceError::Io {
                        path: path.clone(),
                        source,
                    })
            }
            AssetLocation::Url(url) => {
                let http_err = |e: reqwest::Error| SourceError::Http {
                    url: url.clone(),
                    reason: e.to_string(),
                };
                self.client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(http_err)?
                    .text()
                    .await
                    .map_err(http_err)
            }
        }
    }
}

impl SceneSource for DescriptorSceneSource {
    fn describe(&self) -> String {
        format!("descriptor:{}", self.location)
    }

    fn open(&self) -> BoxFuture<'_, Result<SceneStream, SourceError>> {
        Box::pin(async move {
            let text = self.fetch().await?;
            let descriptor = SceneDescriptor::from_json(&text)?;
            let source = descriptor.into_source(&self.converter)?;
            info!(
                location = %self.location,
                tiles = source.tile_count(),
                "Loaded scene descriptor"
            );
            source.open().await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::TileLoadState;
    use std::io::Write;

    const DEMO: &str = r#"{
        "name": "demo",
        "terrain": { "height": 5.0 },
        "tiles": [
            {
                "id": "tower",
                "anchor": { "longitude": 120.26, "latitude": 30.18, "height": 5.0 },
                "boxes": [
                    { "min": [-10, -10, 0], "max": [10, 10, 80] },
                    { "min": [-2, -2, 80], "max": [2, 2, 95] }
                ],
                "attributes": { "name": "Tower A", "floors": 24 }
            },
            { "id": "pending", "anchor": { "longitude": 0, "latitude": 0, "height": 0 }, "stalled": true }
        ]
    }"#;

    #[test]
    fn test_location_parsing() {
        assert_eq!(
            "https://example.com/scene.json".parse::<AssetLocation>().unwrap(),
            AssetLocation::Url("https://example.com/scene.json".into())
        );
        assert_eq!(
            "./scene.json".parse::<AssetLocation>().unwrap(),
            AssetLocation::File(PathBuf::from("./scene.json"))
        );
        assert!("  ".parse::<AssetLocation>().is_err());
    }

    #[test]
    fn test_descriptor_builds_tiles() {
        let descriptor = SceneDescriptor::from_json(DEMO).unwrap();
        let source = descriptor
            .into_source(&CoordinateConverter::default())
            .unwrap();
        assert_eq!(source.tile_count(), 2);
    }

    #[test]
    fn test_object_height_is_top_of_tallest_box() {
        let descriptor = SceneDescriptor::from_json(DEMO).unwrap();
        let payload = tile_payload(&descriptor.tiles[0], &CoordinateConverter::default()).unwrap();
        assert_eq!(payload.object_height, Some(100.0));
        assert_eq!(payload.attributes["name"], "Tower A");
    }

    #[test]
    fn test_invalid_anchor_rejected() {
        let text = r#"{ "tiles": [ { "id": "x",
            "anchor": { "longitude": 200, "latitude": 0, "height": 0 },
            "boxes": [ { "min": [0,0,0], "max": [1,1,1] } ] } ] }"#;
        let descriptor = SceneDescriptor::from_json(text).unwrap();
        let err = descriptor
            .into_source(&CoordinateConverter::default())
            .unwrap_err();
        assert!(matches!(err, SourceError::Invalid(_)));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(SceneDescriptor::from_json(r#"{ "tilez": [] }"#).is_err());
    }

    #[tokio::test]
    async fn test_open_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEMO.as_bytes()).unwrap();

        let source =
            DescriptorSceneSource::new(AssetLocation::File(file.path().to_path_buf())).unwrap();
        let mut stream = source.open().await.unwrap();
        assert_eq!(stream.name, "demo");
        assert!(stream.terrain.is_some());

        let mut loaded = 0;
        for _ in 0..3 {
            let event = stream.events.recv().await.unwrap();
            if event.target_state() == TileLoadState::Loaded {
                loaded += 1;
            }
        }
        assert_eq!(loaded, 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = DescriptorSceneSource::new(AssetLocation::File(PathBuf::from(
            "/nonexistent/skyprobe/scene.json",
        )))
        .unwrap();
        let err = source.open().await.unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    /// Accept connections on an ephemeral port and never answer them.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}/scene.json", addr)
    }

    #[tokio::test]
    async fn test_unresponsive_url_times_out() {
        let url = silent_server().await;
        let source = DescriptorSceneSource::with_timeout(
            AssetLocation::Url(url.clone()),
            Duration::from_millis(200),
        )
        .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), source.open())
            .await
            .expect("fetch outlived its timeout")
            .unwrap_err();
        match err {
            SourceError::Http { url: failed, .. } => assert_eq!(failed, url),
            other => panic!("expected http error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_open_from_url() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                DEMO.len(),
                DEMO
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let location: AssetLocation = format!("http://{}/scene.json", addr).parse().unwrap();
        let source = DescriptorSceneSource::new(location).unwrap();
        let stream = source.open().await.unwrap();
        assert_eq!(stream.name, "demo");
        assert!(stream.terrain.is_some());
    }
}
