//! Core types for media-cover-sync

use serde::{Deserialize, Serialize};

/// Unique identifier for an entity that owns cover assets
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<EntityId> for i64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Which kind of entity owns a cover
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Top-level owner (artist, show)
    Primary,
    /// Child of a primary entity (album); only tracks [`AssetKind::Cover`]
    Secondary,
}

/// Cover image category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Unrecognized category; cached but never resized
    #[default]
    Unknown,
    /// Poster
    Poster,
    /// Banner
    Banner,
    /// Fanart / backdrop
    Fanart,
    /// Logo
    Logo,
    /// Disc art
    Disc,
    /// Headshot
    Headshot,
    /// Screenshot
    Screenshot,
    /// Album cover
    Cover,
}

impl AssetKind {
    /// Lowercase name used in file names and public URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Unknown => "unknown",
            AssetKind::Poster => "poster",
            AssetKind::Banner => "banner",
            AssetKind::Fanart => "fanart",
            AssetKind::Logo => "logo",
            AssetKind::Disc => "disc",
            AssetKind::Headshot => "headshot",
            AssetKind::Screenshot => "screenshot",
            AssetKind::Cover => "cover",
        }
    }

    /// Target heights of the resized variants kept for this kind, largest first
    pub fn variant_heights(&self) -> &'static [u32] {
        match self {
            AssetKind::Poster | AssetKind::Disc | AssetKind::Logo | AssetKind::Headshot => {
                &[500, 250]
            }
            AssetKind::Banner => &[70, 35],
            AssetKind::Fanart | AssetKind::Screenshot => &[360, 180],
            AssetKind::Cover => &[250],
            AssetKind::Unknown => &[],
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared cover image of an entity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Cover category
    pub kind: AssetKind,
    /// Remote source URL
    pub remote_url: String,
    /// Local public URL, filled in by [`MediaCoverService::annotate`](crate::MediaCoverService::annotate)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl AssetDescriptor {
    /// Create a descriptor with no public URL yet
    pub fn new(kind: AssetKind, remote_url: impl Into<String>) -> Self {
        Self {
            kind,
            remote_url: remote_url.into(),
            public_url: None,
        }
    }
}

/// A top-level entity (artist, show) and its declared covers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryEntity {
    /// Entity ID
    pub id: EntityId,
    /// Display name, used in log messages and events
    pub name: String,
    /// Declared covers
    #[serde(default)]
    pub images: Vec<AssetDescriptor>,
}

impl std::fmt::Display for PrimaryEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}][{}]", self.id, self.name)
    }
}

/// A child entity (album) belonging to a [`PrimaryEntity`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryEntity {
    /// Entity ID
    pub id: EntityId,
    /// Owning primary entity
    pub primary_id: EntityId,
    /// Display title, used in log messages
    pub title: String,
    /// Declared covers; only [`AssetKind::Cover`] entries are synchronized
    #[serde(default)]
    pub images: Vec<AssetDescriptor>,
}

impl std::fmt::Display for SecondaryEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}][{}]", self.id, self.title)
    }
}

/// Inbound lifecycle notification from the metadata layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A primary entity was added or refreshed
    EntityUpdated {
        /// The updated entity
        entity: PrimaryEntity,
    },
    /// A primary entity was removed
    EntityDeleted {
        /// The removed entity
        entity: PrimaryEntity,
    },
}

impl LifecycleEvent {
    /// The primary entity this event refers to
    pub fn entity(&self) -> &PrimaryEntity {
        match self {
            LifecycleEvent::EntityUpdated { entity } | LifecycleEvent::EntityDeleted { entity } => {
                entity
            }
        }
    }
}

/// Outbound event published by the service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Covers for a primary entity (and its secondaries) were synchronized
    ///
    /// Fires after every processed update, even when some assets failed.
    CoversUpdated {
        /// Primary entity ID
        entity_id: EntityId,
        /// Primary entity name
        name: String,
    },
}
