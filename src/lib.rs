//! A scene-graph core for page-based document design.
//!
//! The crate models a document as a tree of nodes (shapes, text boxes,
//! images, groups, pages) owned by a [`Scene`] arena. It covers:
//!
//! - the node model: signed geometry, roll/scale/skew transforms, fills,
//!   borders, effects and a sparse attribute bag
//! - containers: child management, dirty-tracked deferred layout,
//!   hit-testing, bounds aggregation and the divide (page-split) operation
//! - pages and layers: every page partitions its children into named
//!   layers that drive visibility and hit-testing
//! - the document root: page list, arrangement modes (single, double,
//!   facing, continuous), units and margins
//! - the archive protocol: the whole tree round-trips through a tagged
//!   markup format with a registry resolving element tags to node kinds
//! - a coordinator ([`scene::Viewer`]) forwarding repaint/relayout/change
//!   notifications to a host through a narrow callback trait
//!
//! ```
//! use scenedoc::scene::{NodeKind, RectData, Scene};
//!
//! let mut scene = Scene::new_letter();
//! let page = scene[scene.document()].children()[0];
//! let rect = scene.create(NodeKind::Rect(RectData { radius: 4.0 }));
//! scene.append_child(page, rect).unwrap();
//! scene.set_frame(rect, scenedoc::types::Rect::new(36.0, 36.0, 100.0, 50.0));
//!
//! let markup = scene.to_xml();
//! let restored = Scene::from_xml(&markup).unwrap();
//! assert_eq!(restored.len(), scene.len());
//! ```

pub use glam;

pub mod archive;
pub mod errors;
pub mod log;
pub mod scene;
pub mod transform;
pub mod types;

pub use errors::{ArchiveError, SceneError};
pub use scene::{NodeId, Scene};
pub use transform::Transform;
pub use types::{Rect, Unit};
