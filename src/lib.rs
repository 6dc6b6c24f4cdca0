//! # Octane - runtime world model for interactive fiction
//!
//! Octane keeps the mutable state of an interactive-fiction game: rooms, items,
//! actors and abstract state holders, linked by a single-parent containment
//! tree and by key/value properties that may reference other objects.
//!
//! ## Features
//!
//! - **Arena identity**: objects are addressed by stable, never-reused indices.
//! - **Recipes**: named bundles of `awake`/`start`/`after_load`/`update` callbacks.
//! - **Reachability sweep**: once per turn, objects no longer contained under the
//!   root holder are retired; transient objects are retained instead.
//! - **Self-healing references**: property reads silently drop references to
//!   destroyed objects.
//!
//! ## Quick Start
//!
//! ```rust
//! use octane::world::{ObjectRecipe, ObjectStore, TurnDriver};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), octane::world::OctaneError> {
//! let mut store = ObjectStore::new();
//! let root = store.unpack_root_holder()?;
//! store.define_object_recipe("room", ObjectRecipe::new())?;
//!
//! let hall = store.create_octane_object("room", json!({ "name": "Hall" }))?;
//! store.object_mut(root)?.add(hall)?;
//!
//! let stats = TurnDriver::new(&mut store).advance()?;
//! assert_eq!(stats.swept, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`world`] - World objects, recipes, the object store and turn glue
//! - [`config`] - Configuration loading and validation
//! - [`logutil`] - Log-safe rendering of game-content strings

pub mod config;
pub mod logutil;
pub mod world;
