//! Runtime world model: world objects, recipes, the object store and its
//! per-turn reachability sweep.

pub mod errors;
pub mod object;
pub mod recipe;
pub mod store;
pub mod turn;
pub mod types;

pub use errors::OctaneError;
pub use object::{ObjectMut, WorldObject};
pub use recipe::{AwakeFn, HookFn, ObjectRecipe, RecipeRegistry, StartFn};
pub use store::ObjectStore;
pub use turn::TurnDriver;
pub use types::*;
