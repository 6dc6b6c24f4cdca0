//! Object recipes and the lifecycle callback contract.
//!
//! A recipe is a named bundle of up to four callbacks that every object
//! created under that name is bound to:
//!
//! * `awake(store, id, args)` runs synchronously inside creation, once.
//! * `start(store, id, phase)` runs at most once per [`StartPhase`].
//! * `after_load(store, id)` runs from `do_after_load`, for post-load hookup.
//! * `update(store, id)` runs every turn while the object is intact; objects
//!   whose recipe has one are registered as living.
//!
//! Callbacks receive the store itself so they can create, move and tag
//! objects. Errors they return are fatal to the pass that invoked them.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::logutil::escape_log;
use crate::world::errors::OctaneError;
use crate::world::store::ObjectStore;
use crate::world::types::{ObjectId, RecipeArgs, StartPhase};

pub type AwakeFn = Rc<dyn Fn(&mut ObjectStore, ObjectId, &RecipeArgs) -> Result<(), OctaneError>>;
pub type StartFn = Rc<dyn Fn(&mut ObjectStore, ObjectId, StartPhase) -> Result<(), OctaneError>>;
pub type HookFn = Rc<dyn Fn(&mut ObjectStore, ObjectId) -> Result<(), OctaneError>>;

/// Lifecycle callbacks for one kind of world object.
#[derive(Clone, Default)]
pub struct ObjectRecipe {
    pub(crate) awake: Option<AwakeFn>,
    pub(crate) start: Option<StartFn>,
    pub(crate) after_load: Option<HookFn>,
    pub(crate) update: Option<HookFn>,
}

impl ObjectRecipe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_awake<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ObjectStore, ObjectId, &RecipeArgs) -> Result<(), OctaneError> + 'static,
    {
        self.awake = Some(Rc::new(f));
        self
    }

    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ObjectStore, ObjectId, StartPhase) -> Result<(), OctaneError> + 'static,
    {
        self.start = Some(Rc::new(f));
        self
    }

    pub fn on_after_load<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ObjectStore, ObjectId) -> Result<(), OctaneError> + 'static,
    {
        self.after_load = Some(Rc::new(f));
        self
    }

    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ObjectStore, ObjectId) -> Result<(), OctaneError> + 'static,
    {
        self.update = Some(Rc::new(f));
        self
    }

    pub fn has_awake(&self) -> bool {
        self.awake.is_some()
    }

    pub fn has_start(&self) -> bool {
        self.start.is_some()
    }

    pub fn has_after_load(&self) -> bool {
        self.after_load.is_some()
    }

    /// Objects of recipes with an update callback join the living list.
    pub fn has_update(&self) -> bool {
        self.update.is_some()
    }
}

impl fmt::Debug for ObjectRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRecipe")
            .field("awake", &self.has_awake())
            .field("start", &self.has_start())
            .field("after_load", &self.has_after_load())
            .field("update", &self.has_update())
            .finish()
    }
}

/// Write-once mapping from recipe name to callbacks.
#[derive(Debug, Default)]
pub struct RecipeRegistry {
    recipes: HashMap<String, ObjectRecipe>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `recipe` under `name`. Names can only be defined once.
    pub fn define(&mut self, name: &str, recipe: ObjectRecipe) -> Result<(), OctaneError> {
        if self.recipes.contains_key(name) {
            return Err(OctaneError::DuplicateRecipe(name.to_string()));
        }
        debug!("Defined object recipe '{}' ({:?})", escape_log(name), recipe);
        self.recipes.insert(name.to_string(), recipe);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ObjectRecipe, OctaneError> {
        self.recipes
            .get(name)
            .ok_or_else(|| OctaneError::UnknownRecipe(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
