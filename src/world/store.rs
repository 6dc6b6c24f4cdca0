//! The object store: identity, recipes, lifecycle passes and the per-turn
//! reachability sweep.
//!
//! Objects live in an arena indexed by [`ObjectId`]. Indices are handed out
//! monotonically and never reused; a swept slot stays empty for the rest of
//! the process, so a stale id can never resolve to a different object.
//!
//! Reachability is measured from the root holder along containment edges
//! only. Property references do not keep objects alive; they are cleaned up
//! lazily when read (see [`ObjectMut::get`]).
//!
//! Construction is two-phase: [`ObjectStore::new`] builds an empty store and
//! [`ObjectStore::unpack_root_holder`] creates the root, because the root's
//! own `awake` needs a working store to tag itself.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::config::StoreConfig;
use crate::logutil::escape_log;
use crate::world::errors::OctaneError;
use crate::world::object::{ObjectMut, WorldObject};
use crate::world::recipe::{ObjectRecipe, RecipeRegistry};
use crate::world::types::{
    ObjectId, RecipeArgs, StartPhase, SweepStats, ROOT_HOLDER_RECIPE, SPECIAL_TAG, TRANSIENT_TAG,
};

/// Owner of every world object for one running game.
pub struct ObjectStore {
    config: StoreConfig,
    recipes: RecipeRegistry,
    /// Arena; `None` marks a swept slot.
    objects: Vec<Option<WorldObject>>,
    /// Objects not yet swept, in creation order.
    intact: Vec<ObjectId>,
    /// Objects with an update callback, in registration order.
    living: Vec<ObjectId>,
    transient_safety: Vec<ObjectId>,
    /// Swept transient objects, kept retrievable.
    retained: HashMap<ObjectId, WorldObject>,
    root_holder: Option<ObjectId>,
    game_started: bool,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore {
    /// First construction phase. Call [`unpack_root_holder`](Self::unpack_root_holder)
    /// before creating any game object.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            objects: Vec::with_capacity(config.initial_capacity),
            intact: Vec::with_capacity(config.initial_capacity),
            config,
            recipes: RecipeRegistry::new(),
            living: Vec::new(),
            transient_safety: Vec::new(),
            retained: HashMap::new(),
            root_holder: None,
            game_started: false,
        }
    }

    /// Second construction phase: create the root holder sentinel.
    pub fn unpack_root_holder(&mut self) -> Result<ObjectId, OctaneError> {
        if let Some(root) = self.root_holder {
            return Err(OctaneError::RootHolderAlreadyUnpacked(root));
        }
        let recipe = ObjectRecipe::new().on_awake(|store, id, _| {
            let mut root = store.object_mut(id)?;
            root.tag(SPECIAL_TAG)?;
            root.mark_transient()
        });
        let root = self.create_unknown_octane_object(ROOT_HOLDER_RECIPE, recipe, None)?;
        self.root_holder = Some(root);
        info!("Object store ready; root holder is {}", root);
        Ok(root)
    }

    /// Convenience for two-phase construction in one call.
    pub fn bootstrap(config: StoreConfig) -> Result<Self, OctaneError> {
        let mut store = Self::with_config(config);
        store.unpack_root_holder()?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The sentinel every reachability path starts from.
    pub fn root_holder(&self) -> Result<ObjectId, OctaneError> {
        self.root_holder.ok_or(OctaneError::RootHolderMissing)
    }

    // ------------------------------------------------------------------
    // Recipes and creation
    // ------------------------------------------------------------------

    pub fn define_object_recipe(&mut self, name: &str, recipe: ObjectRecipe) -> Result<(), OctaneError> {
        self.recipes.define(name, recipe)
    }

    pub fn recipes(&self) -> &RecipeRegistry {
        &self.recipes
    }

    /// Instantiate an object from a registered recipe and run its `awake`.
    pub fn create_octane_object(
        &mut self,
        recipe_name: &str,
        args: RecipeArgs,
    ) -> Result<ObjectId, OctaneError> {
        let recipe = self.recipes.get(recipe_name)?.clone();
        let id = ObjectId::from_slot(self.objects.len())
            .ok_or(OctaneError::ArenaExhausted(self.objects.len()))?;
        self.objects.push(Some(WorldObject::new(
            id,
            recipe_name,
            args.clone(),
            recipe.clone(),
        )));
        self.intact.push(id);

        if self.config.trace_lifecycle {
            debug!("Created {} from recipe '{}'", id, escape_log(recipe_name));
        }

        if let Some(awake) = &recipe.awake {
            if let Err(err) = awake(self, id, &args) {
                warn!(
                    "awake failed for {} ('{}'); discarding it: {}",
                    id,
                    escape_log(recipe_name),
                    err
                );
                ObjectMut::new(self, id).discard()?;
                return Err(err);
            }
        }
        if recipe.has_update() {
            self.living.push(id);
        }
        Ok(id)
    }

    /// Define `recipe` under `name` unless it is already known, then create.
    pub fn create_unknown_octane_object(
        &mut self,
        name: &str,
        recipe: ObjectRecipe,
        args: Option<RecipeArgs>,
    ) -> Result<ObjectId, OctaneError> {
        if !self.recipes.contains(name) {
            self.recipes.define(name, recipe)?;
        }
        self.create_octane_object(name, args.unwrap_or(RecipeArgs::Null))
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub(crate) fn slot_mut(&mut self, id: ObjectId) -> Option<&mut WorldObject> {
        self.objects.get_mut(id.slot()).and_then(Option::as_mut)
    }

    /// Raw state of any object that has not been swept yet, destroyed or not.
    pub fn object(&self, id: impl Into<ObjectId>) -> Option<&WorldObject> {
        self.objects.get(id.into().slot()).and_then(Option::as_ref)
    }

    /// Resolve an index to a live object. `None` when out of range, swept,
    /// or destroyed.
    pub fn get(&self, id: impl Into<ObjectId>) -> Option<&WorldObject> {
        self.object(id).filter(|obj| !obj.is_destroyed())
    }

    /// Mutable handle for any object that has not been swept yet.
    pub fn object_mut(&mut self, id: impl Into<ObjectId>) -> Result<ObjectMut<'_>, OctaneError> {
        let id = id.into();
        if self.object(id).is_none() {
            return Err(OctaneError::UnknownObject(id));
        }
        Ok(ObjectMut::new(self, id))
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    /// Destroyed, swept, or never allocated.
    pub fn is_destroyed(&self, target: impl Into<ObjectId>) -> bool {
        self.object(target).map_or(true, WorldObject::is_destroyed)
    }

    pub fn is_special(&self, target: impl Into<ObjectId>) -> bool {
        let id = target.into();
        self.object(id)
            .or_else(|| self.retained.get(&id))
            .is_some_and(|obj| obj.has_tag(SPECIAL_TAG))
    }

    pub fn is_root_holder(&self, target: impl Into<ObjectId>) -> bool {
        self.root_holder == Some(target.into())
    }

    /// Destroyed or detached. Property references treat alone objects as
    /// dangling. Special objects are never alone.
    pub fn is_alone(&self, target: impl Into<ObjectId>) -> bool {
        match self.object(target) {
            None => true,
            Some(obj) if obj.has_tag(SPECIAL_TAG) => false,
            Some(obj) => obj.is_destroyed() || obj.location().is_none(),
        }
    }

    /// True if `ancestor` is anywhere on the parent chain of `target`.
    pub fn is_in(&self, target: impl Into<ObjectId>, ancestor: impl Into<ObjectId>) -> bool {
        let ancestor = ancestor.into();
        let mut cursor = self.object(target).and_then(WorldObject::location);
        let mut hops = 0usize;
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            hops += 1;
            if hops > self.objects.len() {
                break;
            }
            cursor = self.object(parent).and_then(WorldObject::location);
        }
        false
    }

    pub fn is_child_of(&self, target: impl Into<ObjectId>, parent: impl Into<ObjectId>) -> bool {
        let parent = parent.into();
        self.object(target)
            .is_some_and(|obj| obj.location() == Some(parent))
    }

    /// True if `target` or one of its ancestors carries `tag`.
    pub fn is_under_tag(&self, target: impl Into<ObjectId>, tag: &str) -> bool {
        let id = target.into();
        if self.is_destroyed(id) {
            return false;
        }
        let mut cursor = Some(id);
        let mut hops = 0usize;
        while let Some(current) = cursor {
            let Some(obj) = self.object(current) else {
                return false;
            };
            if obj.has_tag(tag) {
                return true;
            }
            hops += 1;
            if hops > self.objects.len() {
                break;
            }
            cursor = obj.location();
        }
        false
    }

    /// Direct membership; every object contains itself.
    pub fn contains(&self, container: impl Into<ObjectId>, other: impl Into<ObjectId>) -> bool {
        let (container, other) = (container.into(), other.into());
        container == other || self.is_child_of(other, container)
    }

    /// Membership anywhere in the subtree; every object contains itself.
    pub fn contains_somewhere(
        &self,
        container: impl Into<ObjectId>,
        other: impl Into<ObjectId>,
    ) -> bool {
        let (container, other) = (container.into(), other.into());
        container == other || self.is_in(other, container)
    }

    // ------------------------------------------------------------------
    // Game-start flag and transients
    // ------------------------------------------------------------------

    /// After this, objects can no longer be marked transient.
    pub fn begin_game(&mut self) {
        if !self.game_started {
            info!("Game started with {} intact objects", self.intact.len());
        }
        self.game_started = true;
    }

    pub fn has_game_started(&self) -> bool {
        self.game_started
    }

    pub(crate) fn register_transient(&mut self, id: ObjectId) {
        if !self.transient_safety.contains(&id) {
            self.transient_safety.push(id);
        }
    }

    /// Ids in the transient-safety set, in registration order.
    pub fn transient_ids(&self) -> &[ObjectId] {
        &self.transient_safety
    }

    /// A transient object, whether still intact or already swept.
    pub fn transient(&self, id: impl Into<ObjectId>) -> Option<&WorldObject> {
        let id = id.into();
        if !self.transient_safety.contains(&id) {
            return None;
        }
        self.object(id).or_else(|| self.retained.get(&id))
    }

    /// Bring a swept transient back as a fresh object.
    ///
    /// The snapshot keeps its recipe, creation arguments, tags, properties
    /// and start history, but gets a new index and no containment edges; the
    /// old index stays destroyed. The caller places the returned object.
    pub fn reinstate_transient(&mut self, id: impl Into<ObjectId>) -> Result<ObjectId, OctaneError> {
        let id = id.into();
        let snapshot = self.retained.get(&id).ok_or(OctaneError::NotRetained(id))?;
        let fresh = ObjectId::from_slot(self.objects.len())
            .ok_or(OctaneError::ArenaExhausted(self.objects.len()))?;
        let obj = snapshot.reinstated(fresh);
        let living = obj.is_living();

        self.retained.remove(&id);
        self.transient_safety.retain(|t| *t != id);
        self.objects.push(Some(obj));
        self.intact.push(fresh);
        self.register_transient(fresh);
        if living {
            self.living.push(fresh);
        }
        info!("Reinstated transient {} as {}", id, fresh);
        Ok(fresh)
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    pub fn intact_ids(&self) -> &[ObjectId] {
        &self.intact
    }

    pub fn intact_count(&self) -> usize {
        self.intact.len()
    }

    pub fn living_count(&self) -> usize {
        self.living.len()
    }

    /// Number of indices ever handed out.
    pub fn allocated_count(&self) -> usize {
        self.objects.len()
    }

    // ------------------------------------------------------------------
    // Lifecycle passes
    // ------------------------------------------------------------------

    /// Run `start` for intact objects that have not run it in `phase`.
    ///
    /// Objects created by a `start` callback during this pass are started in
    /// the same pass.
    pub fn run_starts(&mut self, phase: StartPhase) -> Result<usize, OctaneError> {
        let mut started = 0usize;
        let mut i = 0usize;
        while i < self.intact.len() {
            let id = self.intact[i];
            i += 1;
            let Some(obj) = self.slot_mut(id) else {
                continue;
            };
            if obj.is_destroyed() {
                continue;
            }
            let Some(start) = obj.callbacks.start.clone() else {
                continue;
            };
            let already = match phase {
                StartPhase::Initial => &mut obj.ran_start,
                StartPhase::WithTurnStep => &mut obj.ran_start_with_turn_step,
            };
            if *already {
                continue;
            }
            *already = true;
            if self.config.trace_lifecycle {
                debug!("start({:?}) {}", phase, id);
            }
            start(self, id, phase)?;
            started += 1;
        }
        debug!("Ran {} start callbacks ({:?})", started, phase);
        Ok(started)
    }

    /// Run `after_load` once for every intact object that defines it.
    pub fn do_after_load(&mut self) -> Result<usize, OctaneError> {
        let mut ran = 0usize;
        let mut i = 0usize;
        while i < self.intact.len() {
            let id = self.intact[i];
            i += 1;
            let hook = self
                .object(id)
                .and_then(|obj| obj.callbacks.after_load.clone());
            if let Some(after_load) = hook {
                after_load(self, id)?;
                ran += 1;
            }
        }
        debug!("Ran {} after-load callbacks", ran);
        Ok(ran)
    }

    /// Run `update` for every living object, in registration order. Destroyed
    /// objects are dropped from the living list as they are met.
    pub fn run_updates(&mut self) -> Result<usize, OctaneError> {
        let mut updated = 0usize;
        let mut i = 0usize;
        while i < self.living.len() {
            let id = self.living[i];
            if self.is_destroyed(id) {
                self.living.remove(i);
                if self.config.trace_lifecycle {
                    debug!("Retired {} from the living list", id);
                }
                continue;
            }
            i += 1;
            let hook = self.object(id).and_then(|obj| obj.callbacks.update.clone());
            if let Some(update) = hook {
                update(self, id)?;
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Mark-and-sweep over the containment tree.
    ///
    /// 1. Every intact, non-special object is provisionally tainted.
    /// 2. A depth-first walk from the special objects clears the taint on
    ///    everything reachable, skipping subtrees marked for destruction.
    /// 3. Every intact, non-special object that is still destroyed leaves the
    ///    index. Transient ones move into the transient-safety set.
    pub fn solidify(&mut self) -> SweepStats {
        let mut stats = SweepStats {
            examined: self.intact.len(),
            ..SweepStats::default()
        };

        for id in &self.intact {
            if let Some(Some(obj)) = self.objects.get_mut(id.slot()) {
                if !obj.has_tag(SPECIAL_TAG) {
                    obj.marked_unreachable = true;
                }
            }
        }

        let mut visited = vec![false; self.objects.len()];
        let mut stack: Vec<ObjectId> = self
            .intact
            .iter()
            .rev()
            .copied()
            .filter(|id| self.object(*id).is_some_and(|obj| obj.has_tag(SPECIAL_TAG)))
            .collect();
        while let Some(id) = stack.pop() {
            let slot = id.slot();
            if visited.get(slot).copied().unwrap_or(true) {
                continue;
            }
            visited[slot] = true;
            let Some(Some(obj)) = self.objects.get_mut(slot) else {
                continue;
            };
            if obj.marked_for_destruction {
                continue;
            }
            obj.marked_unreachable = false;
            stats.reachable += 1;
            stack.extend(obj.contents.iter().rev().copied());
        }

        let mut survivors = Vec::with_capacity(self.intact.len());
        let mut orphaned_edges = Vec::new();
        for id in std::mem::take(&mut self.intact) {
            let doomed = match self.objects.get(id.slot()) {
                Some(Some(obj)) => !obj.has_tag(SPECIAL_TAG) && obj.is_destroyed(),
                _ => continue,
            };
            if !doomed {
                survivors.push(id);
                continue;
            }
            let Some(obj) = self.objects[id.slot()].take() else {
                continue;
            };
            stats.swept += 1;
            if let Some(parent) = obj.location() {
                orphaned_edges.push((parent, id));
            }
            if obj.has_tag(TRANSIENT_TAG) {
                if self.config.warn_on_transient_retention {
                    warn!(
                        "Transient {} ('{}') became unreachable; retained for reattachment",
                        id,
                        escape_log(obj.recipe_name())
                    );
                }
                self.register_transient(id);
                self.retained.insert(id, obj);
                stats.transients_retained += 1;
            }
        }
        self.intact = survivors;

        for (parent, child) in orphaned_edges {
            if let Some(p) = self.slot_mut(parent) {
                p.contents.retain(|c| *c != child);
            }
        }

        if stats.swept > 0 {
            info!(
                "Solidify: examined {}, reachable {}, swept {}, transients retained {}",
                stats.examined, stats.reachable, stats.swept, stats.transients_retained
            );
        } else {
            debug!(
                "Solidify: examined {}, reachable {}, nothing swept",
                stats.examined, stats.reachable
            );
        }
        stats
    }
}
