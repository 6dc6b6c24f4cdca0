//! World objects and the mutable object handle.
//!
//! [`WorldObject`] is the raw state held in the store's arena. All mutation
//! goes through [`ObjectMut`], which borrows the store so containment edges,
//! property references and tags stay consistent with the rest of the world.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::logutil::{escape_log, preview_value};
use crate::world::errors::OctaneError;
use crate::world::recipe::ObjectRecipe;
use crate::world::store::ObjectStore;
use crate::world::types::{ObjectId, PropertyValue, RecipeArgs, SPECIAL_TAG, TRANSIENT_TAG};

/// Raw state of one node in the containment tree.
#[derive(Debug, Clone)]
pub struct WorldObject {
    id: ObjectId,
    recipe_name: String,
    creation_args: RecipeArgs,
    tags: HashSet<String>,
    properties: HashMap<String, PropertyValue>,
    pub(crate) location: Option<ObjectId>,
    pub(crate) contents: Vec<ObjectId>,
    pub(crate) marked_for_destruction: bool,
    pub(crate) marked_unreachable: bool,
    pub(crate) callbacks: ObjectRecipe,
    pub(crate) ran_start: bool,
    pub(crate) ran_start_with_turn_step: bool,
}

impl WorldObject {
    pub(crate) fn new(
        id: ObjectId,
        recipe_name: &str,
        creation_args: RecipeArgs,
        callbacks: ObjectRecipe,
    ) -> Self {
        Self {
            id,
            recipe_name: recipe_name.to_string(),
            creation_args,
            tags: HashSet::new(),
            properties: HashMap::new(),
            location: None,
            contents: Vec::new(),
            marked_for_destruction: false,
            marked_unreachable: false,
            callbacks,
            ran_start: false,
            ran_start_with_turn_step: false,
        }
    }

    /// Copy of this object under `id`, detached and with clean flags.
    pub(crate) fn reinstated(&self, id: ObjectId) -> Self {
        Self {
            id,
            recipe_name: self.recipe_name.clone(),
            creation_args: self.creation_args.clone(),
            tags: self.tags.clone(),
            properties: self.properties.clone(),
            location: None,
            contents: Vec::new(),
            marked_for_destruction: false,
            marked_unreachable: false,
            callbacks: self.callbacks.clone(),
            ran_start: self.ran_start,
            ran_start_with_turn_step: self.ran_start_with_turn_step,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn recipe_name(&self) -> &str {
        &self.recipe_name
    }

    pub fn creation_args(&self) -> &RecipeArgs {
        &self.creation_args
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Raw presence check; never filters stale references.
    pub fn has_strictly(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Raw stored value, without lazy reference cleanup.
    pub fn raw_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn property_keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn location(&self) -> Option<ObjectId> {
        self.location
    }

    pub fn contents(&self) -> &[ObjectId] {
        &self.contents
    }

    pub fn is_marked_for_destruction(&self) -> bool {
        self.marked_for_destruction
    }

    pub fn is_marked_unreachable(&self) -> bool {
        self.marked_unreachable
    }

    pub fn is_destroyed(&self) -> bool {
        self.marked_for_destruction || self.marked_unreachable
    }

    pub fn is_living(&self) -> bool {
        self.callbacks.has_update()
    }

    pub fn ran_start(&self) -> bool {
        self.ran_start
    }

    pub fn ran_start_with_turn_step(&self) -> bool {
        self.ran_start_with_turn_step
    }
}

/// Mutable view of one object, borrowing the whole store.
pub struct ObjectMut<'s> {
    store: &'s mut ObjectStore,
    id: ObjectId,
}

impl<'s> ObjectMut<'s> {
    pub(crate) fn new(store: &'s mut ObjectStore, id: ObjectId) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn raw(&self) -> Option<&WorldObject> {
        self.store.object(self.id)
    }

    fn raw_mut(&mut self) -> Result<&mut WorldObject, OctaneError> {
        self.store
            .slot_mut(self.id)
            .ok_or(OctaneError::UnknownObject(self.id))
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    pub fn tag(&mut self, tag: &str) -> Result<(), OctaneError> {
        self.raw_mut()?.tags.insert(tag.to_string());
        Ok(())
    }

    /// Remove a tag. The root holder keeps its special tag.
    pub fn untag(&mut self, tag: &str) -> Result<(), OctaneError> {
        if tag == SPECIAL_TAG && self.store.is_root_holder(self.id) {
            return Err(OctaneError::RootHolderUntagged(self.id));
        }
        self.raw_mut()?.tags.remove(tag);
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.raw().is_some_and(|obj| obj.has_tag(tag))
    }

    /// Tag the object transient and register it in the transient-safety set.
    /// Only legal while the world is being constructed.
    pub fn mark_transient(&mut self) -> Result<(), OctaneError> {
        if self.store.has_game_started() {
            return Err(OctaneError::TransientAfterStart(self.id));
        }
        self.tag(TRANSIENT_TAG)?;
        self.store.register_transient(self.id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Stored value after lazy cleanup. A single reference to an alone object
    /// clears the property; alone entries are dropped from reference lists in
    /// place. Both writes happen here, on read.
    fn filtered(&mut self, key: &str) -> Option<PropertyValue> {
        let stored = self.raw()?.raw_property(key)?.clone();
        match stored {
            PropertyValue::Object(target) if self.store.is_alone(target) => {
                debug!(
                    "Clearing stale reference {}.{} -> {}",
                    self.id,
                    escape_log(key),
                    target
                );
                if let Some(obj) = self.store.slot_mut(self.id) {
                    obj.properties.remove(key);
                }
                None
            }
            PropertyValue::Objects(ids) => {
                let kept: Vec<ObjectId> = ids
                    .iter()
                    .copied()
                    .filter(|target| !self.store.is_alone(*target))
                    .collect();
                if kept.len() != ids.len() {
                    debug!(
                        "Dropped {} stale entries from {}.{}",
                        ids.len() - kept.len(),
                        self.id,
                        escape_log(key)
                    );
                    if let Some(obj) = self.store.slot_mut(self.id) {
                        obj.properties
                            .insert(key.to_string(), PropertyValue::Objects(kept.clone()));
                    }
                }
                Some(PropertyValue::Objects(kept))
            }
            other => Some(other),
        }
    }

    /// Property value, or `Null` when absent or when it pointed at a
    /// destroyed object (which also clears it).
    pub fn get(&mut self, key: &str) -> PropertyValue {
        self.filtered(key).unwrap_or_default()
    }

    pub fn get_number(&mut self, key: &str) -> Option<f64> {
        self.get(key).as_number()
    }

    pub fn get_string(&mut self, key: &str) -> Option<String> {
        match self.get(key) {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&mut self, key: &str) -> Option<bool> {
        self.get(key).as_bool()
    }

    pub fn get_object(&mut self, key: &str) -> Option<ObjectId> {
        self.get(key).as_object()
    }

    /// Store a value. Writing a single reference to an already dangling
    /// object is refused; reference lists are filtered instead.
    pub fn set(&mut self, key: &str, value: impl Into<PropertyValue>) -> Result<(), OctaneError> {
        let value: PropertyValue = value.into();
        let value = match value {
            PropertyValue::Object(target) if self.store.is_alone(target) => {
                return Err(OctaneError::DanglingReference {
                    owner: self.id,
                    key: key.to_string(),
                    target,
                });
            }
            PropertyValue::Objects(ids) => PropertyValue::Objects(
                ids.into_iter()
                    .filter(|target| !self.store.is_alone(*target))
                    .collect(),
            ),
            other => other,
        };
        if self.store.config().trace_lifecycle {
            debug!("{}.{} = {}", self.id, escape_log(key), preview_value(&value));
        }
        self.raw_mut()?.properties.insert(key.to_string(), value);
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Option<PropertyValue> {
        self.store
            .slot_mut(self.id)
            .and_then(|obj| obj.properties.remove(key))
    }

    pub fn has(&mut self, key: &str) -> bool {
        self.filtered(key).is_some()
    }

    pub fn has_strictly(&self, key: &str) -> bool {
        self.raw().is_some_and(|obj| obj.has_strictly(key))
    }

    pub fn compare(&mut self, key: &str, value: &PropertyValue) -> bool {
        self.get(key) == *value
    }

    pub fn compare_loosely(&mut self, key: &str, value: &PropertyValue) -> bool {
        self.get(key).loosely_equals(value)
    }

    // ------------------------------------------------------------------
    // Containment
    // ------------------------------------------------------------------

    pub fn location(&self) -> Option<ObjectId> {
        self.raw().and_then(WorldObject::location)
    }

    pub fn contents(&self) -> Vec<ObjectId> {
        self.raw()
            .map(|obj| obj.contents().to_vec())
            .unwrap_or_default()
    }

    pub fn content_at(&self, index: usize) -> Result<ObjectId, OctaneError> {
        let contents = self.raw().map(WorldObject::contents).unwrap_or_default();
        contents
            .get(index)
            .copied()
            .ok_or(OctaneError::ContentIndexOutOfBounds {
                owner: self.id,
                index,
                len: contents.len(),
            })
    }

    /// Reassign the parent edge.
    ///
    /// Moving under a live parent clears provisional unreachability until the
    /// next sweep re-derives it. Moving to `None` or to a destroyed parent
    /// detaches the object and marks it provisionally unreachable, unless it
    /// is special. Special objects can only ever be detached.
    pub fn set_location(&mut self, parent: Option<ObjectId>) -> Result<(), OctaneError> {
        let id = self.id;
        if parent.is_some() && self.has_tag(SPECIAL_TAG) {
            return Err(OctaneError::SpecialObjectMoved(id));
        }
        let live_parent = parent.filter(|p| !self.store.is_destroyed(*p));

        if let Some(new_parent) = live_parent {
            if new_parent == id || self.store.is_in(new_parent, id) {
                return Err(OctaneError::ContainmentCycle {
                    object: id,
                    parent: new_parent,
                });
            }
            if self.location() == Some(new_parent) {
                self.raw_mut()?.marked_unreachable = false;
                return Ok(());
            }
            self.detach()?;
            if let Some(p) = self.store.slot_mut(new_parent) {
                p.contents.push(id);
            }
            let obj = self.raw_mut()?;
            obj.location = Some(new_parent);
            obj.marked_unreachable = false;
            return Ok(());
        }

        if let Some(rejected) = parent {
            debug!("{} moved into destroyed parent {}; detaching", id, rejected);
        }
        self.detach()?;
        let obj = self.raw_mut()?;
        if !obj.has_tag(SPECIAL_TAG) {
            obj.marked_unreachable = true;
        }
        Ok(())
    }

    /// Drop the parent edge on both sides without touching reachability flags.
    fn detach(&mut self) -> Result<(), OctaneError> {
        let id = self.id;
        let old_parent = self.raw_mut()?.location.take();
        if let Some(old) = old_parent {
            if let Some(p) = self.store.slot_mut(old) {
                p.contents.retain(|child| *child != id);
            }
        }
        Ok(())
    }

    /// Move `child` under this object.
    pub fn add(&mut self, child: ObjectId) -> Result<(), OctaneError> {
        self.store.object_mut(child)?.set_location(Some(self.id))
    }

    /// Detach `child` if it is directly contained here; otherwise a no-op.
    pub fn remove(&mut self, child: ObjectId) -> Result<(), OctaneError> {
        if !self.contains(child) || child == self.id {
            return Ok(());
        }
        self.store.object_mut(child)?.set_location(None)
    }

    pub fn is_in(&self, ancestor: ObjectId) -> bool {
        self.store.is_in(self.id, ancestor)
    }

    pub fn is_child_of(&self, parent: ObjectId) -> bool {
        self.store.is_child_of(self.id, parent)
    }

    pub fn is_under_tag(&self, tag: &str) -> bool {
        self.store.is_under_tag(self.id, tag)
    }

    pub fn contains(&self, other: ObjectId) -> bool {
        self.store.contains(self.id, other)
    }

    pub fn contains_somewhere(&self, other: ObjectId) -> bool {
        self.store.contains_somewhere(self.id, other)
    }

    pub fn is_alone(&self) -> bool {
        self.store.is_alone(self.id)
    }

    pub fn is_destroyed(&self) -> bool {
        self.store.is_destroyed(self.id)
    }

    // ------------------------------------------------------------------
    // Destruction
    // ------------------------------------------------------------------

    /// Detach from the parent and taint this object's whole subtree.
    pub fn destroy(&mut self) -> Result<(), OctaneError> {
        if self.has_tag(SPECIAL_TAG) {
            return Err(OctaneError::SpecialObjectDestroyed(self.id));
        }
        self.discard()
    }

    /// Destroy without the special-object check. Used to retire an object
    /// whose construction failed.
    pub(crate) fn discard(&mut self) -> Result<(), OctaneError> {
        self.detach()?;

        // Special descendants are cut loose instead of tainted
        let mut tainted = 0usize;
        let mut rescued = Vec::new();
        let mut stack = vec![self.id];
        while let Some(id) = stack.pop() {
            let Some(obj) = self.store.slot_mut(id) else {
                continue;
            };
            if id != self.id && obj.has_tag(SPECIAL_TAG) {
                rescued.push(id);
                continue;
            }
            if !obj.marked_for_destruction {
                obj.marked_for_destruction = true;
                tainted += 1;
            }
            stack.extend(obj.contents.iter().copied());
        }
        for id in rescued {
            debug!("Special {} spared from destruction of {}", id, self.id);
            ObjectMut::new(&mut *self.store, id).detach()?;
        }
        if tainted > 0 {
            debug!("Destroyed {} ({} objects tainted)", self.id, tainted);
        }
        Ok(())
    }
}
