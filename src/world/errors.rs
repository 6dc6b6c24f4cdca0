use thiserror::Error;

use crate::world::types::ObjectId;

/// Errors raised by the object store and world objects.
///
/// Every variant marks a defect in engine or game-content code; none of them
/// is raised by ordinary reads of stale references, which heal silently.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OctaneError {
    /// A recipe with this name was already defined.
    #[error("duplicate object recipe: {0}")]
    DuplicateRecipe(String),

    /// Creation named a recipe that was never defined.
    #[error("unknown object recipe: {0}")]
    UnknownRecipe(String),

    /// Writing a single object reference that is already dangling.
    #[error("property '{key}' on {owner} cannot reference destroyed or detached object {target}")]
    DanglingReference {
        owner: ObjectId,
        key: String,
        target: ObjectId,
    },

    /// Indexed access past the end of an object's contents.
    #[error("content index {index} out of bounds for {owner} (len {len})")]
    ContentIndexOutOfBounds {
        owner: ObjectId,
        index: usize,
        len: usize,
    },

    /// `mark_transient` called once the game has started.
    #[error("{0} cannot be marked transient after the game has started")]
    TransientAfterStart(ObjectId),

    /// Moving an object into itself or one of its own descendants.
    #[error("moving {object} into {parent} would create a containment cycle")]
    ContainmentCycle { object: ObjectId, parent: ObjectId },

    /// Explicit destruction of a sentinel object.
    #[error("special object {0} cannot be destroyed")]
    SpecialObjectDestroyed(ObjectId),

    /// Placing a sentinel object inside another object.
    #[error("special object {0} cannot be placed inside another object")]
    SpecialObjectMoved(ObjectId),

    /// Removing the special tag from the root holder.
    #[error("root holder {0} must stay special")]
    RootHolderUntagged(ObjectId),

    /// Every `u32` index has been handed out.
    #[error("object arena exhausted after {0} allocations")]
    ArenaExhausted(usize),

    /// The id is not a swept transient held for reattachment.
    #[error("{0} is not a retained transient")]
    NotRetained(ObjectId),

    /// The handle refers to a swept or never-allocated index.
    #[error("no intact object at {0}")]
    UnknownObject(ObjectId),

    /// The root holder has not been unpacked yet.
    #[error("root holder has not been unpacked")]
    RootHolderMissing,

    /// The root holder was already unpacked for this store.
    #[error("root holder already unpacked as {0}")]
    RootHolderAlreadyUnpacked(ObjectId),

    /// Raised by game-content callbacks for their own failures.
    #[error("recipe '{recipe}' callback failed: {message}")]
    Callback { recipe: String, message: String },
}
