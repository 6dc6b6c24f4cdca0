/// Integration tests for the per-turn reachability sweep (`solidify`).
/// Covers the root-only world, subtree reachability through a detached parent,
/// transient retention and monotonic destruction.

use octane::world::{ObjectId, ObjectRecipe, ObjectStore, OctaneError, TurnDriver};
use serde_json::json;

fn setup_store() -> (ObjectStore, ObjectId) {
    let mut store = ObjectStore::new();
    let root = store.unpack_root_holder().unwrap();
    store.define_object_recipe("thing", ObjectRecipe::new()).unwrap();
    (store, root)
}

fn thing(store: &mut ObjectStore) -> ObjectId {
    store.create_octane_object("thing", json!({})).unwrap()
}

#[test]
fn root_holder_alone_survives_solidify() {
    let (mut store, root) = setup_store();
    let stats = store.solidify();
    assert!(!store.is_destroyed(root));
    assert_eq!(stats.swept, 0);
    assert_eq!(stats.reachable, 1);
    assert!(store.get(root).is_some());
}

#[test]
fn contained_chain_stays_alive() {
    let (mut store, root) = setup_store();
    let a = thing(&mut store);
    store.object_mut(a).unwrap().set_location(Some(root)).unwrap();
    let b = thing(&mut store);
    store.object_mut(b).unwrap().set_location(Some(a)).unwrap();

    store.solidify();
    assert!(!store.is_destroyed(a));
    assert!(!store.is_destroyed(b));
}

#[test]
fn detaching_parent_takes_its_subtree_with_it() {
    let (mut store, root) = setup_store();
    let a = thing(&mut store);
    store.object_mut(a).unwrap().set_location(Some(root)).unwrap();
    let b = thing(&mut store);
    store.object_mut(b).unwrap().set_location(Some(a)).unwrap();
    store.solidify();

    store.object_mut(a).unwrap().set_location(None).unwrap();
    // Provisional until the sweep confirms it
    assert!(store.is_destroyed(a));
    assert!(!store.is_destroyed(b));

    let stats = store.solidify();
    assert!(store.is_destroyed(a));
    assert!(store.is_destroyed(b));
    assert_eq!(stats.swept, 2);
    assert!(store.get(a).is_none());
    assert!(matches!(
        store.object_mut(b),
        Err(OctaneError::UnknownObject(id)) if id == b
    ));
}

#[test]
fn unreachable_transient_is_retained() {
    let (mut store, _root) = setup_store();
    let c = store
        .create_unknown_octane_object(
            "weather",
            ObjectRecipe::new().on_awake(|store, id, _| store.object_mut(id)?.mark_transient()),
            None,
        )
        .unwrap();

    let stats = store.solidify();
    assert!(store.is_destroyed(c));
    assert_eq!(stats.transients_retained, 1);
    assert!(store.get(c).is_none());

    let retained = store.transient(c).expect("transient should be retrievable");
    assert_eq!(retained.recipe_name(), "weather");
    assert!(retained.has_tag("transient"));
    assert!(store.transient_ids().contains(&c));
}

#[test]
fn reattaching_before_the_sweep_cancels_provisional_destruction() {
    let (mut store, root) = setup_store();
    let a = thing(&mut store);
    store.object_mut(root).unwrap().add(a).unwrap();
    store.object_mut(a).unwrap().set_location(None).unwrap();
    assert!(store.is_destroyed(a));

    store.object_mut(root).unwrap().add(a).unwrap();
    assert!(!store.is_destroyed(a));
    store.solidify();
    assert!(!store.is_destroyed(a));
}

#[test]
fn moving_into_destroyed_parent_detaches() {
    let (mut store, root) = setup_store();
    let bag = thing(&mut store);
    let coin = thing(&mut store);
    store.object_mut(root).unwrap().add(bag).unwrap();
    store.object_mut(root).unwrap().add(coin).unwrap();
    store.object_mut(bag).unwrap().destroy().unwrap();

    store.object_mut(coin).unwrap().set_location(Some(bag)).unwrap();
    assert_eq!(store.object(coin).unwrap().location(), None);
    assert!(store.is_destroyed(coin));
    assert!(!store.object(root).unwrap().contents().contains(&coin));
}

#[test]
fn destroy_taints_whole_subtree_and_is_idempotent() {
    let (mut store, root) = setup_store();
    let chest = thing(&mut store);
    let pouch = thing(&mut store);
    let gem = thing(&mut store);
    store.object_mut(root).unwrap().add(chest).unwrap();
    store.object_mut(chest).unwrap().add(pouch).unwrap();
    store.object_mut(pouch).unwrap().add(gem).unwrap();

    store.object_mut(chest).unwrap().destroy().unwrap();
    store.object_mut(chest).unwrap().destroy().unwrap();
    for id in [chest, pouch, gem] {
        assert!(store.object(id).unwrap().is_marked_for_destruction());
    }
    // Interior edges survive until the sweep
    assert_eq!(store.object(gem).unwrap().location(), Some(pouch));
    assert_eq!(store.object(chest).unwrap().location(), None);

    assert_eq!(store.solidify().swept, 3);
}

#[test]
fn root_holder_cannot_be_destroyed() {
    let (mut store, root) = setup_store();
    assert_eq!(
        store.object_mut(root).unwrap().destroy(),
        Err(OctaneError::SpecialObjectDestroyed(root))
    );
}

#[test]
fn destruction_is_monotonic_across_turns() {
    let (mut store, root) = setup_store();
    let a = thing(&mut store);
    store.object_mut(root).unwrap().add(a).unwrap();
    store.object_mut(a).unwrap().destroy().unwrap();

    let mut driver = TurnDriver::new(&mut store);
    for _ in 0..3 {
        driver.advance().unwrap();
        assert!(driver.store().is_destroyed(a));
    }
    // New objects never reuse the swept index
    let b = thing(&mut store);
    assert_ne!(a, b);
    assert!(store.is_destroyed(a));
}

#[test]
fn never_allocated_indices_resolve_to_nothing() {
    let (store, _root) = setup_store();
    assert!(store.get(999u32).is_none());
    assert!(store.is_destroyed(999u32));
    assert!(!store.is_special(999u32));
}

#[test]
fn root_holder_cannot_be_placed_inside_another_object() {
    let (mut store, root) = setup_store();
    let hall = thing(&mut store);
    let cupboard = thing(&mut store);
    store.object_mut(root).unwrap().add(hall).unwrap();

    assert_eq!(
        store.object_mut(root).unwrap().set_location(Some(cupboard)),
        Err(OctaneError::SpecialObjectMoved(root))
    );
    assert_eq!(
        store.object_mut(cupboard).unwrap().add(root),
        Err(OctaneError::SpecialObjectMoved(root))
    );
    assert_eq!(store.object(root).unwrap().location(), None);

    store.object_mut(cupboard).unwrap().destroy().unwrap();
    let stats = store.solidify();
    assert!(!store.is_destroyed(root));
    assert!(!store.is_destroyed(hall));
    assert_eq!(stats.reachable, 2);
}

#[test]
fn root_holder_keeps_its_special_tag() {
    let (mut store, root) = setup_store();
    let hall = thing(&mut store);
    store.object_mut(root).unwrap().add(hall).unwrap();

    assert_eq!(
        store.object_mut(root).unwrap().untag("special"),
        Err(OctaneError::RootHolderUntagged(root))
    );
    // Other tags come off normally
    store.object_mut(root).unwrap().tag("lit").unwrap();
    store.object_mut(root).unwrap().untag("lit").unwrap();
    assert!(!store.object(root).unwrap().has_tag("lit"));

    store.solidify();
    assert!(store.is_special(root));
    assert!(!store.is_destroyed(root));
    assert!(!store.is_destroyed(hall));
}

#[test]
fn destroying_a_container_spares_special_objects_inside_it() {
    let (mut store, root) = setup_store();
    let vault = thing(&mut store);
    let shrine = thing(&mut store);
    let relic = thing(&mut store);
    store.object_mut(root).unwrap().add(vault).unwrap();
    store.object_mut(vault).unwrap().add(shrine).unwrap();
    store.object_mut(shrine).unwrap().add(relic).unwrap();
    store.object_mut(shrine).unwrap().tag("special").unwrap();

    store.object_mut(vault).unwrap().destroy().unwrap();
    assert!(store.object(vault).unwrap().is_marked_for_destruction());
    assert!(!store.object(shrine).unwrap().is_marked_for_destruction());
    assert!(!store.object(relic).unwrap().is_marked_for_destruction());
    assert_eq!(store.object(shrine).unwrap().location(), None);

    let stats = store.solidify();
    assert_eq!(stats.swept, 1);
    assert!(store.is_destroyed(vault));
    assert!(!store.is_destroyed(shrine));
    assert!(!store.is_destroyed(relic));
}

#[test]
fn retained_transient_can_be_reinstated_under_a_new_index() {
    let (mut store, root) = setup_store();
    let ghost = store
        .create_unknown_octane_object(
            "ghost",
            ObjectRecipe::new().on_awake(|store, id, _| {
                let mut ghost = store.object_mut(id)?;
                ghost.set("mood", "restless")?;
                ghost.mark_transient()
            }),
            None,
        )
        .unwrap();
    store.solidify();
    assert!(store.transient(ghost).is_some());

    let back = store.reinstate_transient(ghost).unwrap();
    assert!(back.index() > ghost.index());
    assert!(store.is_destroyed(ghost));
    assert!(store.transient(ghost).is_none());
    assert!(store.transient_ids().contains(&back));

    store.object_mut(root).unwrap().add(back).unwrap();
    let mut handle = store.object_mut(back).unwrap();
    assert_eq!(handle.get_string("mood").as_deref(), Some("restless"));
    assert!(handle.has_tag("transient"));
    store.solidify();
    assert!(!store.is_destroyed(back));

    assert_eq!(
        store.reinstate_transient(ghost),
        Err(OctaneError::NotRetained(ghost))
    );
    assert_eq!(
        store.reinstate_transient(root),
        Err(OctaneError::NotRetained(root))
    );
}
