/// Integration tests for recipe registration and the lifecycle passes:
/// awake on creation, start phases, after-load hooks and per-turn updates.

use std::cell::RefCell;
use std::rc::Rc;

use octane::world::{
    ObjectId, ObjectRecipe, ObjectStore, OctaneError, StartPhase, TurnDriver, TRANSIENT_TAG,
};
use serde_json::json;

type Journal = Rc<RefCell<Vec<String>>>;

fn setup_store() -> (ObjectStore, ObjectId) {
    let mut store = ObjectStore::new();
    let root = store.unpack_root_holder().unwrap();
    (store, root)
}

/// A recipe that writes every callback it receives into `journal`.
fn journaled_recipe(journal: &Journal) -> ObjectRecipe {
    let (awake, start, load, update) = (
        journal.clone(),
        journal.clone(),
        journal.clone(),
        journal.clone(),
    );
    ObjectRecipe::new()
        .on_awake(move |_, id, args| {
            awake
                .borrow_mut()
                .push(format!("awake {} {}", id, args["label"].as_str().unwrap_or("")));
            Ok(())
        })
        .on_start(move |_, id, phase| {
            start.borrow_mut().push(format!("start {} {:?}", id, phase));
            Ok(())
        })
        .on_after_load(move |_, id| {
            load.borrow_mut().push(format!("load {}", id));
            Ok(())
        })
        .on_update(move |_, id| {
            update.borrow_mut().push(format!("update {}", id));
            Ok(())
        })
}

#[test]
fn duplicate_recipe_is_a_configuration_error() {
    let (mut store, _) = setup_store();
    store.define_object_recipe("door", ObjectRecipe::new()).unwrap();
    assert_eq!(
        store.define_object_recipe("door", ObjectRecipe::new()),
        Err(OctaneError::DuplicateRecipe("door".into()))
    );
}

#[test]
fn create_unknown_reuses_an_existing_recipe() {
    let (mut store, _) = setup_store();
    let journal: Journal = Rc::default();
    let first = store
        .create_unknown_octane_object("bird", journaled_recipe(&journal), Some(json!({ "label": "a" })))
        .unwrap();
    // A second definition under the same name is ignored, not an error
    let second = store
        .create_unknown_octane_object("bird", ObjectRecipe::new(), Some(json!({ "label": "b" })))
        .unwrap();
    assert_eq!(
        *journal.borrow(),
        vec![format!("awake {} a", first), format!("awake {} b", second)]
    );
    assert_eq!(store.living_count(), 2);
}

#[test]
fn awake_runs_synchronously_inside_creation() {
    let (mut store, root) = setup_store();
    store
        .define_object_recipe(
            "room",
            ObjectRecipe::new().on_awake(move |store, id, args| {
                let mut room = store.object_mut(id)?;
                room.set("name", args["name"].as_str().unwrap_or("?"))?;
                room.tag("room")?;
                room.set_location(Some(root))
            }),
        )
        .unwrap();

    let hall = store
        .create_octane_object("room", json!({ "name": "Hall" }))
        .unwrap();
    let mut obj = store.object_mut(hall).unwrap();
    assert_eq!(obj.get_string("name").as_deref(), Some("Hall"));
    assert!(obj.has_tag("room"));
    assert!(obj.is_child_of(root));
}

#[test]
fn awake_errors_propagate_out_of_creation() {
    let (mut store, _) = setup_store();
    store
        .define_object_recipe(
            "cursed",
            ObjectRecipe::new().on_awake(|_, _, _| {
                Err(OctaneError::Callback {
                    recipe: "cursed".into(),
                    message: "refuses to exist".into(),
                })
            }),
        )
        .unwrap();
    assert!(matches!(
        store.create_octane_object("cursed", json!(null)),
        Err(OctaneError::Callback { .. })
    ));
}

#[test]
fn failed_awake_leaves_nothing_behind() {
    let (mut store, root) = setup_store();
    store
        .define_object_recipe(
            "half_built",
            ObjectRecipe::new()
                .on_awake(|store, id, _| {
                    let root = store.root_holder()?;
                    store.object_mut(root)?.add(id)?;
                    Err(OctaneError::Callback {
                        recipe: "half_built".into(),
                        message: "gave up midway".into(),
                    })
                })
                .on_update(|_, _| Ok(())),
        )
        .unwrap();

    let err = store.create_octane_object("half_built", json!(null));
    assert!(matches!(err, Err(OctaneError::Callback { .. })));
    let failed = ObjectId::new(1);
    assert!(store.is_destroyed(failed));
    assert!(store.object(root).unwrap().contents().is_empty());
    assert_eq!(store.living_count(), 0);

    store.solidify();
    assert_eq!(store.intact_count(), 1);
    assert!(store.object(failed).is_none());
}

#[test]
fn start_runs_once_per_phase() {
    let (mut store, root) = setup_store();
    let journal: Journal = Rc::default();
    store
        .define_object_recipe("npc", journaled_recipe(&journal))
        .unwrap();
    let npc = store.create_octane_object("npc", json!({})).unwrap();
    store.object_mut(root).unwrap().add(npc).unwrap();
    journal.borrow_mut().clear();

    assert_eq!(store.run_starts(StartPhase::Initial).unwrap(), 1);
    assert_eq!(store.run_starts(StartPhase::Initial).unwrap(), 0);
    assert_eq!(store.run_starts(StartPhase::WithTurnStep).unwrap(), 1);
    assert_eq!(store.run_starts(StartPhase::WithTurnStep).unwrap(), 0);
    assert_eq!(
        *journal.borrow(),
        vec![
            format!("start {} Initial", npc),
            format!("start {} WithTurnStep", npc)
        ]
    );
    let raw = store.object(npc).unwrap();
    assert!(raw.ran_start());
    assert!(raw.ran_start_with_turn_step());
}

#[test]
fn objects_created_by_start_are_started_in_the_same_pass() {
    let (mut store, root) = setup_store();
    let journal: Journal = Rc::default();
    store
        .define_object_recipe("sprout", journaled_recipe(&journal))
        .unwrap();
    store
        .define_object_recipe(
            "seed",
            ObjectRecipe::new().on_start(move |store, id, _| {
                let sprout = store.create_octane_object("sprout", json!({}))?;
                store.object_mut(id)?.add(sprout)
            }),
        )
        .unwrap();
    let seed = store.create_octane_object("seed", json!({})).unwrap();
    store.object_mut(root).unwrap().add(seed).unwrap();

    assert_eq!(store.run_starts(StartPhase::Initial).unwrap(), 2);
    assert!(journal
        .borrow()
        .iter()
        .any(|line| line.starts_with("start") && line.ends_with("Initial")));
}

#[test]
fn after_load_runs_for_every_intact_definer() {
    let (mut store, root) = setup_store();
    let journal: Journal = Rc::default();
    store
        .define_object_recipe("clock", journaled_recipe(&journal))
        .unwrap();
    store.define_object_recipe("rock", ObjectRecipe::new()).unwrap();
    let clock = store.create_octane_object("clock", json!({})).unwrap();
    let rock = store.create_octane_object("rock", json!({})).unwrap();
    for id in [clock, rock] {
        store.object_mut(root).unwrap().add(id).unwrap();
    }
    journal.borrow_mut().clear();

    assert_eq!(store.do_after_load().unwrap(), 1);
    assert_eq!(*journal.borrow(), vec![format!("load {}", clock)]);
}

#[test]
fn updates_follow_registration_order_and_skip_destroyed() {
    let (mut store, root) = setup_store();
    let journal: Journal = Rc::default();
    store
        .define_object_recipe("ticker", journaled_recipe(&journal))
        .unwrap();
    let ids: Vec<ObjectId> = (0..3)
        .map(|_| store.create_octane_object("ticker", json!({})).unwrap())
        .collect();
    for id in &ids {
        store.object_mut(root).unwrap().add(*id).unwrap();
    }
    journal.borrow_mut().clear();

    store.object_mut(ids[1]).unwrap().destroy().unwrap();
    assert_eq!(store.run_updates().unwrap(), 2);
    assert_eq!(
        *journal.borrow(),
        vec![format!("update {}", ids[0]), format!("update {}", ids[2])]
    );
    assert_eq!(store.living_count(), 2);
}

#[test]
fn update_can_destroy_a_later_living_object() {
    let (mut store, root) = setup_store();
    let journal: Journal = Rc::default();
    store
        .define_object_recipe("victim", journaled_recipe(&journal))
        .unwrap();
    store
        .define_object_recipe(
            "hunter",
            ObjectRecipe::new().on_update(|store, id| {
                let prey = store.object_mut(id)?.get_object("prey");
                match prey {
                    Some(prey) => store.object_mut(prey)?.destroy(),
                    None => Ok(()),
                }
            }),
        )
        .unwrap();

    let hunter = store.create_octane_object("hunter", json!({})).unwrap();
    let victim = store.create_octane_object("victim", json!({})).unwrap();
    store.object_mut(root).unwrap().add(hunter).unwrap();
    store.object_mut(root).unwrap().add(victim).unwrap();
    store.object_mut(hunter).unwrap().set("prey", victim).unwrap();
    journal.borrow_mut().clear();

    let stats = TurnDriver::new(&mut store).advance().unwrap();
    assert_eq!(stats.swept, 1);
    assert!(journal.borrow().is_empty());
    assert_eq!(store.object_mut(hunter).unwrap().get("prey").as_object(), None);
}

#[test]
fn mark_transient_after_game_start_fails() {
    let (mut store, root) = setup_store();
    store.define_object_recipe("echo", ObjectRecipe::new()).unwrap();
    let early = store.create_octane_object("echo", json!({})).unwrap();
    store.object_mut(early).unwrap().mark_transient().unwrap();
    assert!(store.object(early).unwrap().has_tag(TRANSIENT_TAG));

    store.begin_game();
    assert!(store.has_game_started());
    let late = store.create_octane_object("echo", json!({})).unwrap();
    store.object_mut(root).unwrap().add(late).unwrap();
    assert_eq!(
        store.object_mut(late).unwrap().mark_transient(),
        Err(OctaneError::TransientAfterStart(late))
    );
    assert!(!store.transient_ids().contains(&late));
}
