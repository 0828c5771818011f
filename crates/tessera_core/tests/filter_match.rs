//! Filter matching across commits.

mod common;

use common::*;
use tessera_core::ecs::{ArchetypeHash, Entity, Filter, World, WorldError};

fn entities(world: &World, filter: &Filter) -> Vec<Entity> {
    world.query(filter).iter().collect()
}

fn assert_empty(world: &World, filter: &Filter) {
    let view = world.query(filter);
    assert_eq!(view.iter().count(), 0, "filter should be empty");
    assert_eq!(view.archetypes_len(), 0);
    assert!(view.is_empty());
}

fn assert_only(world: &World, filter: &Filter, entity: Entity) {
    let view = world.query(filter);
    assert_eq!(view.len_slow(), 1);
    assert_eq!(entities(world, filter), vec![entity]);
    assert_eq!(view.archetypes_len(), 1);
}

#[test]
fn single_component_set_and_remove() {
    let mut world = World::new();
    let filter = world.filter().with::<Test1>().build(&mut world);
    let entity = world.create_entity();
    assert_empty(&world, &filter);

    world.set(entity, Test1(0)).unwrap();
    world.commit();
    assert_only(&world, &filter, entity);

    world.remove::<Test1>(entity);
    world.commit();
    assert_empty(&world, &filter);
}

#[test]
fn single_component_matches_with_extras() {
    let mut world = World::new();
    let filter = world.filter().with::<Test1>().build(&mut world);
    let entity = world.create_entity();
    world.commit();
    assert_empty(&world, &filter);

    world.set(entity, Test1(0)).unwrap();
    world.set(entity, Test2(0)).unwrap();
    world.commit();
    assert_only(&world, &filter, entity);

    world.remove::<Test1>(entity);
    world.commit();
    assert_empty(&world, &filter);
}

#[test]
fn multiple_components_match_gradually() {
    let mut world = World::new();
    let filter = world.filter().with::<Test1>().with::<Test2>().build(&mut world);
    let entity = world.create_entity();
    world.commit();

    world.set(entity, Test1(0)).unwrap();
    world.commit();
    assert_empty(&world, &filter);

    world.set(entity, Test2(0)).unwrap();
    world.commit();
    assert_only(&world, &filter, entity);

    world.remove::<Test1>(entity);
    world.commit();
    assert_empty(&world, &filter);

    world.set(entity, Test1(0)).unwrap();
    world.commit();
    assert_only(&world, &filter, entity);

    world.remove::<Test2>(entity);
    world.commit();
    assert_empty(&world, &filter);
}

#[test]
fn superset_archetypes_match() {
    let mut world = World::new();
    let filter = world.filter().with::<Test1>().with::<Test2>().build(&mut world);
    let entity = world.create_entity();
    world.set(entity, Test1(0)).unwrap();
    world.set(entity, Test2(0)).unwrap();
    world.commit();
    assert_only(&world, &filter, entity);

    world.set(entity, Test3(0)).unwrap();
    world.commit();
    assert_only(&world, &filter, entity);

    world.remove::<Test1>(entity);
    world.commit();
    assert_empty(&world, &filter);
}

#[test]
fn missing_component_does_not_match() {
    let mut world = World::new();
    let filter = world.filter().with::<Test1>().with::<Test2>().build(&mut world);
    let entity = world.create_entity();
    let t1 = ArchetypeHash::EMPTY.with::<Test1>();
    let t2 = ArchetypeHash::EMPTY.with::<Test2>();
    let t12 = t1.with::<Test2>();

    world.set(entity, Test1(0)).unwrap();
    world.commit();
    assert_eq!(world.archetype_len(t1), 1);
    assert_empty(&world, &filter);

    world.set(entity, Test2(0)).unwrap();
    world.commit();
    assert_eq!(world.archetype_len(t12), 1);
    assert_only(&world, &filter, entity);

    world.remove::<Test2>(entity);
    world.commit();
    assert_eq!(world.archetype_len(t1), 1);
    assert_eq!(world.archetype_len(t12), 0);
    assert_eq!(world.query(&filter).len_slow(), 0);
    assert_empty(&world, &filter);

    world.set(entity, Test2(0)).unwrap();
    world.commit();
    assert_only(&world, &filter, entity);

    world.remove::<Test1>(entity);
    world.commit();
    assert_eq!(world.archetype_len(t1), 0);
    assert_eq!(world.archetype_len(t12), 0);
    assert_eq!(world.archetype_len(t2), 1);
    assert_empty(&world, &filter);
}

#[test]
fn filter_built_late_sees_existing_archetypes() {
    let mut world = World::new();
    let entity = world.create_entity();
    world.set(entity, Test1(0)).unwrap();
    world.commit();

    let filter = world.filter().with::<Test1>().build(&mut world);
    assert_only(&world, &filter, entity);
}

#[test]
fn disposal_removes_match() {
    let mut world = World::new();
    let entity = world.create_entity();
    world.set(entity, Test1(0)).unwrap();
    world.commit();
    world.set(entity, Test2(0)).unwrap();
    world.commit();

    let filter = world.filter().with::<Test1>().with::<Test2>().build(&mut world);
    assert_only(&world, &filter, entity);

    world.remove_entity(entity);
    world.commit();
    assert_empty(&world, &filter);
}

#[test]
fn many_entities_iterate_in_reverse_and_leave() {
    let mut world = World::new();
    let mut created = Vec::new();
    for _ in 0..8 {
        let entity = world.create_entity();
        world.set(entity, Test1(0)).unwrap();
        world.set(entity, Test2(0)).unwrap();
        world.commit();

        // Churn must not duplicate the archetype.
        world.remove::<Test1>(entity);
        world.remove::<Test2>(entity);
        world.set(entity, Test1(0)).unwrap();
        world.set(entity, Test2(0)).unwrap();
        world.commit();
        created.push(entity);
    }

    let filter = world.filter().with::<Test1>().with::<Test2>().build(&mut world);
    let view = world.query(&filter);
    assert_eq!(view.len_slow(), 8);
    assert_eq!(view.archetypes_len(), 1);
    let expected: Vec<_> = created.iter().rev().copied().collect();
    assert_eq!(entities(&world, &filter), expected);

    for &entity in &created {
        world.remove_entity(entity);
        world.commit();
    }
    assert_empty(&world, &filter);
}

fn populated(world: &mut World, count: usize) -> Filter {
    let filter = world.filter().with::<Test1>().with::<Test2>().build(world);
    for _ in 0..count {
        let entity = world.create_entity();
        world.set(entity, Test1(0)).unwrap();
        world.set(entity, Test2(0)).unwrap();
    }
    world.commit();
    filter
}

#[test]
fn dispose_inside_iteration() {
    let mut world = World::new();
    let filter = populated(&mut world, 8);
    assert_eq!(world.query(&filter).len_slow(), 8);

    let mut cursor = filter.cursor(&world);
    let mut visited = 0;
    while let Some(entity) = cursor.next(&world) {
        world.remove_entity(entity);
        assert!(world.is_disposed(entity));
        visited += 1;
    }
    assert_eq!(visited, 8);

    // Still committed, but nothing live to yield.
    assert_eq!(world.query(&filter).len_slow(), 8);
    assert_eq!(world.query(&filter).iter().count(), 0);

    world.commit();
    assert_empty(&world, &filter);
}

#[test]
fn remove_components_inside_iteration() {
    let mut world = World::new();
    let filter = populated(&mut world, 8);

    let mut cursor = filter.cursor(&world);
    let mut visited = 0;
    while let Some(entity) = cursor.next(&world) {
        world.remove::<Test1>(entity);
        world.remove::<Test2>(entity);
        assert!(!world.is_disposed(entity));
        visited += 1;
    }
    assert_eq!(visited, 8);
    world.commit();
    assert_empty(&world, &filter);
}

#[test]
fn remove_then_set_inside_iteration_keeps_matches() {
    let mut world = World::new();
    let filter = populated(&mut world, 8);

    let mut cursor = filter.cursor(&world);
    while let Some(entity) = cursor.next(&world) {
        world.remove::<Test1>(entity);
        world.set(entity, Test1(1)).unwrap();
    }
    assert_eq!(world.commit().migrated, 0);
    assert_eq!(world.query(&filter).len_slow(), 8);
}

#[test]
fn set_then_remove_inside_iteration_keeps_matches() {
    let mut world = World::new();
    let filter = populated(&mut world, 8);
    let with_three = world
        .filter()
        .with::<Test1>()
        .with::<Test2>()
        .with::<Test3>()
        .build(&mut world);
    assert_eq!(world.query(&with_three).len_slow(), 0);

    let mut cursor = filter.cursor(&world);
    while let Some(entity) = cursor.next(&world) {
        world.set(entity, Test3(0)).unwrap();
        world.remove::<Test3>(entity);
    }
    world.commit();
    assert_eq!(world.query(&filter).len_slow(), 8);
    assert_eq!(world.query(&with_three).len_slow(), 0);
}

#[test]
#[should_panic(expected = "committed while a filter cursor")]
fn commit_during_cursor_panics() {
    let mut world = World::new();
    let filter = populated(&mut world, 2);
    let mut cursor = filter.cursor(&world);
    cursor.next(&world);
    world.commit();
    cursor.next(&world);
}

#[test]
fn cascading_excludes() {
    let mut world = World::new();
    let base = world.filter().with::<Test1>();
    let f2 = base.without::<Test2>();
    let f3 = f2.without::<Test3>();
    let f4 = f3.without::<Test4>();
    let f5 = f4.without::<Test5>();
    let f6 = f5.without::<Test6>();
    let f7 = f6.without::<Test7>();
    let f8 = f7.without::<Test8>();
    let filters: Vec<Filter> = [base, f2, f3, f4, f5, f6, f7, f8]
        .iter()
        .map(|builder| builder.build(&mut world))
        .collect();

    let entity = world.create_entity();
    world.set(entity, Test1(0)).unwrap();
    world.commit();
    for filter in &filters {
        assert_eq!(world.query(filter).len_slow(), 1);
    }

    world.remove::<Test1>(entity);
    world.commit();
    for filter in &filters {
        assert_eq!(world.query(filter).len_slow(), 0);
    }
}

#[test]
fn exclude_splits_archetypes() {
    let mut world = World::new();
    let without_two = world.filter().with::<Test1>().without::<Test2>().build(&mut world);
    let a = world.create_entity();
    let b = world.create_entity();
    world.set(a, Test1(0)).unwrap();
    world.set(b, Test1(0)).unwrap();
    world.set(b, Test2(0)).unwrap();
    world.commit();
    assert_only(&world, &without_two, a);

    world.remove::<Test2>(b);
    world.set(a, Test2(0)).unwrap();
    world.commit();
    assert_only(&world, &without_two, b);
}

#[test]
fn view_accessors() {
    let mut world = World::new();
    let filter = world.filter().with::<Test1>().build(&mut world);
    assert_eq!(world.query(&filter).first(), Err(WorldError::EmptySequence));
    assert_eq!(world.query(&filter).first_or_default(), Entity::NULL);

    let a = world.create_entity();
    let b = world.create_entity();
    world.set(a, Test1(0)).unwrap();
    world.set(b, Test1(0)).unwrap();
    world.commit();

    let view = world.query(&filter);
    assert!(view.is_not_empty());
    assert_eq!(view.first(), Ok(b));
    assert_eq!(view.get_entity(1), Ok(a));
    assert_eq!(
        view.get_entity(2),
        Err(WorldError::IndexOutOfRange { index: 2, len: 2 })
    );
    assert_eq!(view.archetype_hashes(), vec![ArchetypeHash::EMPTY.with::<Test1>()]);
    assert_eq!(view.included_offsets().len(), 1);
    let collected: Vec<Entity> = (&view).into_iter().collect();
    assert_eq!(collected, vec![b, a]);
}

#[test]
fn bulk_and_incremental_paths_agree() {
    // Early filters learn archetypes as they are created; late filters scan.
    let mut world = World::new();
    let early = [
        world.filter().with::<Test1>().build(&mut world),
        world.filter().with::<Test1>().without::<Test3>().build(&mut world),
        world.filter().without::<Test2>().build(&mut world),
    ];

    let mut spawned = Vec::new();
    for mask in 0u32..8 {
        let entity = world.create_entity();
        if mask & 1 != 0 {
            world.set(entity, Test1(mask)).unwrap();
        }
        if mask & 2 != 0 {
            world.set(entity, Test2(mask)).unwrap();
        }
        if mask & 4 != 0 {
            world.set(entity, Test3(mask)).unwrap();
        }
        spawned.push(entity);
    }
    world.commit();

    let late = [
        world.filter().with::<Test1>().build(&mut world),
        world.filter().with::<Test1>().without::<Test3>().build(&mut world),
        world.filter().without::<Test2>().build(&mut world),
    ];

    for (early, late) in early.iter().zip(&late) {
        let mut a = entities(&world, early);
        let mut b = entities(&world, late);
        a.sort_by_key(|e| e.id());
        b.sort_by_key(|e| e.id());
        assert_eq!(a, b);
    }
    assert_eq!(world.query(&late[0]).len_slow(), 4);
    assert_eq!(world.query(&late[1]).len_slow(), 2);
    assert_eq!(world.query(&late[2]).len_slow(), 4);
}

#[test]
fn filter_built_between_set_and_commit() {
    let mut world = World::new();
    let entity = world.create_entity();
    world.set(entity, Test1(0)).unwrap();

    let filter = world.filter().with::<Test1>().build(&mut world);
    assert_eq!(world.query(&filter).len_slow(), 0);

    world.commit();
    assert_eq!(world.query(&filter).len_slow(), 1);

    world.remove::<Test1>(entity);
    world.commit();
    assert_eq!(world.query(&filter).len_slow(), 0);
}

#[test]
fn removed_filters_release_archetype_backlinks() {
    let mut world = World::new();
    let entity = world.create_entity();
    world.set(entity, Test1(0)).unwrap();
    world.commit();

    let kept = world.filter().with::<Test1>().build(&mut world);
    for _ in 0..10_000 {
        let filter = world.filter().with::<Test1>().build(&mut world);
        assert_eq!(world.query(&filter).len_slow(), 1);
        world.remove_filter(filter);
    }

    let t1 = ArchetypeHash::EMPTY.with::<Test1>();
    assert_eq!(world.archetype(t1).unwrap().filters().len(), 1);

    world.set(entity, Test2(0)).unwrap();
    world.commit();
    let t12 = t1.with::<Test2>();
    assert_eq!(world.archetype(t12).unwrap().filters().len(), 1);
    assert_only(&world, &kept, entity);
}

#[test]
fn removed_filter_slot_is_reused() {
    let mut world = World::new();
    let entity = world.create_entity();
    world.set(entity, Test2(0)).unwrap();
    world.commit();

    let first = world.filter().with::<Test1>().build(&mut world);
    world.remove_filter(first);
    let second = world.filter().with::<Test2>().build(&mut world);
    assert_ne!(first, second);
    assert_only(&world, &second, entity);

    let t2 = ArchetypeHash::EMPTY.with::<Test2>();
    assert_eq!(world.archetype(t2).unwrap().filters().len(), 1);
}

#[test]
#[should_panic(expected = "was removed")]
fn query_through_removed_filter_panics() {
    let mut world = World::new();
    let filter = world.filter().with::<Test1>().build(&mut world);
    world.remove_filter(filter);
    let _ = world.query(&filter);
}

#[test]
#[should_panic(expected = "was removed")]
fn stale_handle_panics_after_slot_reuse() {
    let mut world = World::new();
    let first = world.filter().with::<Test1>().build(&mut world);
    world.remove_filter(first);
    let _second = world.filter().with::<Test1>().build(&mut world);
    let _ = world.query(&first);
}

#[test]
#[should_panic(expected = "was removed")]
fn cursor_over_removed_filter_panics() {
    let mut world = World::new();
    let entity = world.create_entity();
    world.set(entity, Test1(0)).unwrap();
    world.commit();

    let filter = world.filter().with::<Test1>().build(&mut world);
    let mut cursor = filter.cursor(&world);
    world.remove_filter(filter);
    cursor.next(&world);
}
