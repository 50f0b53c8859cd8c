//! Property tests for the entity registry.
//!
//! Random sequences of structural operations are applied to a registry with
//! several cached queries already registered; after every operation each
//! cached set must equal exactly the set of active entities satisfying its
//! predicate.

use std::collections::HashSet;

use arcadia_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum RegistryOp {
    Create,
    Spawn(Vec<ComponentKind>, Vec<Tag>),
    Destroy(usize),
    DestroyTwice(usize),
    AddComponent(usize, ComponentKind),
    RemoveComponent(usize, ComponentKind),
    AddTag(usize, Tag),
    RemoveTag(usize, Tag),
    Defer(usize),
    Flush,
}

fn kind_strategy() -> impl Strategy<Value = ComponentKind> {
    prop::sample::select(ComponentKind::ALL.to_vec())
}

fn tag_strategy() -> impl Strategy<Value = Tag> {
    prop::sample::select(Tag::ALL.to_vec())
}

fn op_strategy() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        Just(RegistryOp::Create),
        (
            prop::collection::vec(kind_strategy(), 0..4),
            prop::collection::vec(tag_strategy(), 0..3)
        )
            .prop_map(|(kinds, tags)| RegistryOp::Spawn(kinds, tags)),
        (0..64usize).prop_map(RegistryOp::Destroy),
        (0..64usize).prop_map(RegistryOp::DestroyTwice),
        (0..64usize, kind_strategy()).prop_map(|(i, k)| RegistryOp::AddComponent(i, k)),
        (0..64usize, kind_strategy()).prop_map(|(i, k)| RegistryOp::RemoveComponent(i, k)),
        (0..64usize, tag_strategy()).prop_map(|(i, t)| RegistryOp::AddTag(i, t)),
        (0..64usize, tag_strategy()).prop_map(|(i, t)| RegistryOp::RemoveTag(i, t)),
        (0..64usize).prop_map(RegistryOp::Defer),
        Just(RegistryOp::Flush),
    ]
}

fn predicates() -> Vec<Query> {
    vec![
        Query::all(&[ComponentKind::Transform, ComponentKind::Collider]),
        Query::all(&[ComponentKind::Transform, ComponentKind::Velocity]),
        Query::all(&[ComponentKind::Behavior, ComponentKind::AiState]),
        Query::any(&[ComponentKind::Health, ComponentKind::Lifetime]),
        Query::all(&[ComponentKind::Transform]).with_tag(Tag::Enemy),
        Query::default().with_tag(Tag::Bullet),
    ]
}

fn pick(ids: &[EntityId], i: usize) -> Option<EntityId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[i % ids.len()])
    }
}

fn check_caches(registry: &mut EntityRegistry, queries: &[Query]) -> Result<(), TestCaseError> {
    let records: Vec<(EntityId, ComponentMask, TagSet)> = registry
        .iter()
        .map(|r| (r.id(), r.components().mask(), r.tags()))
        .collect();

    for q in queries {
        let cached: HashSet<EntityId> = registry.query(*q).iter().copied().collect();
        prop_assert_eq!(cached.len(), registry.query(*q).len(), "duplicate ids in cache");
        let expected: HashSet<EntityId> = records
            .iter()
            .filter(|(_, mask, tags)| q.matches(*mask, *tags))
            .map(|(id, _, _)| *id)
            .collect();
        prop_assert_eq!(cached, expected, "query {:?} drifted", q);
    }

    for tag in Tag::ALL {
        let cached: HashSet<EntityId> = registry.get_by_tag(tag).iter().copied().collect();
        let expected: HashSet<EntityId> = records
            .iter()
            .filter(|(_, _, tags)| tags.contains(tag))
            .map(|(id, _, _)| *id)
            .collect();
        prop_assert_eq!(cached, expected, "tag index {} drifted", tag);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn cached_queries_match_predicates(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut registry = EntityRegistry::new();
        let queries = predicates();
        for q in &queries {
            registry.query(*q);
        }
        let mut known: Vec<EntityId> = Vec::new();

        for op in ops {
            match op {
                RegistryOp::Create => known.push(registry.create_entity()),
                RegistryOp::Spawn(kinds, tags) => {
                    let components = kinds.into_iter().map(Component::default_for);
                    known.push(registry.spawn(&tags, components));
                }
                RegistryOp::Destroy(i) => {
                    if let Some(id) = pick(&known, i) {
                        registry.destroy_entity(id);
                    }
                }
                RegistryOp::DestroyTwice(i) => {
                    if let Some(id) = pick(&known, i) {
                        registry.destroy_entity(id);
                        let stats = registry.pool_stats();
                        prop_assert!(!registry.destroy_entity(id));
                        prop_assert_eq!(registry.pool_stats(), stats);
                    }
                }
                RegistryOp::AddComponent(i, kind) => {
                    if let Some(id) = pick(&known, i) {
                        let _ = registry.add_component(id, Component::default_for(kind));
                    }
                }
                RegistryOp::RemoveComponent(i, kind) => {
                    if let Some(id) = pick(&known, i) {
                        let _ = registry.remove_component(id, kind);
                    }
                }
                RegistryOp::AddTag(i, tag) => {
                    if let Some(id) = pick(&known, i) {
                        let _ = registry.add_tag(id, tag);
                    }
                }
                RegistryOp::RemoveTag(i, tag) => {
                    if let Some(id) = pick(&known, i) {
                        let _ = registry.remove_tag(id, tag);
                    }
                }
                RegistryOp::Defer(i) => {
                    if let Some(id) = pick(&known, i) {
                        registry.defer_destroy(id);
                    }
                }
                RegistryOp::Flush => {
                    registry.flush_deferred();
                }
            }

            check_caches(&mut registry, &queries)?;
            let live = known.iter().filter(|id| registry.is_active(**id)).count();
            prop_assert_eq!(registry.active_count(), live);
        }
    }

    #[test]
    fn lazily_created_query_sees_existing_entities(
        spawns in prop::collection::vec(prop::collection::vec(kind_strategy(), 0..5), 0..40),
    ) {
        let mut registry = EntityRegistry::new();
        for kinds in spawns {
            registry.spawn(&[], kinds.into_iter().map(Component::default_for));
        }
        check_caches(&mut registry, &predicates())?;
    }

    #[test]
    fn destroyed_components_return_to_pool_exactly_once(
        kind_sets in prop::collection::vec(prop::collection::vec(kind_strategy(), 1..6), 1..20),
    ) {
        let mut registry = EntityRegistry::new();
        let mut attached = 0usize;
        let ids: Vec<EntityId> = kind_sets
            .into_iter()
            .map(|kinds| {
                // A repeated kind overwrites in place and takes nothing from the pool.
                attached += kinds.iter().copied().collect::<HashSet<ComponentKind>>().len();
                registry.spawn(&[], kinds.into_iter().map(Component::default_for))
            })
            .collect();

        let live = registry.pool_stats();
        prop_assert_eq!(live.components_created - live.components_available, attached);

        for id in &ids {
            registry.destroy_entity(*id);
            registry.destroy_entity(*id);
        }
        let stats = registry.pool_stats();
        prop_assert_eq!(stats.components_available, stats.components_created);
        prop_assert_eq!(registry.active_count(), 0);
    }
}
