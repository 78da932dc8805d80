use anyhow::{Context, Result};

use crate::coords::Vec2;
use crate::frame::{Hierarchy, InputSink, TraverseCtx};
use crate::input::{EventResult, Interest, RoutedEvent};
use crate::physics::PhysicsWorld;

use super::entity::Entity;
use super::{
    Behavior, DrawOrder, DrawableEntity, EntityId, InputReceiverCandidate, Node, SiblingKey,
    Traversal,
};

/// Entity hierarchy.
///
/// Ids are never reused, so a stale id held by a behavior or an input
/// candidate fails lookups instead of aliasing a newer entity.
#[derive(Default)]
pub struct EntityTree {
    slots: Vec<Option<Entity>>,
    roots: Vec<EntityId>,
    next_root_order: u32,
    live: usize,
}

impl EntityTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node` under `parent` (or as a root), after its existing siblings.
    pub fn spawn(&mut self, parent: Option<EntityId>, node: Node) -> Result<EntityId> {
        let id = EntityId(self.slots.len() as u32);

        let order = match parent {
            Some(p) => {
                let parent_entity = self
                    .entity_mut(p)
                    .with_context(|| format!("cannot spawn under missing parent {p}"))?;
                let order = parent_entity.next_child_order;
                parent_entity.next_child_order += 1;
                parent_entity.children.push(id);
                order
            }
            None => {
                let order = self.next_root_order;
                self.next_root_order += 1;
                self.roots.push(id);
                order
            }
        };

        self.slots.push(Some(Entity {
            node,
            behavior: None,
            parent,
            children: Vec::new(),
            order,
            next_child_order: 0,
        }));
        self.live += 1;

        Ok(id)
    }

    /// Attaches (or replaces) the behavior of `id`.
    pub fn attach(&mut self, id: EntityId, behavior: impl Behavior + 'static) -> Result<()> {
        let entity = self
            .entity_mut(id)
            .with_context(|| format!("cannot attach behavior to missing entity {id}"))?;
        entity.behavior = Some(Box::new(behavior));
        Ok(())
    }

    /// Removes `id` and its whole subtree. Returns how many entities were removed.
    pub fn despawn(&mut self, id: EntityId) -> usize {
        let Some(parent) = self.entity(id).map(|e| e.parent) else {
            return 0;
        };

        match parent.and_then(|p| self.entity_mut(p)) {
            Some(p) => p.children.retain(|c| *c != id),
            None => self.roots.retain(|c| *c != id),
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(entity) = self.slots.get_mut(next.index()).and_then(Option::take) {
                stack.extend(entity.children);
                removed += 1;
            }
        }
        self.live -= removed;
        removed
    }

    pub fn node(&self, id: EntityId) -> Option<&Node> {
        self.entity(id).map(|e| &e.node)
    }

    pub fn node_mut(&mut self, id: EntityId) -> Option<&mut Node> {
        self.entity_mut(id).map(|e| &mut e.node)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Drops every entity and behavior.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.roots.clear();
        self.next_root_order = 0;
        self.live = 0;
    }

    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn sorted(&self, ids: &[EntityId]) -> Vec<EntityId> {
        let mut out: Vec<(SiblingKey, EntityId)> = ids
            .iter()
            .filter_map(|id| {
                self.entity(*id)
                    .map(|e| (SiblingKey::new(e.node.z, e.order), *id))
            })
            .collect();
        out.sort_by_key(|(k, _)| *k);
        out.into_iter().map(|(_, id)| id).collect()
    }

    fn visit(&mut self, id: EntityId, parent: Visit, walk: &mut Walk<'_>) {
        let Some(entity) = self.slots.get_mut(id.index()).and_then(Option::as_mut) else {
            return;
        };

        if let Some(behavior) = entity.behavior.as_mut() {
            if walk.simulate_now {
                behavior.fixed_update(&mut entity.node, walk.physics);
            }
            behavior.update(&mut entity.node, walk.dt);
        }

        let origin = entity
            .node
            .body
            .and_then(|b| walk.physics.position_px(b))
            .unwrap_or(parent.origin + entity.node.offset);
        let visible = parent.visible && entity.node.visible;

        if visible {
            let interest = entity.interest();
            let rect = entity.node.sprite_rect(origin);

            if rect.is_some() || !interest.is_empty() {
                let key = DrawOrder(walk.next_key);
                walk.next_key += 1;

                if let (Some(rect), Some(sprite)) = (rect, entity.node.sprite) {
                    walk.out.drawables.push(DrawableEntity {
                        id,
                        key,
                        rect,
                        color: sprite.color,
                    });
                }

                if !interest.is_empty() {
                    let hit_region = if interest.contains(Interest::POINTER) { rect } else { None };
                    walk.out.receivers.push(InputReceiverCandidate {
                        id,
                        key,
                        hit_region,
                        interest,
                    });
                }
            }
        }

        let children = entity.children.clone();
        let children = self.sorted(&children);
        for child in children {
            self.visit(child, Visit { origin, visible }, walk);
        }
    }
}

#[derive(Copy, Clone)]
struct Visit {
    origin: Vec2,
    visible: bool,
}

struct Walk<'a> {
    simulate_now: bool,
    dt: f32,
    physics: &'a mut PhysicsWorld,
    next_key: u32,
    out: Traversal,
}

impl Hierarchy<PhysicsWorld> for EntityTree {
    fn traverse(&mut self, ctx: TraverseCtx<'_, PhysicsWorld>) -> Traversal {
        let mut walk = Walk {
            simulate_now: ctx.simulate_now,
            dt: ctx.dt,
            physics: ctx.physics,
            next_key: 0,
            out: Traversal::new(),
        };

        let roots = self.sorted(&self.roots);
        for root in roots {
            self.visit(
                root,
                Visit {
                    origin: Vec2::zero(),
                    visible: true,
                },
                &mut walk,
            );
        }

        walk.out
    }
}

impl InputSink for EntityTree {
    fn deliver(&mut self, target: EntityId, event: &RoutedEvent) -> Result<EventResult> {
        let entity = self
            .entity_mut(target)
            .with_context(|| format!("input target {target} no longer exists"))?;

        match entity.behavior.as_mut() {
            Some(behavior) => behavior.on_input(&mut entity.node, event),
            None => Ok(EventResult::Declined),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::coords::Rect;
    use crate::input::{InputEvent, Interest};
    use crate::paint::Color;
    use crate::physics::BodyDesc;
    use crate::scene::{Sprite, ZIndex};

    fn physics() -> PhysicsWorld {
        PhysicsWorld::init(1.0 / 60.0, Vec2::zero(), 10.0).unwrap()
    }

    fn sprite(w: f32, h: f32) -> Sprite {
        Sprite::new(Vec2::new(w, h), Color::BLACK)
    }

    fn traverse(tree: &mut EntityTree, physics: &mut PhysicsWorld, simulate_now: bool) -> Traversal {
        tree.traverse(TraverseCtx {
            simulate_now,
            dt: 0.016,
            physics,
        })
    }

    fn ids(t: &Traversal) -> Vec<EntityId> {
        t.drawables.iter().map(|d| d.id).collect()
    }

    struct Clickable;

    impl Behavior for Clickable {
        fn interest(&self) -> Interest {
            Interest::POINTER
        }

        fn on_input(&mut self, node: &mut Node, _event: &RoutedEvent) -> Result<EventResult> {
            node.z = ZIndex(node.z.0 + 10);
            Ok(EventResult::Consumed)
        }
    }

    #[derive(Default)]
    struct Calls {
        fixed: u32,
        update: u32,
    }

    struct Recorder(Rc<RefCell<Calls>>);

    impl Behavior for Recorder {
        fn fixed_update(&mut self, _node: &mut Node, _physics: &mut PhysicsWorld) {
            self.0.borrow_mut().fixed += 1;
        }

        fn update(&mut self, _node: &mut Node, _dt: f32) {
            self.0.borrow_mut().update += 1;
        }
    }

    // ── ordering ────────────────────────────────────────────────────────────

    #[test]
    fn siblings_sort_by_z_then_insertion() {
        let mut tree = EntityTree::new();
        let mut phys = physics();

        let a = tree.spawn(None, Node::default().with_sprite(sprite(1.0, 1.0)).with_z(1)).unwrap();
        let b = tree.spawn(None, Node::default().with_sprite(sprite(1.0, 1.0))).unwrap();
        let c = tree.spawn(None, Node::default().with_sprite(sprite(1.0, 1.0))).unwrap();

        let t = traverse(&mut tree, &mut phys, false);
        assert_eq!(ids(&t), vec![b, c, a]);
        assert_eq!(
            t.drawables.iter().map(|d| d.key).collect::<Vec<_>>(),
            vec![DrawOrder(0), DrawOrder(1), DrawOrder(2)]
        );
    }

    #[test]
    fn parent_is_emitted_before_children_and_offsets_accumulate() {
        let mut tree = EntityTree::new();
        let mut phys = physics();

        let parent = tree
            .spawn(None, Node::at(Vec2::new(10.0, 10.0)).with_sprite(sprite(50.0, 50.0)))
            .unwrap();
        let child = tree
            .spawn(Some(parent), Node::at(Vec2::new(5.0, 0.0)).with_sprite(sprite(2.0, 2.0)))
            .unwrap();

        let t = traverse(&mut tree, &mut phys, false);
        assert_eq!(ids(&t), vec![parent, child]);
        assert_eq!(t.drawables[1].rect, Rect::new(15.0, 10.0, 2.0, 2.0));
    }

    #[test]
    fn drawable_and_receiver_share_key() {
        let mut tree = EntityTree::new();
        let mut phys = physics();

        tree.spawn(None, Node::default().with_sprite(sprite(4.0, 4.0))).unwrap();
        let card = tree.spawn(None, Node::default().with_sprite(sprite(4.0, 4.0))).unwrap();
        tree.attach(card, Clickable).unwrap();

        let t = traverse(&mut tree, &mut phys, false);
        assert_eq!(t.receivers.len(), 1);
        assert_eq!(t.receivers[0].id, card);
        assert_eq!(t.receivers[0].key, t.drawables[1].key);
        assert_eq!(t.receivers[0].hit_region, Some(t.drawables[1].rect));
        assert!(t.keys_consistent());
    }

    #[test]
    fn hidden_subtree_emits_nothing() {
        let mut tree = EntityTree::new();
        let mut phys = physics();

        let mut hidden = Node::default().with_sprite(sprite(1.0, 1.0));
        hidden.visible = false;
        let parent = tree.spawn(None, hidden).unwrap();
        let child = tree
            .spawn(Some(parent), Node::default().with_sprite(sprite(1.0, 1.0)))
            .unwrap();
        tree.attach(child, Clickable).unwrap();

        let t = traverse(&mut tree, &mut phys, false);
        assert!(t.is_empty());
    }

    // ── simulation ─────────────────────────────────────────────────────────

    #[test]
    fn fixed_update_runs_only_when_simulating() {
        let mut tree = EntityTree::new();
        let mut phys = physics();
        let calls = Rc::new(RefCell::new(Calls::default()));

        let e = tree.spawn(None, Node::default()).unwrap();
        tree.attach(e, Recorder(calls.clone())).unwrap();

        traverse(&mut tree, &mut phys, false);
        traverse(&mut tree, &mut phys, true);
        traverse(&mut tree, &mut phys, false);

        assert_eq!(calls.borrow().fixed, 1);
        assert_eq!(calls.borrow().update, 3);
    }

    #[test]
    fn body_position_replaces_offset() {
        let mut tree = EntityTree::new();
        let mut phys = physics();
        let body = phys.add_body(BodyDesc {
            position: Vec2::new(2.0, 3.0),
            ..BodyDesc::default()
        });

        tree.spawn(
            None,
            Node::at(Vec2::new(100.0, 100.0))
                .with_sprite(sprite(1.0, 1.0))
                .with_body(body),
        )
        .unwrap();

        let t = traverse(&mut tree, &mut phys, false);
        assert_eq!(t.drawables[0].rect.origin, Vec2::new(20.0, 30.0));
    }

    // ── input ──────────────────────────────────────────────────────────────

    #[test]
    fn deliver_reaches_behavior_and_reorders_next_frame() {
        let mut tree = EntityTree::new();
        let mut phys = physics();

        let a = tree.spawn(None, Node::default().with_sprite(sprite(1.0, 1.0))).unwrap();
        let b = tree.spawn(None, Node::default().with_sprite(sprite(1.0, 1.0))).unwrap();
        tree.attach(a, Clickable).unwrap();

        let ev = RoutedEvent {
            event: InputEvent::Focused(true),
            pointer: None,
        };
        assert_eq!(tree.deliver(a, &ev).unwrap(), EventResult::Consumed);
        assert_eq!(tree.deliver(b, &ev).unwrap(), EventResult::Declined);

        let t = traverse(&mut tree, &mut phys, false);
        assert_eq!(ids(&t), vec![b, a]);
    }

    #[test]
    fn deliver_to_despawned_entity_is_an_error() {
        let mut tree = EntityTree::new();
        let parent = tree.spawn(None, Node::default()).unwrap();
        let child = tree.spawn(Some(parent), Node::default()).unwrap();

        assert_eq!(tree.despawn(parent), 2);
        assert!(tree.is_empty());

        let ev = RoutedEvent {
            event: InputEvent::Focused(true),
            pointer: None,
        };
        assert!(tree.deliver(child, &ev).is_err());
    }
}
