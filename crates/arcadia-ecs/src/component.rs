//! The closed set of component kinds and their data records.
//!
//! Components are plain data. Every kind has a fixed slot in
//! [`ComponentKind`], an entity stores them in a [`ComponentSet`] (one
//! `Option` per kind), and typed access goes through [`ComponentData`].
//! Because the set is indexed by kind, an entity can never hold two
//! instances of the same component type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// ComponentKind
// ---------------------------------------------------------------------------

/// Identifies one component type. The discriminant is the storage index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Transform = 0,
    Velocity = 1,
    Collider = 2,
    Health = 3,
    Lifetime = 4,
    Projectile = 5,
    Enemy = 6,
    AiState = 7,
    Behavior = 8,
}

impl ComponentKind {
    /// Number of component kinds.
    pub const COUNT: usize = 9;

    /// Every kind, in index order.
    pub const ALL: [ComponentKind; Self::COUNT] = [
        ComponentKind::Transform,
        ComponentKind::Velocity,
        ComponentKind::Collider,
        ComponentKind::Health,
        ComponentKind::Lifetime,
        ComponentKind::Projectile,
        ComponentKind::Enemy,
        ComponentKind::AiState,
        ComponentKind::Behavior,
    ];

    /// Storage index of this kind.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit for this kind inside a [`ComponentMask`].
    #[inline]
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Stable lowercase name, used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Transform => "transform",
            ComponentKind::Velocity => "velocity",
            ComponentKind::Collider => "collider",
            ComponentKind::Health => "health",
            ComponentKind::Lifetime => "lifetime",
            ComponentKind::Projectile => "projectile",
            ComponentKind::Enemy => "enemy",
            ComponentKind::AiState => "ai_state",
            ComponentKind::Behavior => "behavior",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ComponentMask
// ---------------------------------------------------------------------------

/// A set of component kinds packed into a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentMask(u32);

impl ComponentMask {
    /// The empty mask.
    pub const EMPTY: ComponentMask = ComponentMask(0);

    /// Build a mask from a list of kinds.
    pub fn of(kinds: &[ComponentKind]) -> Self {
        Self(kinds.iter().fold(0, |acc, k| acc | k.bit()))
    }

    pub fn insert(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: ComponentKind) {
        self.0 &= !kind.bit();
    }

    pub fn contains(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// `true` if every kind in `other` is also in `self`.
    pub fn contains_all(self, other: ComponentMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` if `self` and `other` share at least one kind.
    pub fn intersects(self, other: ComponentMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the kinds in this mask, in index order.
    pub fn kinds(self) -> impl Iterator<Item = ComponentKind> {
        ComponentKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

// ---------------------------------------------------------------------------
// Collision layers
// ---------------------------------------------------------------------------

/// Bits used in [`Collider::layer`] and [`Collider::mask`].
pub mod layers {
    pub const NONE: u32 = 0;
    pub const PLAYER: u32 = 1 << 0;
    pub const ENEMY: u32 = 1 << 1;
    pub const BULLET: u32 = 1 << 2;
    pub const ENEMY_BULLET: u32 = 1 << 3;
    pub const PICKUP: u32 = 1 << 4;
    pub const STRUCTURE: u32 = 1 << 5;
}

// ---------------------------------------------------------------------------
// Component records
// ---------------------------------------------------------------------------

/// World-space position and facing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    /// Facing in radians.
    pub rotation: f32,
}

impl Transform {
    pub fn at(x: f32, y: f32) -> Self {
        Self { x, y, rotation: 0.0 }
    }

    pub fn distance_squared(&self, x: f32, y: f32) -> f32 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// Linear velocity in world units per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }
}

/// Circle collider with layer-masked filtering.
///
/// `layer` says what this entity *is*, `mask` says what it *hits*.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub radius: f32,
    pub layer: u32,
    pub mask: u32,
}

impl Collider {
    pub fn new(radius: f32, layer: u32, mask: u32) -> Self {
        Self { radius, layer, mask }
    }

    /// One-sided declaration is enough: either side's mask matching the
    /// other's layer makes the pair collide.
    #[inline]
    pub fn interacts_with(&self, other: &Collider) -> bool {
        (self.mask & other.layer) != 0 || (other.mask & self.layer) != 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }
}

/// Seconds left before the entity expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifetime {
    pub remaining: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub damage: f32,
    pub owner: Option<EntityId>,
    pub config_id: Option<u32>,
}

/// Enemy archetypes with distinct behaviors and tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyVariant {
    /// Seeks out panels and drills into them.
    #[default]
    Driller,
    /// Chases and shoots the player.
    Hunter,
    /// Wanders, teleports, and releases projectile bursts.
    Daemon,
}

impl EnemyVariant {
    pub const ALL: [EnemyVariant; 3] = [EnemyVariant::Driller, EnemyVariant::Hunter, EnemyVariant::Daemon];

    pub fn name(self) -> &'static str {
        match self {
            EnemyVariant::Driller => "driller",
            EnemyVariant::Hunter => "hunter",
            EnemyVariant::Daemon => "daemon",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub variant: EnemyVariant,
    /// While spawning the enemy neither collides nor thinks.
    pub spawning: bool,
    pub spawn_timer: f32,
}

impl Enemy {
    pub fn spawning(variant: EnemyVariant, duration: f32) -> Self {
        Self {
            variant,
            spawning: duration > 0.0,
            spawn_timer: duration,
        }
    }

    pub fn ready(variant: EnemyVariant) -> Self {
        Self::spawning(variant, 0.0)
    }
}

/// Index into a behavior library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeId(pub u32);

/// Maps an entity to the behavior tree it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub tree: TreeId,
}

// ---------------------------------------------------------------------------
// AiState
// ---------------------------------------------------------------------------

/// Stable key for a per-entity memory slot (resumable node progress).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemorySlot(pub u16);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiMode {
    #[default]
    Idle,
    Seeking,
    Attacking,
    Cooldown,
    Wandering,
}

/// What an AI entity is currently focused on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AiTarget {
    Entity(EntityId),
    Panel { id: u32, x: f32, y: f32 },
    Point { x: f32, y: f32 },
}

/// Countdown timers, in seconds.
///
/// `cooldown` and `retarget` count down once per LOGIC step before the tree
/// runs; `action` is driven by whichever leaf owns the current long action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AiTimers {
    pub cooldown: f32,
    pub action: f32,
    pub retarget: f32,
}

/// Fixed-layout per-entity AI memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiState {
    pub mode: AiMode,
    pub timers: AiTimers,
    pub target: Option<AiTarget>,
    /// Heading in radians for wandering movement.
    pub heading: f32,
    /// Free scratch values for leaf actions.
    pub scratch: [f32; 4],
    memory: Vec<(MemorySlot, u32)>,
}

impl AiState {
    /// Stored child index for a resumable node; 0 when never written.
    pub fn memory_index(&self, slot: MemorySlot) -> u32 {
        self.memory
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, idx)| *idx)
            .unwrap_or(0)
    }

    pub fn set_memory_index(&mut self, slot: MemorySlot, index: u32) {
        match self.memory.iter_mut().find(|(s, _)| *s == slot) {
            Some(entry) => entry.1 = index,
            None => self.memory.push((slot, index)),
        }
    }

    /// Clear everything while keeping the memory allocation.
    pub fn reset(&mut self) {
        self.mode = AiMode::Idle;
        self.timers = AiTimers::default();
        self.target = None;
        self.heading = 0.0;
        self.scratch = [0.0; 4];
        self.memory.clear();
    }

    /// Become a copy of `other`, reusing this instance's memory allocation.
    pub fn copy_from(&mut self, other: &AiState) {
        self.mode = other.mode;
        self.timers = other.timers;
        self.target = other.target;
        self.heading = other.heading;
        self.scratch = other.scratch;
        self.memory.clear();
        self.memory.extend_from_slice(&other.memory);
    }
}

// ---------------------------------------------------------------------------
// Component (tagged union)
// ---------------------------------------------------------------------------

/// Any component value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Component {
    Transform(Transform),
    Velocity(Velocity),
    Collider(Collider),
    Health(Health),
    Lifetime(Lifetime),
    Projectile(Projectile),
    Enemy(Enemy),
    AiState(AiState),
    Behavior(Behavior),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Transform(_) => ComponentKind::Transform,
            Component::Velocity(_) => ComponentKind::Velocity,
            Component::Collider(_) => ComponentKind::Collider,
            Component::Health(_) => ComponentKind::Health,
            Component::Lifetime(_) => ComponentKind::Lifetime,
            Component::Projectile(_) => ComponentKind::Projectile,
            Component::Enemy(_) => ComponentKind::Enemy,
            Component::AiState(_) => ComponentKind::AiState,
            Component::Behavior(_) => ComponentKind::Behavior,
        }
    }

    /// A zeroed instance of `kind`.
    pub fn default_for(kind: ComponentKind) -> Component {
        match kind {
            ComponentKind::Transform => Component::Transform(Transform::default()),
            ComponentKind::Velocity => Component::Velocity(Velocity::default()),
            ComponentKind::Collider => Component::Collider(Collider::default()),
            ComponentKind::Health => Component::Health(Health::default()),
            ComponentKind::Lifetime => Component::Lifetime(Lifetime::default()),
            ComponentKind::Projectile => Component::Projectile(Projectile::default()),
            ComponentKind::Enemy => Component::Enemy(Enemy::default()),
            ComponentKind::AiState => Component::AiState(AiState::default()),
            ComponentKind::Behavior => Component::Behavior(Behavior::default()),
        }
    }

    /// Return to the zeroed state without giving up owned allocations.
    pub fn reset(&mut self) {
        match self {
            Component::AiState(state) => state.reset(),
            other => *other = Component::default_for(other.kind()),
        }
    }

    /// Replace this value with `value`. A pooled `AiState` keeps its memory
    /// allocation when the incoming value is also an `AiState`.
    pub fn overwrite(&mut self, value: Component) {
        match (self, value) {
            (Component::AiState(dst), Component::AiState(src)) => dst.copy_from(&src),
            (slot, value) => *slot = value,
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentData -- typed access
// ---------------------------------------------------------------------------

/// Implemented by every component record; links a Rust type to its kind.
pub trait ComponentData: Sized + Default + 'static {
    const KIND: ComponentKind;

    fn from_ref(component: &Component) -> Option<&Self>;
    fn from_mut(component: &mut Component) -> Option<&mut Self>;
    fn into_component(self) -> Component;
    /// Unwrap an owned [`Component`], handing it back on kind mismatch.
    fn try_from_component(component: Component) -> Result<Self, Component>;
}

macro_rules! impl_component_data {
    ($($ty:ident),* $(,)?) => {
        $(
            impl ComponentData for $ty {
                const KIND: ComponentKind = ComponentKind::$ty;

                #[inline]
                fn from_ref(component: &Component) -> Option<&Self> {
                    match component {
                        Component::$ty(value) => Some(value),
                        _ => None,
                    }
                }

                #[inline]
                fn from_mut(component: &mut Component) -> Option<&mut Self> {
                    match component {
                        Component::$ty(value) => Some(value),
                        _ => None,
                    }
                }

                #[inline]
                fn into_component(self) -> Component {
                    Component::$ty(self)
                }

                #[inline]
                fn try_from_component(component: Component) -> Result<Self, Component> {
                    match component {
                        Component::$ty(value) => Ok(value),
                        other => Err(other),
                    }
                }
            }

            impl From<$ty> for Component {
                fn from(value: $ty) -> Self {
                    Component::$ty(value)
                }
            }
        )*
    };
}

impl_component_data!(
    Transform, Velocity, Collider, Health, Lifetime, Projectile, Enemy, AiState, Behavior,
);

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// Per-entity component storage: one slot per kind plus a presence mask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSet {
    slots: [Option<Component>; ComponentKind::COUNT],
    mask: ComponentMask,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mask(&self) -> ComponentMask {
        self.mask
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.mask.contains(kind)
    }

    pub fn get<T: ComponentData>(&self) -> Option<&T> {
        self.slots[T::KIND.index()].as_ref().and_then(T::from_ref)
    }

    pub fn get_mut<T: ComponentData>(&mut self) -> Option<&mut T> {
        self.slots[T::KIND.index()].as_mut().and_then(T::from_mut)
    }

    pub fn get_kind(&self, kind: ComponentKind) -> Option<&Component> {
        self.slots[kind.index()].as_ref()
    }

    pub fn get_kind_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.slots[kind.index()].as_mut()
    }

    /// Store `component`, returning the instance it replaced.
    pub fn insert(&mut self, component: Component) -> Option<Component> {
        let kind = component.kind();
        self.mask.insert(kind);
        self.slots[kind.index()].replace(component)
    }

    pub fn remove(&mut self, kind: ComponentKind) -> Option<Component> {
        self.mask.remove(kind);
        self.slots[kind.index()].take()
    }

    /// Remove every component, handing each to `sink`.
    pub fn drain_into(&mut self, mut sink: impl FnMut(Component)) {
        for slot in &mut self.slots {
            if let Some(component) = slot.take() {
                sink(component);
            }
        }
        self.mask = ComponentMask::EMPTY;
    }

    /// Present components in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
