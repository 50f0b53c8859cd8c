//! Coarse entity categories used for bulk iteration.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    Player = 0,
    Enemy = 1,
    Bullet = 2,
    EnemyBullet = 3,
    Particle = 4,
    Pickup = 5,
    Structure = 6,
}

impl Tag {
    pub const COUNT: usize = 7;

    pub const ALL: [Tag; Self::COUNT] = [
        Tag::Player,
        Tag::Enemy,
        Tag::Bullet,
        Tag::EnemyBullet,
        Tag::Particle,
        Tag::Pickup,
        Tag::Structure,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Bitset of [`Tag`]s held by one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagSet(u16);

impl TagSet {
    pub const EMPTY: TagSet = TagSet(0);

    pub fn of(tags: &[Tag]) -> Self {
        Self(tags.iter().fold(0, |acc, t| acc | t.bit()))
    }

    /// Returns `true` if the tag was newly added.
    pub fn insert(&mut self, tag: Tag) -> bool {
        let had = self.contains(tag);
        self.0 |= tag.bit();
        !had
    }

    /// Returns `true` if the tag was present.
    pub fn remove(&mut self, tag: Tag) -> bool {
        let had = self.contains(tag);
        self.0 &= !tag.bit();
        had
    }

    pub fn contains(self, tag: Tag) -> bool {
        self.0 & tag.bit() != 0
    }

    pub fn contains_all(self, other: TagSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Tag> {
        Tag::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut set = TagSet::EMPTY;
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}
