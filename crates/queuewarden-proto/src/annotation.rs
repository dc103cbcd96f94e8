//! The annotation spectrum.
//!
//! Every tracked item carries at most one of four reactions placed by the
//! engine. Any reaction outside this spectrum belongs to humans and is never
//! touched.

use crate::error::ProtoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emoji marking a second submission in the same channel.
pub const EMOJI_IGNORED: &str = "\u{1F621}";
/// Emoji marking a member with no voice presence at all.
pub const EMOJI_ASTRAY: &str = "\u{1F620}";
/// Emoji marking a member currently in a non-queue voice channel.
pub const EMOJI_ACTIVE: &str = "\u{1F9D0}";
/// Emoji marking a member who has already been served.
pub const EMOJI_FINISHED: &str = "\u{1F937}\u{200D}\u{2640}\u{FE0F}";

/// One tag of the fixed annotation spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    /// Not the member's first item in this channel.
    Ignored,
    /// Member is not present anywhere.
    Astray,
    /// Member is present outside the designated area.
    Active,
    /// Member has been served.
    Finished,
}

impl Annotation {
    /// The whole spectrum, in a fixed order.
    pub const SPECTRUM: [Annotation; 4] = [
        Annotation::Ignored,
        Annotation::Astray,
        Annotation::Active,
        Annotation::Finished,
    ];

    /// Emoji used to render this annotation upstream.
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Ignored => EMOJI_IGNORED,
            Self::Astray => EMOJI_ASTRAY,
            Self::Active => EMOJI_ACTIVE,
            Self::Finished => EMOJI_FINISHED,
        }
    }

    /// Map an upstream reaction back onto the spectrum.
    ///
    /// Returns `None` for reactions that are not ours to manage.
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        Self::SPECTRUM.into_iter().find(|a| a.emoji() == emoji)
    }

    /// Lowercase name, as used in configuration and event streams.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Astray => "astray",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Self::Ignored => 0b0001,
            Self::Astray => 0b0010,
            Self::Active => 0b0100,
            Self::Finished => 0b1000,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts either the lowercase name or the emoji.
impl FromStr for Annotation {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SPECTRUM
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s) || a.emoji() == s)
            .ok_or_else(|| ProtoError::unknown_annotation(s))
    }
}

/// A set of annotations.
///
/// Reactions are treated as a set: duplicates and ordering upstream are
/// irrelevant to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AnnotationSet(u8);

impl AnnotationSet {
    /// The empty set ("none").
    pub const fn empty() -> Self {
        Self(0)
    }

    /// A set holding exactly one annotation.
    pub fn only(annotation: Annotation) -> Self {
        Self(annotation.bit())
    }

    /// Add an annotation; returns `true` if it was not present.
    pub fn insert(&mut self, annotation: Annotation) -> bool {
        let fresh = !self.contains(annotation);
        self.0 |= annotation.bit();
        fresh
    }

    /// Remove an annotation; returns `true` if it was present.
    pub fn remove(&mut self, annotation: Annotation) -> bool {
        let present = self.contains(annotation);
        self.0 &= !annotation.bit();
        present
    }

    /// Membership test.
    pub fn contains(self, annotation: Annotation) -> bool {
        self.0 & annotation.bit() != 0
    }

    /// `true` when no annotation is present.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of annotations present.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate in spectrum order.
    pub fn iter(self) -> impl Iterator<Item = Annotation> {
        Annotation::SPECTRUM
            .into_iter()
            .filter(move |a| self.contains(*a))
    }
}

impl FromIterator<Annotation> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        let mut set = Self::empty();
        for annotation in iter {
            set.insert(annotation);
        }
        set
    }
}

impl From<Option<Annotation>> for AnnotationSet {
    fn from(annotation: Option<Annotation>) -> Self {
        annotation.map(Self::only).unwrap_or_default()
    }
}

impl fmt::Display for AnnotationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(Annotation::as_str).collect();
        f.write_str(&names.join("+"))
    }
}
