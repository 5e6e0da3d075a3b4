//! Duplicate-safe subject collections
//!
//! Two subjects are the same member when their ids are equal and non-empty.
//! Subjects without an id (groups lacking a global id) are matched by name.
//! Every operation goes through [`SubjectKey`], so union and difference can
//! never disagree about membership.

use crate::types::Subject;
use serde::{Deserialize, Serialize};

/// Normalized membership key of a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKey<'a> {
    Id(&'a str),
    Name(&'a str),
}

impl Subject {
    /// Membership key: the id when present, else the name
    pub fn key(&self) -> SubjectKey<'_> {
        if self.id.is_empty() {
            SubjectKey::Name(&self.name)
        } else {
            SubjectKey::Id(&self.id)
        }
    }

    /// Whether `self` and `other` denote the same member
    pub fn same_member(&self, other: &Subject) -> bool {
        self.key() == other.key()
    }
}

/// Ordered set of subjects keyed by [`SubjectKey`]
///
/// Insertion order is kept so persisted records stay stable between writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectSet(Vec<Subject>);

impl SubjectSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, subject: &Subject) -> bool {
        self.0.iter().any(|member| member.same_member(subject))
    }

    /// Add `subject` unless a matching member is already present
    ///
    /// Returns `true` if the set changed.
    pub fn insert(&mut self, subject: Subject) -> bool {
        if self.contains(&subject) {
            return false;
        }
        self.0.push(subject);
        true
    }

    /// Union with every subject of `other`
    pub fn union<I>(mut self, other: I) -> Self
    where
        I: IntoIterator<Item = Subject>,
    {
        for subject in other {
            self.insert(subject);
        }
        self
    }

    /// Members not matched by any subject of `exclude`, in original order
    pub fn difference(&self, exclude: &[Subject]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|member| !exclude.iter().any(|ex| ex.same_member(member)))
                .cloned()
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Subject> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Subject] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Subject> {
        self.0
    }
}

impl FromIterator<Subject> for SubjectSet {
    fn from_iter<I: IntoIterator<Item = Subject>>(iter: I) -> Self {
        Self::new().union(iter)
    }
}

impl From<Vec<Subject>> for SubjectSet {
    fn from(subjects: Vec<Subject>) -> Self {
        subjects.into_iter().collect()
    }
}

impl IntoIterator for SubjectSet {
    type Item = Subject;
    type IntoIter = std::vec::IntoIter<Subject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SubjectSet {
    type Item = &'a Subject;
    type IntoIter = std::slice::Iter<'a, Subject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
