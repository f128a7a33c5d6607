//! Combination membership as an immutable flag vector.

use std::fmt;

use serde::{Serialize, Serializer};

/// A set of candidate-variable indices (0-based) out of a fixed universe.
///
/// Equality and hashing are by membership, so two subsets built in different
/// orders compare equal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VariableSubset {
    flags: Box<[bool]>,
}

impl VariableSubset {
    pub fn empty(universe: usize) -> Self {
        Self {
            flags: vec![false; universe].into_boxed_slice(),
        }
    }

    pub fn single(universe: usize, var: usize) -> Self {
        Self::empty(universe).with(var)
    }

    /// Returns `None` if any member is outside the universe.
    pub fn from_members(universe: usize, members: &[usize]) -> Option<Self> {
        let mut flags = vec![false; universe];
        for &m in members {
            *flags.get_mut(m)? = true;
        }
        Some(Self {
            flags: flags.into_boxed_slice(),
        })
    }

    pub fn universe(&self) -> usize {
        self.flags.len()
    }

    pub fn len(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.flags.iter().any(|&f| f)
    }

    pub fn contains(&self, var: usize) -> bool {
        self.flags.get(var).copied().unwrap_or(false)
    }

    /// Members in ascending index order.
    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags.iter().enumerate().filter(|(_, f)| **f).map(|(i, _)| i)
    }

    /// A copy with `var` added. Out-of-universe indices are ignored.
    pub fn with(&self, var: usize) -> Self {
        let mut flags = self.flags.clone();
        if let Some(f) = flags.get_mut(var) {
            *f = true;
        }
        Self { flags }
    }

    pub fn union(&self, other: &Self) -> Self {
        let n = self.universe().max(other.universe());
        let flags = (0..n).map(|i| self.contains(i) || other.contains(i)).collect();
        Self { flags }
    }

    /// Number of shared members.
    pub fn overlap(&self, other: &Self) -> usize {
        self.members().filter(|&v| other.contains(v)).count()
    }

    /// The first `k` members in ascending order.
    pub fn prefix(&self, k: usize) -> Self {
        let mut out = Self::empty(self.universe());
        for v in self.members().take(k) {
            out.flags[v] = true;
        }
        out
    }

    /// `A + B + C` style label using column names.
    pub fn label(&self, names: &[String]) -> String {
        let parts: Vec<&str> = self
            .members()
            .map(|v| names.get(v).map(String::as_str).unwrap_or("?"))
            .collect();
        parts.join(" + ")
    }
}

impl fmt::Display for VariableSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.members().map(|v| format!("X{}", v + 1)).collect();
        write!(f, "{{{}}}", parts.join(","))
    }
}

impl fmt::Debug for VariableSubset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariableSubset{self}")
    }
}

impl Serialize for VariableSubset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.members())
    }
}
