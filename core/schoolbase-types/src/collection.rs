//! The fixed set of collections the school system tracks.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Prefix shared by every local snapshot key.
pub const LOCAL_KEY_PREFIX: &str = "sms_";

/// Remote table name and local key suffix for each school collection.
///
/// Suffixes follow the keys existing installs already have on disk.
const SCHOOL_COLLECTIONS: &[(&str, &str)] = &[
    ("students", "students"),
    ("teachers", "teachers"),
    ("subjects", "subjects"),
    ("departments", "departments"),
    ("classes", "classes"),
    ("allocations", "allocations"),
    ("exam_sessions", "sessions"),
    ("student_marks", "marks"),
    ("grade_scales", "gradeScales"),
    ("online_exams", "onlineExams"),
    ("exam_submissions", "submissions"),
    ("resources", "resources"),
    ("announcements", "announcements"),
    ("attendance", "attendance"),
    ("period_allocations", "period_allocations"),
    ("period_sessions", "period_sessions"),
    ("period_attendance", "period_attendance"),
    ("fee_structures", "fee_structures"),
    ("fee_payments", "fee_payments"),
    ("teacher_attendance", "teacher_attendance"),
    ("teaching_file_records", "teaching_file_records"),
];

/// One logical collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// Remote table name; also the collection's logical name.
    pub name: String,
    /// Key of the collection's snapshot in the local store.
    pub local_key: String,
    /// Whether local changes are pushed to the remote store.
    pub synchronized: bool,
}

impl CollectionSpec {
    /// A synchronized collection whose local key is `sms_<name>`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let local_key = format!("{LOCAL_KEY_PREFIX}{name}");
        Self {
            name,
            local_key,
            synchronized: true,
        }
    }

    /// Overrides the local key suffix (the prefix stays `sms_`).
    #[must_use]
    pub fn with_local_suffix(mut self, suffix: &str) -> Self {
        self.local_key = format!("{LOCAL_KEY_PREFIX}{suffix}");
        self
    }

    /// Marks the collection as local-only.
    #[must_use]
    pub fn local_only(mut self) -> Self {
        self.synchronized = false;
        self
    }
}

/// Ordered registry of collections. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRegistry {
    specs: Vec<CollectionSpec>,
}

impl CollectionRegistry {
    /// Builds a registry, rejecting duplicate names.
    pub fn new(specs: Vec<CollectionSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::DuplicateCollection(spec.name.clone()));
            }
        }
        Ok(Self { specs })
    }

    /// The 21 collections of the school management system.
    pub fn school() -> Self {
        let specs = SCHOOL_COLLECTIONS
            .iter()
            .map(|(name, suffix)| CollectionSpec::new(*name).with_local_suffix(suffix))
            .collect();
        Self { specs }
    }

    /// Looks up a collection by name.
    pub fn get(&self, name: &str) -> Option<&CollectionSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over all collections in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CollectionSpec> {
        self.specs.iter()
    }

    /// Iterates over the collections that are pushed to the remote store.
    pub fn synchronized(&self) -> impl Iterator<Item = &CollectionSpec> {
        self.specs.iter().filter(|s| s.synchronized)
    }

    /// Collection names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for CollectionRegistry {
    fn default() -> Self {
        Self::school()
    }
}
