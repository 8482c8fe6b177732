//! Project references and fetched project records

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A project as discovered on the listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRef {
    pub label: String,
    pub id: String,
}

impl ProjectRef {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

/// Result of fetching one project's payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Success { data: String },
    /// Kept for diagnostics: the last body the service sent
    Failure { garbage: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub project: ProjectRef,
    pub payload: Payload,
}

impl ProjectRecord {
    pub fn success(project: ProjectRef, data: String) -> Self {
        Self {
            project,
            payload: Payload::Success { data },
        }
    }

    pub fn failure(project: ProjectRef, garbage: String) -> Self {
        Self {
            project,
            payload: Payload::Failure { garbage },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.payload, Payload::Success { .. })
    }

    pub fn data(&self) -> Option<&str> {
        match &self.payload {
            Payload::Success { data } => Some(data),
            Payload::Failure { .. } => None,
        }
    }

    pub fn garbage(&self) -> Option<&str> {
        match &self.payload {
            Payload::Success { .. } => None,
            Payload::Failure { garbage } => Some(garbage),
        }
    }
}

// {"label", "id"} plus exactly one of "data" / "garbage"
impl Serialize for ProjectRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("label", &self.project.label)?;
        map.serialize_entry("id", &self.project.id)?;
        match &self.payload {
            Payload::Success { data } => map.serialize_entry("data", data)?,
            Payload::Failure { garbage } => map.serialize_entry("garbage", garbage)?,
        }
        map.end()
    }
}
