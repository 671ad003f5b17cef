//! Wire-level data model shared by every component.

pub mod id;
pub mod sample;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use id::{EventId, ImageId, LabelId, SampleId, UserId};
pub use sample::{ParseStateError, Sample, SampleState};

/// A tenant-wide label from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    pub color: String,
}

/// A label attached to a sample or an order.
///
/// Carries the name and color stored with the assignment so the label can
/// still be rendered when the catalog does not know the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAssignment {
    #[serde(alias = "id")]
    pub label_id: LabelId,
    pub name: String,
    pub color: String,
}

impl LabelAssignment {
    #[must_use]
    pub fn to_label(&self) -> Label {
        Label {
            id: self.label_id.clone(),
            name: self.name.clone(),
            color: self.color.clone(),
        }
    }
}

impl From<&Label> for LabelAssignment {
    fn from(label: &Label) -> Self {
        Self {
            label_id: label.id.clone(),
            name: label.name.clone(),
            color: label.color.clone(),
        }
    }
}

/// A lab user who can be assigned to samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// An image attached to a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// The images of one sample, in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSet {
    pub images: Vec<Image>,
}

impl ImageSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    #[must_use]
    pub fn find(&self, id: &ImageId) -> Option<&Image> {
        self.images.iter().find(|image| &image.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_accepts_id_alias() {
        let json = r##"{"id":3,"name":"Urgente","color":"#ef4444"}"##;
        let assignment: LabelAssignment = serde_json::from_str(json).expect("deserialize");
        assert_eq!(assignment.label_id.as_str(), "3");
        assert_eq!(assignment.to_label().name, "Urgente");
    }

    #[test]
    fn image_set_is_a_plain_array() {
        let json = r#"[{"id":"i1","filename":"frotis.jpg"}]"#;
        let set: ImageSet = serde_json::from_str(json).expect("deserialize");
        assert_eq!(set.len(), 1);
        assert!(set.find(&ImageId::new("i1")).is_some());
        assert!(set.find(&ImageId::new("i2")).is_none());
    }

    #[test]
    fn assignee_email_is_optional() {
        let assignee: Assignee =
            serde_json::from_str(r#"{"id":"u1","name":"Ana"}"#).expect("deserialize");
        assert_eq!(assignee.email, "");
        assert!(assignee.avatar_url.is_none());
    }
}
