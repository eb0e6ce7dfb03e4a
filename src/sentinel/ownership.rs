use super::models::{
    Hunt, HuntRelation, SavedSearch, ORIGIN_LABEL, ORIGIN_TAG_NAME, ORIGIN_TAG_VALUE,
};

/// Whether a remote resource carries this integration's origin marker.
///
/// Matching is exact and case-sensitive. Anything that fails it is treated as
/// belonging to another actor in the workspace and is never deleted by purge.
pub trait Owned {
    fn is_owned(&self) -> bool;
}

impl Owned for SavedSearch {
    fn is_owned(&self) -> bool {
        self.properties
            .tags
            .iter()
            .any(|tag| tag.name == ORIGIN_TAG_NAME && tag.value == ORIGIN_TAG_VALUE)
    }
}

impl Owned for Hunt {
    fn is_owned(&self) -> bool {
        has_origin_label(&self.properties.labels)
    }
}

impl Owned for HuntRelation {
    fn is_owned(&self) -> bool {
        has_origin_label(&self.properties.labels)
    }
}

fn has_origin_label(labels: &[String]) -> bool {
    labels.iter().any(|label| label == ORIGIN_LABEL)
}

pub fn is_owned<T: Owned>(resource: &T) -> bool {
    resource.is_owned()
}
