//! Labels: the tenant catalog and inheritance from parent orders.

pub mod catalog;
pub mod inherit;

pub use catalog::{DEFAULT_LABEL_COLOR, LabelCatalog, validate_color, validate_name};
pub use inherit::{
    LabelSelection, ResolvedLabel, apply_label_selection, own_selection, resolve_labels,
};
