//! PR test selection: component catalog, path-to-tag mapping, test scoring,
//! tag expression and Jenkins parameters.

pub mod catalog;
pub mod mapper;
pub mod optimize;
pub mod select;
pub mod trigger;

pub use catalog::{Catalog, ComponentProfile, TagStyle, TriggerMode};
pub use mapper::{TagMapper, TagSelection};
pub use optimize::{display_expression, expression_terms, optimize_tags, tag_expression};
pub use select::{select_tests, Priority, SelectedTest, TestSelection};
pub use trigger::trigger_params;
