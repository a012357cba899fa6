//! Outline reconstruction from linked notes.

mod builder;

pub use builder::{
    build_outline, order_linked_list, MalformedOutline, OutlineError, OutlineLinks, OutlineNode,
};
