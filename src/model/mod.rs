//! Core data model: editable lines and the submitted-line history

pub mod history;
pub mod line;
