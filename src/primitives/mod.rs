//! Low-level building blocks shared by the model and the view

pub mod ascii;
pub mod layout_expr;
pub mod line_wrapping;
