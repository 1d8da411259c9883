//! Application layer use cases for the client.
//!
//! # What use cases does the client have?
//!
//! - **`apply_edit`** – Translates received host requests (`GetFocusText`,
//!   `SetFocusText`) into operations on the focused text field.  The actual
//!   field access is made by a `FocusTextEditor` implementation that is
//!   injected at construction time.

pub mod apply_edit;
