pub mod info_panel;
pub mod log_panel;
pub mod tree_panel;
