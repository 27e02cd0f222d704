//! Modal overlays drawn above the dashboard.

pub mod help;
pub mod toast;
