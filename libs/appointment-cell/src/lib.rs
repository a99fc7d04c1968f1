pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::display::{
    badge_text, badge_variant, priority_label, priority_label_from_value, BadgeVariant, TriagePriority,
};
pub use services::{CancellationService, CancellationStore};
