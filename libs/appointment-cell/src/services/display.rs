// libs/appointment-cell/src/services/display.rs
//
// Pure status and triage labelling shared by dashboard views.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::AppointmentStatus;

pub const PENDING_TRIAGE_LABEL: &str = "Pending Triage";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BadgeVariant {
    Default,
    Secondary,
}

impl BadgeVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeVariant::Default => "default",
            BadgeVariant::Secondary => "secondary",
        }
    }
}

/// Only an exact `"completed"` gets the default variant.
///
/// Unknown statuses (including `"cancelled"`) fall through to `Secondary`,
/// so cancelled appointments need their own badge upstream.
pub fn badge_variant(status: &str) -> BadgeVariant {
    if status == "completed" {
        BadgeVariant::Default
    } else {
        BadgeVariant::Secondary
    }
}

/// Anything other than `"upcoming"` reads as "Completed", cancelled appointments included.
pub fn badge_text(status: &str) -> &'static str {
    if status == "upcoming" {
        "Upcoming"
    } else {
        "Completed"
    }
}

impl AppointmentStatus {
    pub fn badge_variant(&self) -> BadgeVariant {
        badge_variant(self.as_str())
    }

    pub fn badge_text(&self) -> &'static str {
        badge_text(self.as_str())
    }
}

/// Clinical urgency from a triage code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TriagePriority {
    Immediate,
    Urgent,
    Minor,
    NonUrgent,
}

impl TriagePriority {
    /// Colour codes and P-codes are aliases. Matching is case sensitive.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "RED" | "P1" => Some(TriagePriority::Immediate),
            "YELLOW" | "P2" => Some(TriagePriority::Urgent),
            "GREEN" | "P3" => Some(TriagePriority::Minor),
            "BLACK" | "P4" => Some(TriagePriority::NonUrgent),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TriagePriority::Immediate => "🔴 Immediate (P1)",
            TriagePriority::Urgent => "🟡 Urgent (P2)",
            TriagePriority::Minor => "🟢 Minor (P3)",
            TriagePriority::NonUrgent => "⚫ Non-Urgent (P4)",
        }
    }
}

/// A non-empty explicit label always wins; otherwise the code is looked up.
pub fn priority_label(code: Option<&str>, explicit_label: Option<&str>) -> String {
    if let Some(label) = explicit_label.filter(|l| !l.is_empty()) {
        return label.to_string();
    }

    code.and_then(TriagePriority::from_code)
        .map(|priority| priority.label())
        .unwrap_or(PENDING_TRIAGE_LABEL)
        .to_string()
}

/// Same as [`priority_label`] for untyped input; non-string codes are pending triage.
pub fn priority_label_from_value(code: &Value, explicit_label: Option<&str>) -> String {
    priority_label(code.as_str(), explicit_label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_colour_and_p_codes_are_equivalent() {
        let pairs = [("RED", "P1"), ("YELLOW", "P2"), ("GREEN", "P3"), ("BLACK", "P4")];
        for (colour, code) in pairs {
            assert_eq!(priority_label(Some(colour), None), priority_label(Some(code), None));
        }

        assert_eq!(priority_label(Some("RED"), None), "🔴 Immediate (P1)");
        assert_eq!(priority_label(Some("P2"), None), "🟡 Urgent (P2)");
        assert_eq!(priority_label(Some("GREEN"), None), "🟢 Minor (P3)");
        assert_eq!(priority_label(Some("P4"), None), "⚫ Non-Urgent (P4)");
    }

    #[test]
    fn test_explicit_label_overrides_code() {
        assert_eq!(priority_label(Some("RED"), Some("Custom Label")), "Custom Label");
        assert_eq!(priority_label(None, Some("Custom Label")), "Custom Label");
        // Empty override is ignored
        assert_eq!(priority_label(Some("RED"), Some("")), "🔴 Immediate (P1)");
    }

    #[test]
    fn test_unknown_inputs_are_pending_triage() {
        assert_eq!(priority_label(None, None), PENDING_TRIAGE_LABEL);
        assert_eq!(priority_label(Some(""), None), PENDING_TRIAGE_LABEL);
        assert_eq!(priority_label(Some("UNKNOWN"), None), PENDING_TRIAGE_LABEL);
        assert_eq!(priority_label(Some("red"), None), PENDING_TRIAGE_LABEL);

        for value in [Value::Null, json!(""), json!(123), json!(true), json!("UNKNOWN")] {
            assert_eq!(priority_label_from_value(&value, None), PENDING_TRIAGE_LABEL);
        }
        assert_eq!(priority_label_from_value(&json!("BLACK"), None), "⚫ Non-Urgent (P4)");
    }

    #[test]
    fn test_badge_variant() {
        assert_eq!(badge_variant("completed"), BadgeVariant::Default);
        assert_eq!(badge_variant("upcoming"), BadgeVariant::Secondary);
        assert_eq!(badge_variant("anything-else"), BadgeVariant::Secondary);
        assert_eq!(badge_variant("completed").as_str(), "default");
    }

    #[test]
    fn test_badge_text_falls_back_to_completed() {
        assert_eq!(badge_text("upcoming"), "Upcoming");
        assert_eq!(badge_text("completed"), "Completed");
        assert_eq!(badge_text("anything-else"), "Completed");
        assert_eq!(AppointmentStatus::Cancelled.badge_text(), "Completed");
        assert_eq!(AppointmentStatus::Completed.badge_variant(), BadgeVariant::Default);
    }
}
