use crate::error::{IdError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Zero-padding width shared by every family.
pub const DIGIT_WIDTH: usize = 3;

/// Separator between a service scope and its task number (`AUTH-T001`).
pub const SCOPED_TASK_MARKER: &str = "-T";

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Feature,
    Specification,
    Plan,
    Task,
    Decision,
    Pattern,
    Constraint,
    Checkpoint,
}

impl Family {
    pub fn all() -> &'static [Family] {
        &[
            Family::Feature,
            Family::Specification,
            Family::Plan,
            Family::Task,
            Family::Decision,
            Family::Pattern,
            Family::Constraint,
            Family::Checkpoint,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Family::Feature => "feature",
            Family::Specification => "specification",
            Family::Plan => "plan",
            Family::Task => "task",
            Family::Decision => "decision",
            Family::Pattern => "pattern",
            Family::Constraint => "constraint",
            Family::Checkpoint => "checkpoint",
        }
    }

    /// Text placed before the zero-padded number. Empty for features.
    pub fn prefix(self) -> &'static str {
        match self {
            Family::Feature => "",
            Family::Specification => "spec-",
            Family::Plan => "plan-",
            Family::Task => "task-",
            Family::Decision => "DEC-",
            Family::Pattern => "PAT-",
            Family::Constraint => "CON-",
            Family::Checkpoint => "CP-",
        }
    }

    pub fn digit_width(self) -> usize {
        DIGIT_WIDTH
    }

    /// Only tasks may be partitioned by a service scope.
    pub fn supports_scope(self) -> bool {
        matches!(self, Family::Task)
    }

    /// Render `value` as this family's ID. Values that outgrow the padding
    /// render with more digits rather than being rejected.
    pub fn format(self, value: u64) -> String {
        format!(
            "{}{:0width$}",
            self.prefix(),
            value,
            width = self.digit_width()
        )
    }

    /// Render a service-scoped task ID such as `AUTH-T007`.
    pub fn format_scoped(self, scope: &str, value: u64) -> String {
        format!(
            "{scope}{SCOPED_TASK_MARKER}{:0width$}",
            value,
            width = self.digit_width()
        )
    }

    /// Inverse of [`Family::format`]. Returns `None` for anything that is not
    /// prefix + at least `digit_width` ASCII digits.
    pub fn parse_id(self, id: &str) -> Option<u64> {
        let digits = id.strip_prefix(self.prefix())?;
        parse_padded(digits, self.digit_width())
    }

    /// Whether `value` needs more digits than the family's padding.
    pub fn exceeds_width(self, value: u64) -> bool {
        value.to_string().len() > self.digit_width()
    }

    /// Check a caller-supplied scope against this family.
    ///
    /// Scopes are only legal on tasks and must be uppercase ASCII letters.
    pub fn validate_scope(self, scope: Option<&str>) -> Result<()> {
        let Some(scope) = scope else {
            return Ok(());
        };
        if !self.supports_scope() {
            return Err(IdError::InvalidScope {
                family: self.as_str().to_string(),
                scope: scope.to_string(),
                reason: "only task IDs accept a scope".to_string(),
            });
        }
        if !scope_re().is_match(scope) {
            return Err(IdError::InvalidScope {
                family: self.as_str().to_string(),
                scope: scope.to_string(),
                reason: "must match ^[A-Z]+$".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Family {
    type Err = IdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "feature" => Ok(Family::Feature),
            "specification" | "spec" => Ok(Family::Specification),
            "plan" => Ok(Family::Plan),
            "task" => Ok(Family::Task),
            "decision" => Ok(Family::Decision),
            "pattern" => Ok(Family::Pattern),
            "constraint" => Ok(Family::Constraint),
            "checkpoint" => Ok(Family::Checkpoint),
            _ => Err(IdError::InvalidFamily(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Scoped task IDs
// ---------------------------------------------------------------------------

static SCOPE_RE: OnceLock<Regex> = OnceLock::new();

fn scope_re() -> &'static Regex {
    SCOPE_RE.get_or_init(|| Regex::new(r"^[A-Z]+$").unwrap())
}

/// Split `AUTH-T007` into `("AUTH", 7)`.
pub fn parse_scoped_task(id: &str) -> Option<(&str, u64)> {
    let (scope, digits) = id.split_once(SCOPED_TASK_MARKER)?;
    if !scope_re().is_match(scope) {
        return None;
    }
    Some((scope, parse_padded(digits, DIGIT_WIDTH)?))
}

fn parse_padded(digits: &str, width: usize) -> Option<u64> {
    if digits.len() < width || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_per_family() {
        assert_eq!(Family::Feature.format(1), "001");
        assert_eq!(Family::Feature.format(42), "042");
        assert_eq!(Family::Specification.format(7), "spec-007");
        assert_eq!(Family::Decision.format(3), "DEC-003");
        assert_eq!(Family::Task.format_scoped("AUTH", 1), "AUTH-T001");
    }

    #[test]
    fn widens_past_padding() {
        assert_eq!(Family::Feature.format(1000), "1000");
        assert_eq!(Family::Checkpoint.format(12345), "CP-12345");
        assert!(Family::Feature.exceeds_width(1000));
        assert!(!Family::Feature.exceeds_width(999));
    }

    #[test]
    fn parse_is_inverse_of_format() {
        for family in Family::all() {
            for n in [1, 99, 999, 1000] {
                assert_eq!(family.parse_id(&family.format(n)), Some(n), "{family} {n}");
            }
        }
    }

    #[test]
    fn parse_rejects_foreign_ids() {
        assert_eq!(Family::Decision.parse_id("PAT-001"), None);
        assert_eq!(Family::Feature.parse_id("01"), None);
        assert_eq!(Family::Plan.parse_id("plan-00x"), None);
        assert_eq!(Family::Feature.parse_id("spec-001"), None);
    }

    #[test]
    fn parse_scoped_task_ids() {
        assert_eq!(parse_scoped_task("AUTH-T007"), Some(("AUTH", 7)));
        assert_eq!(parse_scoped_task("auth-T007"), None);
        assert_eq!(parse_scoped_task("AUTH-T07"), None);
        assert_eq!(parse_scoped_task("task-007"), None);
    }

    #[test]
    fn scope_validation() {
        assert!(Family::Task.validate_scope(None).is_ok());
        assert!(Family::Task.validate_scope(Some("BILLING")).is_ok());
        for bad in ["", "auth", "AUTH1", "AU TH", "AUTH-"] {
            assert!(
                matches!(
                    Family::Task.validate_scope(Some(bad)),
                    Err(IdError::InvalidScope { .. })
                ),
                "expected invalid: {bad:?}"
            );
        }
        assert!(matches!(
            Family::Decision.validate_scope(Some("AUTH")),
            Err(IdError::InvalidScope { .. })
        ));
    }

    #[test]
    fn family_from_str() {
        assert_eq!("plan".parse::<Family>().unwrap(), Family::Plan);
        assert_eq!("spec".parse::<Family>().unwrap(), Family::Specification);
        assert!(matches!(
            "epic".parse::<Family>(),
            Err(IdError::InvalidFamily(_))
        ));
        for family in Family::all() {
            assert_eq!(family.as_str().parse::<Family>().unwrap(), *family);
        }
    }
}
