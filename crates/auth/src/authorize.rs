use serde::Serialize;
use thiserror::Error;

use mentorhub_core::{ChapterId, UserId};

use crate::ability::{Ability, AbilityError, Action, ResourceArea};
use crate::policy::rules_for_role;
use crate::record::Record;
use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: cannot {action} {area}")]
    Forbidden { action: Action, area: ResourceArea },

    #[error("permission check could not be evaluated: {0}")]
    Evaluation(#[from] AbilityError),
}

/// Gate an operation on the principal's ability.
///
/// - No IO
/// - No panics
pub fn authorize(
    ability: &Ability,
    action: Action,
    area: ResourceArea,
    record: Option<&Record>,
) -> Result<(), AuthzError> {
    if ability.can(action, area, record)? {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { action, area })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub action: Action,
    pub area: ResourceArea,
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    pub principal: PrincipalState,

    /// Rules that granted the request (empty when denied).
    pub matched_rules: Vec<String>,

    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub principal_id: UserId,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub chapter_id: Option<ChapterId>,
    pub rule_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// No rule mentions the action on the area.
    NoMatchingRule,
    /// Rules exist but their conditions do not hold for the record.
    ConditionNotMet,
    /// The record could not answer a rule condition.
    EvaluationError,
}

/// Explain why `action` on `area` is (or would be) allowed or denied.
pub fn explain_authorization(
    principal: &Principal,
    ability: &Ability,
    action: Action,
    area: ResourceArea,
    record: Option<&Record>,
) -> AuthorizationExplanation {
    let state = PrincipalState {
        principal_id: principal.id(),
        display_name: principal.display_name().to_string(),
        roles: principal.roles().collect(),
        chapter_id: principal.chapter_id(),
        rule_count: ability.len(),
    };

    let denied = |reason: String, kind: DenialKind, message: String, suggestions: Vec<String>| {
        AuthorizationExplanation {
            action,
            area,
            granted: false,
            reason,
            principal: state.clone(),
            matched_rules: Vec::new(),
            denial_reason: Some(DenialReason { kind, message, suggestions }),
        }
    };

    match ability.matching_rules(action, area, record) {
        Err(err) => denied(
            format!("Permission check for '{action} {area}' could not be evaluated"),
            DenialKind::EvaluationError,
            err.to_string(),
            vec![format!("Supply a complete {area} record to the check")],
        ),

        Ok(matched) if !matched.is_empty() => AuthorizationExplanation {
            action,
            area,
            granted: true,
            reason: format!("Granted by {} rule(s)", matched.len()),
            principal: state.clone(),
            matched_rules: matched.iter().map(|r| r.to_string()).collect(),
            denial_reason: None,
        },

        Ok(_) if ability.has_rules_for(action, area) => denied(
            format!("Principal may {action} {area} only for records within its scope"),
            DenialKind::ConditionNotMet,
            "The record is outside the principal's ownership or chapter".to_string(),
            vec!["Ask an Admin to perform the operation".to_string()],
        ),

        Ok(_) => {
            let mut suggestions: Vec<String> = granting_roles(principal, action, area)
                .into_iter()
                .map(|role| format!("Assign the '{role}' role"))
                .collect();
            if suggestions.is_empty() {
                suggestions.push("No role grants this operation".to_string());
            }

            denied(
                format!("No rule grants '{action} {area}'"),
                DenialKind::NoMatchingRule,
                format!("Missing grant: {action} {area}"),
                suggestions,
            )
        }
    }
}

/// Roles the principal does not hold that would grant `action` on `area`.
fn granting_roles(principal: &Principal, action: Action, area: ResourceArea) -> Vec<Role> {
    Role::ALL
        .into_iter()
        .filter(|role| !principal.has_role(*role))
        .filter(|role| {
            rules_for_role(*role, principal.id(), principal.chapter_id())
                .iter()
                .any(|rule| rule.applies_to(action, area))
        })
        .collect()
}

/// Role definition with its grants (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub role: Role,
    pub description: &'static str,
    pub grants: Vec<String>,
}

/// Every role with the grants it carries, scope shown generically.
pub fn role_catalogue() -> Vec<RoleDefinition> {
    // Placeholder scope; only the condition kind is rendered.
    let user_id = UserId::from_uuid(uuid::Uuid::nil());
    let chapter_id = ChapterId::from_uuid(uuid::Uuid::nil());

    Role::ALL
        .into_iter()
        .map(|role| RoleDefinition {
            role,
            description: role_description(role),
            grants: rules_for_role(role, user_id, Some(chapter_id))
                .iter()
                .map(|rule| rule.describe())
                .collect(),
        })
        .collect()
}

fn role_description(role: Role) -> &'static str {
    match role {
        Role::Admin => "Programme administrator with every action on every area",
        Role::Mentor => "Volunteer mentor managing their own profile, sessions and reports",
        Role::Attendances => "Attendance officer for one chapter",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SessionRecord, UserRecord};

    fn mentor() -> Principal {
        Principal::new(UserId::new(), "Mentor", [Role::Mentor])
    }

    #[test]
    fn authorize_maps_deny_to_forbidden() {
        let ability = Ability::for_principal(&mentor());
        assert_eq!(
            authorize(&ability, Action::Manage, ResourceArea::UserArea, None),
            Err(AuthzError::Forbidden {
                action: Action::Manage,
                area: ResourceArea::UserArea,
            })
        );
        assert_eq!(authorize(&ability, Action::View, ResourceArea::RosterArea, None), Ok(()));
    }

    #[test]
    fn authorize_surfaces_evaluation_errors() {
        let ability = Ability::for_principal(&mentor());
        let record = Record::Session(SessionRecord { mentor_id: None, chapter_id: None });

        assert!(matches!(
            authorize(&ability, Action::View, ResourceArea::SessionArea, Some(&record)),
            Err(AuthzError::Evaluation(AbilityError::MissingField { .. }))
        ));
    }

    #[test]
    fn explanation_lists_matched_rules() {
        let principal = mentor();
        let ability = Ability::for_principal(&principal);
        let record = Record::User(UserRecord { user_id: principal.id(), chapter_id: None });

        let explanation = explain_authorization(
            &principal,
            &ability,
            Action::Update,
            ResourceArea::UserArea,
            Some(&record),
        );
        assert!(explanation.granted);
        assert_eq!(explanation.matched_rules.len(), 1);
        assert!(explanation.denial_reason.is_none());
    }

    #[test]
    fn explanation_distinguishes_scope_from_missing_grant() {
        let principal = mentor();
        let ability = Ability::for_principal(&principal);
        let someone_else = Record::User(UserRecord { user_id: UserId::new(), chapter_id: None });

        let scoped = explain_authorization(
            &principal,
            &ability,
            Action::Update,
            ResourceArea::UserArea,
            Some(&someone_else),
        );
        assert_eq!(scoped.denial_reason.map(|d| d.kind), Some(DenialKind::ConditionNotMet));

        let missing = explain_authorization(&principal, &ability, Action::Archive, ResourceArea::UserArea, None);
        let reason = missing.denial_reason.expect("denied");
        assert_eq!(reason.kind, DenialKind::NoMatchingRule);
        assert_eq!(reason.suggestions, vec!["Assign the 'Admin' role".to_string()]);
    }

    #[test]
    fn catalogue_covers_every_role() {
        let catalogue = role_catalogue();
        assert_eq!(catalogue.len(), Role::ALL.len());

        let attendances = catalogue
            .iter()
            .find(|d| d.role == Role::Attendances)
            .expect("attendances listed");
        assert!(attendances.grants.contains(&"delete AttendanceArea (own chapter)".to_string()));
    }
}
