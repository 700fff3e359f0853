//! Abilities: the immutable permission rules computed for a principal.
//!
//! A rule grants one action on one resource area, optionally only for records
//! satisfying a typed condition. Rules are purely additive: an ability allows
//! an action when any rule matches, and denies everything else.

use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mentorhub_core::{ChapterId, UserId};

use crate::Principal;
use crate::record::Record;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
    Archive,
    /// Administrative control over an area. Matched exactly like any other action.
    Manage,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::View,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Archive,
        Action::Manage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Archive => "archive",
            Action::Manage => "manage",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownName::action(s))
    }
}

/// A named category of protected functionality.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceArea {
    /// Mentor and staff profiles.
    UserArea,
    StudentArea,
    ChapterArea,
    SessionArea,
    ReportArea,
    /// Police and working-with-children checks.
    CheckArea,
    RosterArea,
    AttendanceArea,
}

impl ResourceArea {
    pub const ALL: [ResourceArea; 8] = [
        ResourceArea::UserArea,
        ResourceArea::StudentArea,
        ResourceArea::ChapterArea,
        ResourceArea::SessionArea,
        ResourceArea::ReportArea,
        ResourceArea::CheckArea,
        ResourceArea::RosterArea,
        ResourceArea::AttendanceArea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceArea::UserArea => "UserArea",
            ResourceArea::StudentArea => "StudentArea",
            ResourceArea::ChapterArea => "ChapterArea",
            ResourceArea::SessionArea => "SessionArea",
            ResourceArea::ReportArea => "ReportArea",
            ResourceArea::CheckArea => "CheckArea",
            ResourceArea::RosterArea => "RosterArea",
            ResourceArea::AttendanceArea => "AttendanceArea",
        }
    }
}

impl core::fmt::Display for ResourceArea {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceArea {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceArea::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownName::area(s))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{name}'")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

impl UnknownName {
    fn action(name: &str) -> Self {
        Self { kind: "action", name: name.to_string() }
    }

    fn area(name: &str) -> Self {
        Self { kind: "resource area", name: name.to_string() }
    }
}

/// Evaluating an ability against a record that cannot answer its conditions.
///
/// This is always a programming error in the caller: it must not be treated
/// as either an allow or a deny.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbilityError {
    #[error("{area} record has no `{field}` field required by a permission condition")]
    MissingField {
        area: ResourceArea,
        field: &'static str,
    },

    #[error("{found} record supplied to a {expected} permission check")]
    AreaMismatch {
        expected: ResourceArea,
        found: ResourceArea,
    },
}

/// Typed record predicate attached to a rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Condition {
    /// The record belongs to this user.
    OwnedBy(UserId),
    /// The record belongs to this chapter.
    InChapter(ChapterId),
}

impl Condition {
    pub fn holds(&self, record: &Record) -> Result<bool, AbilityError> {
        match self {
            Condition::OwnedBy(user_id) => Ok(record.owner()? == *user_id),
            Condition::InChapter(chapter_id) => Ok(record.chapter()? == *chapter_id),
        }
    }

    /// Principal-independent description, e.g. for the role catalogue.
    pub fn scope_label(&self) -> &'static str {
        match self {
            Condition::OwnedBy(_) => "own records",
            Condition::InChapter(_) => "own chapter",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Rule {
    pub action: Action,
    pub area: ResourceArea,
    pub condition: Option<Condition>,
}

impl Rule {
    pub fn new(action: Action, area: ResourceArea) -> Self {
        Self { action, area, condition: None }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn applies_to(&self, action: Action, area: ResourceArea) -> bool {
        self.action == action && self.area == area
    }

    /// Without a record, a conditional rule still answers "allowed for some records".
    fn matches(&self, record: Option<&Record>) -> Result<bool, AbilityError> {
        match (&self.condition, record) {
            (None, _) | (Some(_), None) => Ok(true),
            (Some(condition), Some(record)) => condition.holds(record),
        }
    }

    /// The rule with its scope named generically (`own records`) instead of by id.
    pub fn describe(&self) -> String {
        struct Generic<'a>(&'a Rule);

        impl core::fmt::Display for Generic<'_> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                self.0.render(f, false)
            }
        }

        Generic(self).to_string()
    }

    fn render(&self, f: &mut core::fmt::Formatter<'_>, with_ids: bool) -> core::fmt::Result {
        write!(f, "{} {}", self.action, self.area)?;
        match (&self.condition, with_ids) {
            (None, _) => Ok(()),
            (Some(condition), false) => write!(f, " ({})", condition.scope_label()),
            (Some(Condition::OwnedBy(id)), true) => write!(f, " where owner = {id}"),
            (Some(Condition::InChapter(id)), true) => write!(f, " where chapter = {id}"),
        }
    }
}

impl core::fmt::Display for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.render(f, true)
    }
}

/// Immutable rule set. Construct with [`Ability::for_principal`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ability {
    rules: BTreeSet<Rule>,
}

impl Ability {
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Build the ability for a principal from its roles and scope.
    pub fn for_principal(principal: &Principal) -> Self {
        crate::policy::build(principal)
    }

    /// Can the principal perform `action` on `area`, optionally for one `record`?
    ///
    /// Returns `Ok(false)` when no rule matches. Returns an error when the
    /// record belongs to another area, or lacks a field that any candidate
    /// rule's condition needs.
    pub fn can(
        &self,
        action: Action,
        area: ResourceArea,
        record: Option<&Record>,
    ) -> Result<bool, AbilityError> {
        Ok(!self.matching_rules(action, area, record)?.is_empty())
    }

    /// Every rule granting `action` on `area` for `record`.
    ///
    /// All candidate rules are evaluated, so the outcome does not depend on
    /// rule order.
    pub fn matching_rules(
        &self,
        action: Action,
        area: ResourceArea,
        record: Option<&Record>,
    ) -> Result<Vec<&Rule>, AbilityError> {
        if let Some(record) = record {
            if record.area() != area {
                return Err(AbilityError::AreaMismatch {
                    expected: area,
                    found: record.area(),
                });
            }
        }

        let mut matched = Vec::new();
        for rule in self.rules.iter().filter(|r| r.applies_to(action, area)) {
            if rule.matches(record)? {
                matched.push(rule);
            }
        }
        Ok(matched)
    }

    /// Whether any rule (conditional or not) mentions `action` on `area`.
    pub fn has_rules_for(&self, action: Action, area: ResourceArea) -> bool {
        self.rules.iter().any(|r| r.applies_to(action, area))
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Whether this ability grants at least every rule of `other`.
    pub fn covers(&self, other: &Ability) -> bool {
        other.rules.is_subset(&self.rules)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use crate::record::{SessionRecord, StudentRecord, UserRecord};
    use mentorhub_core::StudentId;
    use proptest::prelude::*;

    fn principal(roles: &[Role]) -> Principal {
        Principal::new(UserId::new(), "Test User", roles.iter().copied())
    }

    #[test]
    fn rules_render_with_ids_or_generic_scope() {
        let me = UserId::new();
        let unconditional = Rule::new(Action::View, ResourceArea::RosterArea);
        let owned = Rule::new(Action::Update, ResourceArea::UserArea).when(Condition::OwnedBy(me));

        assert_eq!(unconditional.to_string(), "view RosterArea");
        assert_eq!(unconditional.describe(), "view RosterArea");
        assert_eq!(owned.to_string(), format!("update UserArea where owner = {me}"));
        assert_eq!(owned.describe(), "update UserArea (own records)");
    }

    #[test]
    fn admin_can_manage_users() {
        let ability = Ability::for_principal(&principal(&[Role::Admin]));
        assert_eq!(ability.can(Action::Manage, ResourceArea::UserArea, None), Ok(true));
    }

    #[test]
    fn mentor_cannot_manage_users_but_can_view_roster() {
        let ability = Ability::for_principal(&principal(&[Role::Mentor]));
        assert_eq!(ability.can(Action::Manage, ResourceArea::UserArea, None), Ok(false));
        assert_eq!(ability.can(Action::View, ResourceArea::RosterArea, None), Ok(true));
    }

    #[test]
    fn empty_role_set_grants_nothing() {
        let ability = Ability::for_principal(&principal(&[]));
        assert!(ability.is_empty());
        for action in Action::ALL {
            for area in ResourceArea::ALL {
                assert_eq!(ability.can(action, area, None), Ok(false));
            }
        }
    }

    #[test]
    fn ownership_condition_is_checked_against_the_record() {
        let me = principal(&[Role::Mentor]);
        let ability = Ability::for_principal(&me);

        let mine = Record::User(UserRecord { user_id: me.id(), chapter_id: None });
        let theirs = Record::User(UserRecord { user_id: UserId::new(), chapter_id: None });

        assert_eq!(ability.can(Action::Update, ResourceArea::UserArea, Some(&mine)), Ok(true));
        assert_eq!(ability.can(Action::Update, ResourceArea::UserArea, Some(&theirs)), Ok(false));
        // Without a record the question is "for at least some records".
        assert_eq!(ability.can(Action::Update, ResourceArea::UserArea, None), Ok(true));
    }

    #[test]
    fn missing_condition_field_fails_fast() {
        let ability = Ability::for_principal(&principal(&[Role::Mentor]));
        let record = Record::Session(SessionRecord { mentor_id: None, chapter_id: None });

        assert_eq!(
            ability.can(Action::View, ResourceArea::SessionArea, Some(&record)),
            Err(AbilityError::MissingField {
                area: ResourceArea::SessionArea,
                field: "owner",
            })
        );
    }

    #[test]
    fn missing_field_error_does_not_depend_on_an_unconditional_match() {
        let me = UserId::new();
        // The unconditional rule would allow, but the conditional one cannot be evaluated.
        let ability = Ability::from_rules([
            Rule::new(Action::View, ResourceArea::SessionArea),
            Rule::new(Action::View, ResourceArea::SessionArea).when(Condition::OwnedBy(me)),
        ]);
        let record = Record::Session(SessionRecord { mentor_id: None, chapter_id: None });

        assert!(ability.can(Action::View, ResourceArea::SessionArea, Some(&record)).is_err());
    }

    #[test]
    fn record_of_another_area_is_rejected() {
        let ability = Ability::for_principal(&principal(&[Role::Admin]));
        let record = Record::Student(StudentRecord {
            student_id: StudentId::new(),
            chapter_id: None,
        });

        assert_eq!(
            ability.can(Action::View, ResourceArea::UserArea, Some(&record)),
            Err(AbilityError::AreaMismatch {
                expected: ResourceArea::UserArea,
                found: ResourceArea::StudentArea,
            })
        );
    }

    #[test]
    fn identical_inputs_build_identical_abilities() {
        let p = principal(&[Role::Mentor, Role::Attendances]).with_chapter(ChapterId::new());
        assert_eq!(Ability::for_principal(&p), Ability::for_principal(&p));
    }

    #[test]
    fn names_parse_back() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
        }
        for area in ResourceArea::ALL {
            assert_eq!(area.as_str().parse::<ResourceArea>(), Ok(area));
        }
        assert!("destroy".parse::<Action>().is_err());
    }

    fn roles_from_mask(mask: u8) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, r)| r)
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        #[test]
        fn union_of_roles_is_monotonic(a in 0u8..8, b in 0u8..8, with_chapter in any::<bool>()) {
            let id = UserId::new();
            let chapter = ChapterId::new();
            let build = |roles: Vec<Role>| {
                let p = Principal::new(id, "P", roles);
                let p = if with_chapter { p.with_chapter(chapter) } else { p };
                Ability::for_principal(&p)
            };

            let r1 = roles_from_mask(a);
            let r2 = roles_from_mask(b);
            let union: Vec<Role> = r1.iter().chain(r2.iter()).copied().collect();

            let combined = build(union);
            prop_assert!(combined.covers(&build(r1)));
            prop_assert!(combined.covers(&build(r2)));
        }

        #[test]
        fn ungranted_pairs_are_denied(mask in 0u8..8, action_idx in 0usize..6, area_idx in 0usize..8) {
            let p = Principal::new(UserId::new(), "P", roles_from_mask(mask)).with_chapter(ChapterId::new());
            let ability = Ability::for_principal(&p);
            let action = Action::ALL[action_idx];
            let area = ResourceArea::ALL[area_idx];

            if !ability.has_rules_for(action, area) {
                prop_assert_eq!(ability.can(action, area, None), Ok(false));
            }
        }
    }
}
