//! Role to rule mapping.

use mentorhub_core::{ChapterId, UserId};

use crate::ability::{Ability, Action, Condition, ResourceArea, Rule};
use crate::{Principal, Role};

/// Rules granted by one role to a principal with the given scope.
///
/// Chapter-bound roles grant nothing when `chapter_id` is `None`.
pub fn rules_for_role(role: Role, user_id: UserId, chapter_id: Option<ChapterId>) -> Vec<Rule> {
    use Action::*;
    use ResourceArea::*;

    match role {
        Role::Admin => ResourceArea::ALL
            .into_iter()
            .flat_map(|area| Action::ALL.into_iter().map(move |action| Rule::new(action, area)))
            .collect(),

        Role::Mentor => {
            let own = Condition::OwnedBy(user_id);
            let mut rules = vec![
                Rule::new(View, ChapterArea),
                Rule::new(View, RosterArea),
                Rule::new(Update, RosterArea).when(own),
                Rule::new(View, UserArea).when(own),
                Rule::new(Update, UserArea).when(own),
                Rule::new(View, CheckArea).when(own),
            ];
            for area in [SessionArea, ReportArea] {
                for action in [View, Create, Update] {
                    rules.push(Rule::new(action, area).when(own));
                }
            }
            rules
        }

        Role::Attendances => {
            let Some(chapter_id) = chapter_id else {
                return Vec::new();
            };
            let in_chapter = Condition::InChapter(chapter_id);
            let mut rules: Vec<Rule> = [View, Create, Update, Delete]
                .into_iter()
                .map(|action| Rule::new(action, AttendanceArea).when(in_chapter))
                .collect();
            for area in [RosterArea, StudentArea, UserArea] {
                rules.push(Rule::new(View, area).when(in_chapter));
            }
            rules
        }
    }
}

pub(crate) fn build(principal: &Principal) -> Ability {
    if principal.has_role(Role::Attendances) && principal.chapter_id().is_none() {
        tracing::warn!(
            user_id = %principal.id(),
            "Attendances role without an assigned chapter grants no rules"
        );
    }

    Ability::from_rules(
        principal
            .roles()
            .flat_map(|role| rules_for_role(role, principal.id(), principal.chapter_id())),
    )
}
