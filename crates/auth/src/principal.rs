use std::collections::BTreeSet;

use serde::Serialize;

use mentorhub_core::{ChapterId, UserId};

use crate::Role;
use crate::claims::{IdentityClaims, extract_roles};

/// The authenticated actor making a request.
///
/// Built once per request from verified claims and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    id: UserId,
    display_name: String,
    roles: BTreeSet<Role>,
    chapter_id: Option<ChapterId>,
}

impl Principal {
    pub fn new(
        id: UserId,
        display_name: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            roles: roles.into_iter().collect(),
            chapter_id: None,
        }
    }

    /// Assign the chapter that scopes chapter-bound roles.
    pub fn with_chapter(mut self, chapter_id: ChapterId) -> Self {
        self.chapter_id = Some(chapter_id);
        self
    }

    pub fn from_claims(claims: &IdentityClaims) -> Self {
        Self {
            id: claims.oid,
            display_name: claims.name.clone(),
            roles: extract_roles(claims).into_iter().collect(),
            chapter_id: claims.chapter_id,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.roles.iter().copied()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn chapter_id(&self) -> Option<ChapterId> {
        self.chapter_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_claims_normalizes_roles_and_keeps_scope() {
        let chapter = ChapterId::new();
        let claims = IdentityClaims {
            oid: UserId::new(),
            name: "Avery".to_string(),
            preferred_username: None,
            roles: vec!["Attendances".into(), "Attendances".into(), "Unknown".into()],
            chapter_id: Some(chapter),
            iat: 0,
            exp: 60,
        };

        let principal = Principal::from_claims(&claims);
        assert_eq!(principal.id(), claims.oid);
        assert_eq!(principal.display_name(), "Avery");
        assert_eq!(principal.roles().collect::<Vec<_>>(), vec![Role::Attendances]);
        assert_eq!(principal.chapter_id(), Some(chapter));
    }

    #[test]
    fn duplicate_roles_collapse() {
        let principal = Principal::new(UserId::new(), "Kai", [Role::Mentor, Role::Mentor]);
        assert_eq!(principal.roles().count(), 1);
        assert!(principal.has_role(Role::Mentor));
        assert!(!principal.has_role(Role::Admin));
    }
}
