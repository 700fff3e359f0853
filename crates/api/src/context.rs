use std::sync::Arc;

use mentorhub_auth::{
    Ability, Action, AuthzError, Principal, Record, ResourceArea, authorize,
};

/// Per-request security context: the authenticated principal and its ability.
///
/// Built once by the auth middleware and immutable for the request lifetime.
#[derive(Debug, Clone)]
pub struct RequestContext {
    principal: Arc<Principal>,
    ability: Arc<Ability>,
}

impl RequestContext {
    pub fn new(principal: Principal) -> Self {
        let ability = Ability::for_principal(&principal);
        Self {
            principal: Arc::new(principal),
            ability: Arc::new(ability),
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn ability(&self) -> &Ability {
        &self.ability
    }

    /// Gate on an area before any record is loaded.
    ///
    /// Passes when the principal may act on at least some records of the area.
    pub fn require_area(&self, action: Action, area: ResourceArea) -> Result<(), AuthzError> {
        self.check(action, area, None)
    }

    /// Gate on one loaded record.
    pub fn require(&self, action: Action, record: &Record) -> Result<(), AuthzError> {
        self.check(action, record.area(), Some(record))
    }

    /// Whether `action` is allowed on `record`. A `false` is not logged as a denial.
    pub fn allows(&self, action: Action, record: &Record) -> Result<bool, AuthzError> {
        Ok(self.ability.can(action, record.area(), Some(record))?)
    }

    fn check(
        &self,
        action: Action,
        area: ResourceArea,
        record: Option<&Record>,
    ) -> Result<(), AuthzError> {
        let result = authorize(&self.ability, action, area, record);
        if let Err(AuthzError::Forbidden { .. }) = &result {
            tracing::info!(
                user_id = %self.principal.id(),
                action = %action,
                area = %area,
                scoped = record.is_some(),
                "request denied"
            );
        }
        result
    }
}
