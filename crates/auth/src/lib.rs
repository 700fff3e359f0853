//! `mentorhub-auth` — roles, abilities and token verification.
//!
//! This crate is decoupled from HTTP and storage: callers hand it claims and
//! typed records, it answers permission questions.

pub mod ability;
pub mod authorize;
pub mod claims;
pub mod policy;
pub mod principal;
pub mod record;
pub mod roles;
pub mod token;

pub use ability::{Ability, AbilityError, Action, Condition, ResourceArea, Rule};
pub use authorize::{
    AuthorizationExplanation, AuthzError, DenialKind, RoleDefinition, authorize,
    explain_authorization, role_catalogue,
};
pub use claims::{IdentityClaims, TokenValidationError, extract_roles, validate_claims};
pub use principal::Principal;
pub use record::Record;
pub use roles::{Role, UnknownRole};
pub use token::{Hs256TokenValidator, TokenValidator};
