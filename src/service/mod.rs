//! Business logic layer

pub mod authorizer;
pub mod guard;
pub mod translator;

pub use authorizer::MembershipAuthorizer;
pub use guard::AuthorizationGuard;
pub use translator::{IdentifierTranslator, NormalizedStore, TranslationError};
