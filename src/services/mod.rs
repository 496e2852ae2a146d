pub mod notification;
pub use notification::{Mailer, NotificationError};

pub mod verification_service;
pub mod verification_service_impl;
pub use verification_service::{
    Registration, RegistrationRequest, VerificationError, VerificationService, VerifyOutcome,
};
pub use verification_service_impl::SeaOrmVerificationService;

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{AccountError, AccountService};
pub use account_service_impl::SeaOrmAccountService;

pub mod inbox_service;
pub mod inbox_service_impl;
pub use inbox_service::{InboxError, InboxService};
pub use inbox_service_impl::SeaOrmInboxService;

pub mod suggestion_service;
pub use suggestion_service::{Suggestion, SuggestionError, SuggestionService, TextGenerator};
