//! User-facing messages for orchestration failures
//!
//! Two branches: relay transport failures get the Tor message, everything
//! else is looked up by error signature. Unknown signatures fall back to a
//! generic template that names the signature.

use serde::Serialize;

use crate::error::AuroraError;

pub mod templates {
    pub const TOR_TITLE: &str = "Connection problem";
    pub const TOR_DESCRIPTION: &str = "Aurora could not reach the Tor network. \
        Check your internet connection and try again.";

    pub const CORRUPTED_DATABASE_TITLE: &str = "Wallet could not be opened";
    pub const CORRUPTED_DATABASE: &str = "Your wallet database appears to be corrupted. \
        Delete this wallet and restore it from your seed words to continue.";

    pub const DATABASE_MISSING: &str = "No wallet was found on this device.";
    pub const INVALID_SEED_WORDS: &str =
        "The seed words you entered are not valid. Check each word and try again.";
    pub const ALREADY_EXISTS: &str = "A wallet already exists on this device.";
    pub const RECOVERY_FAILED: &str =
        "Your wallet could not be restored. Check your recovery data and try again.";
    pub const VERSION_MISMATCH: &str =
        "This wallet was created by an unsupported version of Aurora.";

    pub const GENERIC_TITLE: &str = "Something went wrong";
    pub const GENERIC_DESCRIPTION: &str = "An unexpected error occurred. Please try again.";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Follow-up the user can take from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageAction {
    DeleteAndRetry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageModel {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub action: Option<MessageAction>,
}

impl MessageModel {
    fn new(title: &str, description: &str, severity: Severity) -> Self {
        Self { title: title.into(), description: description.into(), severity, action: None }
    }

    fn with_action(mut self, action: MessageAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// signature → (title, description, severity, action)
const TABLE: &[(&str, &str, &str, Severity, Option<MessageAction>)] = &[
    (
        "wallet.corrupted_database",
        templates::CORRUPTED_DATABASE_TITLE,
        templates::CORRUPTED_DATABASE,
        Severity::Error,
        Some(MessageAction::DeleteAndRetry),
    ),
    (
        "wallet.database_missing",
        templates::GENERIC_TITLE,
        templates::DATABASE_MISSING,
        Severity::Error,
        None,
    ),
    (
        "wallet.invalid_seed_words",
        templates::GENERIC_TITLE,
        templates::INVALID_SEED_WORDS,
        Severity::Warning,
        None,
    ),
    (
        "wallet.already_exists",
        templates::GENERIC_TITLE,
        templates::ALREADY_EXISTS,
        Severity::Warning,
        None,
    ),
    (
        "recovery.failed",
        templates::GENERIC_TITLE,
        templates::RECOVERY_FAILED,
        Severity::Error,
        None,
    ),
    (
        "wallet.version",
        templates::GENERIC_TITLE,
        templates::VERSION_MISMATCH,
        Severity::Error,
        Some(MessageAction::DeleteAndRetry),
    ),
];

pub struct ErrorMessages;

impl ErrorMessages {
    pub fn message_for(error: &AuroraError) -> MessageModel {
        if error.is_transport() {
            return MessageModel::new(
                templates::TOR_TITLE,
                templates::TOR_DESCRIPTION,
                Severity::Warning,
            );
        }

        let signature = error.signature();
        match TABLE.iter().find(|(sig, ..)| *sig == signature) {
            Some((_, title, description, severity, action)) => {
                let message = MessageModel::new(title, description, *severity);
                match action {
                    Some(action) => message.with_action(*action),
                    None => message,
                }
            }
            None => MessageModel::new(
                templates::GENERIC_TITLE,
                &format!("{} ({})", templates::GENERIC_DESCRIPTION, signature),
                Severity::Error,
            ),
        }
    }
}
