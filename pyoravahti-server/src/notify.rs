//! Admin notifications for ownership claims and abuse reports.
//!
//! No mail transport is wired in; [`LogNotifier`] writes the message to the
//! log so operators can act on it.

use async_trait::async_trait;
use pyoravahti_core::Bike;

/// Recipient of all admin notifications.
pub const ADMIN_EMAIL: &str = "admin@pyoravahti.fi";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OwnershipClaim,
    AbuseReport,
}

impl NotificationKind {
    fn subject_prefix(&self) -> &'static str {
        match self {
            NotificationKind::OwnershipClaim => "Omistajuusväite pyörälle",
            NotificationKind::AbuseReport => "Väärinkäyttöilmoitus pyörälle",
        }
    }

    fn intro(&self) -> &'static str {
        match self {
            NotificationKind::OwnershipClaim => "Uusi omistajuusväite on tehty pyörälle:",
            NotificationKind::AbuseReport => "Uusi väärinkäyttöilmoitus on tehty pyörälle:",
        }
    }

    fn action(&self) -> &'static str {
        match self {
            NotificationKind::OwnershipClaim => {
                "Tarkista pyörän tiedot ja ota yhteyttä väittäjään."
            }
            NotificationKind::AbuseReport => {
                "Tarkista pyörän tiedot ja ryhdy tarvittaviin toimiin."
            }
        }
    }
}

impl Notification {
    /// Build the admin message about a bike.
    pub fn about_bike(kind: NotificationKind, bike: &Bike) -> Self {
        let brand = bike.brand.as_deref().unwrap_or("");
        let model = bike.model.as_deref().unwrap_or("");

        let subject = format!("{}: {} {} ({})", kind.subject_prefix(), brand, model, bike.id);
        let body = format!(
            "{}\n\nPyörä ID: {}\nMerkki: {}\nMalli: {}\n\n{}",
            kind.intro(),
            bike.id,
            bike.brand.as_deref().unwrap_or("-"),
            bike.model.as_deref().unwrap_or("-"),
            kind.action()
        );

        Self {
            to: ADMIN_EMAIL.to_string(),
            subject,
            body,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to send notification: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending mail.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            body = %notification.body,
            "Admin notification"
        );
        Ok(())
    }
}
