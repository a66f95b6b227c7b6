//! User-visible notifications raised by loads and mutations.

use tokio::sync::broadcast;

use crate::core::dates::DisplayDateError;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Fields,
    Tasks,
    Crops,
    FieldDetail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LoadFailed(View),
    TaskCreated,
    TaskCreateFailed,
    TaskUpdated,
    TaskUpdateFailed,
    TaskDeleted,
    TaskDeleteFailed,
    TaskHasNoField,
    CropUpdated,
    CropUpdateFailed,
    CropDeleted,
    CropDeleteFailed,
    BadDate(DisplayDateError),
}

impl Notice {
    /// Translation key for the message shown to the user.
    pub fn key(&self) -> &'static str {
        match self {
            Self::LoadFailed(View::Dashboard) => "DASHBOARD.LOAD_ERROR",
            Self::LoadFailed(View::Fields) => "FIELDS.LOAD_ERROR",
            Self::LoadFailed(View::Tasks) => "TASKS.LOAD_ERROR",
            Self::LoadFailed(View::Crops) => "CROPS.LOAD_ERROR",
            Self::LoadFailed(View::FieldDetail) => "FIELD.LOAD_ERROR",
            Self::TaskCreated => "TASKS.CREATE_SUCCESS",
            Self::TaskCreateFailed => "TASKS.CREATE_ERROR",
            Self::TaskUpdated => "TASKS.UPDATE_SUCCESS",
            Self::TaskUpdateFailed => "TASKS.UPDATE_ERROR",
            Self::TaskDeleted => "TASKS.DELETE_SUCCESS",
            Self::TaskDeleteFailed => "TASKS.DELETE_ERROR",
            Self::TaskHasNoField => "TASKS.ERROR_NO_FIELD",
            Self::CropUpdated => "CROPS.UPDATE_SUCCESS",
            Self::CropUpdateFailed => "CROPS.UPDATE_ERROR",
            Self::CropDeleted => "CROPS.DELETE_SUCCESS",
            Self::CropDeleteFailed => "CROPS.DELETE_ERROR",
            Self::BadDate(e) => e.notice_key(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Self::TaskCreated | Self::TaskUpdated | Self::TaskDeleted | Self::CropUpdated | Self::CropDeleted
        )
    }
}

/// Fan-out of notices to whoever is listening. Sending never blocks and is
/// a no-op without subscribers.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { tx }
    }

    pub fn notify(&self, notice: Notice) {
        if notice.is_error() {
            log::warn!("Notice: {}", notice.key());
        } else {
            log::debug!("Notice: {}", notice.key());
        }
        let _ = self.tx.send(notice);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_without_subscribers_is_fine() {
        Notifier::new().notify(Notice::TaskDeleted);
    }

    #[test]
    fn subscribers_receive_notices() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        notifier.notify(Notice::TaskUpdateFailed);
        notifier.notify(Notice::BadDate(DisplayDateError::InvalidFormat));
        assert_eq!(rx.try_recv().unwrap(), Notice::TaskUpdateFailed);
        assert_eq!(rx.try_recv().unwrap().key(), "DATE.ERROR_INVALID_FORMAT");
    }
}
