use super::types::{OperationName, PolicyEntry, TypedValue};
use std::sync::OnceLock;

const LOCK_TITLE: &str = "Lock prevented";
const LOCK_MESSAGE: &str = "Administrator is trying to lock your device.";
const WIPE_TITLE: &str = "Wipe prevented";
const WIPE_MESSAGE: &str = "Administrator is trying to wipe/reset your device.";
const RESET_TITLE: &str = "Password reset blocked";
const RESET_MESSAGE: &str = "Administrator is trying to reset your password.";

/// Static mapping from operation to its block policy. Read-only for the life
/// of the process.
#[derive(Debug)]
pub struct PolicyTable {
    lock_now: PolicyEntry,
    wipe_data: PolicyEntry,
    wipe_device: PolicyEntry,
    reset_password_with_token: PolicyEntry,
}

impl PolicyTable {
    fn build() -> Self {
        Self {
            lock_now: PolicyEntry {
                title: LOCK_TITLE,
                message: LOCK_MESSAGE,
                placeholder: TypedValue::Void,
                notification_offset: 0,
            },
            wipe_data: PolicyEntry {
                title: WIPE_TITLE,
                message: WIPE_MESSAGE,
                placeholder: TypedValue::Void,
                notification_offset: 1,
            },
            wipe_device: PolicyEntry {
                title: WIPE_TITLE,
                message: WIPE_MESSAGE,
                placeholder: TypedValue::Void,
                notification_offset: 2,
            },
            reset_password_with_token: PolicyEntry {
                title: RESET_TITLE,
                message: RESET_MESSAGE,
                placeholder: TypedValue::Bool(false),
                notification_offset: 3,
            },
        }
    }

    /// Process-wide table.
    pub fn global() -> &'static PolicyTable {
        static TABLE: OnceLock<PolicyTable> = OnceLock::new();
        TABLE.get_or_init(PolicyTable::build)
    }

    pub fn lookup(&self, operation: OperationName) -> &PolicyEntry {
        match operation {
            OperationName::LockNow => &self.lock_now,
            OperationName::WipeData => &self.wipe_data,
            OperationName::WipeDevice => &self.wipe_device,
            OperationName::ResetPasswordWithToken => &self.reset_password_with_token,
        }
    }
}
