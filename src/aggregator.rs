//! Reduction of site outcomes into a group outcome

use crate::status::Status;

/// A group succeeds only if every one of its sites succeeded in this run.
///
/// An empty group is vacuously successful.
pub fn aggregate<I>(statuses: I) -> Status
where
    I: IntoIterator<Item = Status>,
{
    if statuses.into_iter().all(|s| s.is_success()) {
        Status::Success
    } else {
        Status::Error
    }
}
