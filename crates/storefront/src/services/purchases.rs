//! Course purchases.
//!
//! The session keeps the set of owned courses. The backend is charged when
//! it is reachable; when it is down the purchase is recorded locally so the
//! learner is not blocked.

use ringside_core::{CourseId, PurchasedCourses};
use tower_sessions::Session;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::{AppError, add_breadcrumb};
use crate::models::session_keys;

/// Result of a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    /// The backend accepted the payment.
    Purchased { receipt: Option<String> },
    /// The course was already owned; nothing was charged.
    AlreadyOwned,
    /// The backend was unreachable and the purchase was recorded locally.
    RecordedOffline,
}

/// Load the owned-course set. A missing or unreadable value is empty.
pub async fn load(session: &Session) -> PurchasedCourses {
    match session.get::<PurchasedCourses>(session_keys::PURCHASED_COURSES).await {
        Ok(owned) => owned.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Discarding unreadable purchases");
            PurchasedCourses::new()
        }
    }
}

/// Persist the owned-course set.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn save(session: &Session, owned: &PurchasedCourses) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::PURCHASED_COURSES, owned).await
}

/// Whether the visitor owns a course.
pub async fn owns(session: &Session, course_id: CourseId) -> bool {
    load(session).await.contains(course_id)
}

/// Merge course IDs reported by the backend profile.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn merge(
    session: &Session,
    ids: impl IntoIterator<Item = CourseId>,
) -> Result<(), tower_sessions::session::Error> {
    let mut owned = load(session).await;
    owned.extend(ids);
    save(session, &owned).await
}

/// Buy a course for the signed-in visitor.
///
/// # Errors
///
/// Returns [`AppError::Api`] when the backend answers with a rejection
/// (declined payment, unknown course, expired token), or
/// [`AppError::Session`] if the session cannot be written.
pub async fn purchase_course(
    api: &ApiClient,
    session: &Session,
    token: &str,
    course_id: CourseId,
) -> Result<PurchaseOutcome, AppError> {
    let mut owned = load(session).await;
    if owned.contains(course_id) {
        return Ok(PurchaseOutcome::AlreadyOwned);
    }

    let outcome = match api.purchase_course(token, course_id).await {
        Ok(receipt) => {
            info!(course_id = %course_id, "Course purchased");
            PurchaseOutcome::Purchased {
                receipt: receipt.receipt_id,
            }
        }
        Err(e) if e.is_unavailable() => {
            warn!(error = %e, course_id = %course_id, "Payments unavailable, recording purchase locally");
            PurchaseOutcome::RecordedOffline
        }
        Err(e) => return Err(e.into()),
    };

    owned.record(course_id);
    save(session, &owned).await?;
    add_breadcrumb("purchase", "Purchased course", Some(&[("course_id", course_id.to_string().as_str())]));

    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_merge_unions_backend_ids() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        merge(&session, [CourseId::new(1)]).await.unwrap();
        merge(&session, [CourseId::new(3), CourseId::new(1)]).await.unwrap();

        let owned = load(&session).await;
        assert_eq!(owned.len(), 2);
        assert!(owns(&session, CourseId::new(3)).await);
        assert!(!owns(&session, CourseId::new(2)).await);
    }
}
