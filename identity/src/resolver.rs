use crate::client::{IdentityError, IdentityStore};

/// Suffix appended to a course id to form the compatibility course key.
///
/// Historical anonymous-id records were written under course keys carrying
/// this suffix; the value must match those records byte for byte.
pub const COMPAT_COURSE_SUFFIX: &str = "_CRM_XBLOCK";

/// Derive the compatibility course key for a course id.
pub fn compat_course_key(course_id: &str) -> String {
    format!("{course_id}{COMPAT_COURSE_SUFFIX}")
}

/// Resolve the anonymous id to send to the CRM.
///
/// Prefers the anonymous id recorded for this user under the compatibility
/// course key, which preserves identity continuity across the course-key
/// migration. Falls back to the current session's anonymous id when no
/// record exists.
pub async fn resolve_anonymous_id(
    store: &dyn IdentityStore,
    current_anonymous_id: &str,
    course_id: &str,
) -> Result<String, IdentityError> {
    let course_key = compat_course_key(course_id);
    match store
        .recorded_anonymous_id(current_anonymous_id, &course_key)
        .await?
    {
        Some(recorded) => Ok(recorded),
        None => Ok(current_anonymous_id.to_string()),
    }
}
