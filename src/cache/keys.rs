//! Cache Key Conventions
//!
//! Keys follow `domain:subject:discriminator` so related entries can be
//! dropped together with [`TtlCache::delete_by_prefix`](super::TtlCache::delete_by_prefix).

use serde::Serialize;

/// Namespace used for tag-based invalidation.
pub const TAG_NAMESPACE: &str = "tag";

/// Namespace for cached HTTP responses.
pub const RESPONSE_NAMESPACE: &str = "http";

/// `project:{id}`
pub fn project(id: impl std::fmt::Display) -> String {
    format!("project:{id}")
}

/// `projects:user:{user_id}:{filters as JSON}`
///
/// Filters are serialized with serde_json, so structs and `BTreeMap`s give
/// the same key for the same value.
pub fn projects_for_user<F: Serialize>(user_id: impl std::fmt::Display, filters: &F) -> String {
    let filters = serde_json::to_string(filters).unwrap_or_else(|_| "null".to_string());
    format!("{}{filters}", projects_for_user_prefix(user_id))
}

/// Prefix covering every cached project listing of one user.
pub fn projects_for_user_prefix(user_id: impl std::fmt::Display) -> String {
    format!("projects:user:{user_id}:")
}

/// `quote:{id}`
pub fn quote(id: impl std::fmt::Display) -> String {
    format!("quote:{id}")
}

/// `quotes:project:{project_id}`
pub fn quotes_for_project(project_id: impl std::fmt::Display) -> String {
    format!("quotes:project:{project_id}")
}

/// `user:{id}`
pub fn user(id: impl std::fmt::Display) -> String {
    format!("user:{id}")
}

/// `http:{subject}:{METHOD}:{uri}`
pub fn response(subject: &str, method: &str, uri: &str) -> String {
    format!(
        "{}{}:{uri}",
        responses_for_subject_prefix(subject),
        method.to_ascii_uppercase()
    )
}

/// Prefix covering every cached response rendered for `subject`.
///
/// The trailing separator keeps `user-1` from matching `user-10`.
pub fn responses_for_subject_prefix(subject: &str) -> String {
    format!("{RESPONSE_NAMESPACE}:{subject}:")
}

/// `tag:{tag}:{key}`
pub fn tagged(tag: &str, key: &str) -> String {
    format!("{}{key}", tag_prefix(tag))
}

/// `tag:{tag}:`
pub fn tag_prefix(tag: &str) -> String {
    format!("{TAG_NAMESPACE}:{tag}:")
}
