//! Resource names for a user's collection.
//!
//! Every resource is named after the user id, so a collection can be located
//! again from the id alone without any stored state. The id doubles as the
//! blob container name, which means it must satisfy the storage and search
//! naming rules: 3 to 63 characters of lowercase letters, digits and hyphens.
//! Invalid ids are not rejected here; the services refuse them later.

use std::sync::LazyLock;

use regex::Regex;

/// Lowercase alphanumeric runs joined by single hyphens.
static VALID_USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

pub const INDEX_SUFFIX: &str = "_index";
pub const DATA_SOURCE_SUFFIX: &str = "-ds";
pub const SKILLSET_SUFFIX: &str = "-ss";
pub const INDEXER_SUFFIX: &str = "-indexer";

/// Names of the five resources making up one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceNames {
    pub container_name: String,
    pub index_name: String,
    pub data_source_name: String,
    pub skillset_name: String,
    pub indexer_name: String,
}

impl ResourceNames {
    pub fn derive(user_id: &str) -> Self {
        if !is_valid_user_id(user_id) {
            tracing::warn!(
                user_id,
                "User id is not a valid container name (3-63 lowercase letters, digits or \
                 single hyphens); the storage and search services will reject it"
            );
        }

        Self {
            container_name: user_id.to_string(),
            index_name: format!("{user_id}{INDEX_SUFFIX}"),
            data_source_name: format!("{user_id}{DATA_SOURCE_SUFFIX}"),
            skillset_name: format!("{user_id}{SKILLSET_SUFFIX}"),
            indexer_name: format!("{user_id}{INDEXER_SUFFIX}"),
        }
    }
}

/// Whether `user_id` is accepted as a container name.
pub fn is_valid_user_id(user_id: &str) -> bool {
    (3..=63).contains(&user_id.len()) && VALID_USER_ID.is_match(user_id)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_derive_names() {
        let names = ResourceNames::derive("alice");
        assert_eq!(names.container_name, "alice");
        assert_eq!(names.index_name, "alice_index");
        assert_eq!(names.data_source_name, "alice-ds");
        assert_eq!(names.skillset_name, "alice-ss");
        assert_eq!(names.indexer_name, "alice-indexer");
    }

    #[test]
    fn test_distinct_users_get_distinct_names() {
        let a = ResourceNames::derive("team-a");
        let b = ResourceNames::derive("team-b");
        assert_ne!(a.index_name, b.index_name);
        assert_ne!(a.indexer_name, b.indexer_name);
    }

    #[test]
    fn test_invalid_id_still_derives() {
        let names = ResourceNames::derive("Alice");
        assert_eq!(names.index_name, "Alice_index");
    }

    #[rstest]
    #[case("alice", true)]
    #[case("user-42", true)]
    #[case("abc", true)]
    #[case("a-b", true)]
    #[case("ab", false)]
    #[case("Alice", false)]
    #[case("-alice", false)]
    #[case("alice-", false)]
    #[case("al--ice", false)]
    #[case("al_ice", false)]
    #[case(&"a".repeat(63), true)]
    #[case(&"a".repeat(64), false)]
    fn test_user_id_validity(#[case] user_id: &str, #[case] valid: bool) {
        assert_eq!(is_valid_user_id(user_id), valid);
    }
}
