use serde::{Deserialize, Serialize};

use crate::{
    document_db::{CollectionSpec, Predicate, SortOrder},
    error::CmsResult,
    resource::{require, Conflict, Resource, UniqueKey},
};

/// Site user. `clerk_id` references the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub clerk_id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub clerk_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// The only fields a user update may touch. Anything else in the request
/// body is dropped during decoding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub email: Option<String>,
}

fn clerk_id(user: &User) -> &str {
    &user.clerk_id
}

fn email(user: &User) -> &str {
    &user.email
}

/// Empty strings count as "not supplied".
fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

impl Resource for User {
    const MODEL: &'static str = "User";
    const PLURAL: &'static str = "users";
    const COLLECTION: CollectionSpec = CollectionSpec {
        name: "users",
        unique_fields: &["clerkId", "email"],
    };
    const UNIQUE_KEYS: &'static [UniqueKey<Self>] = &[
        UniqueKey {
            field: "clerkId",
            conflict: Conflict::User,
            value: clerk_id,
        },
        UniqueKey {
            field: "email",
            conflict: Conflict::Email,
            value: email,
        },
    ];
    const SORT: SortOrder = SortOrder::Native;
    const DEFAULT_LIMIT: u64 = 20;

    type Draft = NewUser;
    type Patch = UserPatch;
    type Filter = ();

    fn from_draft(draft: NewUser) -> Self {
        Self {
            clerk_id: draft.clerk_id,
            name: draft.name,
            email: draft.email,
            avatar: draft.avatar,
        }
    }

    fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(name) = supplied(patch.name) {
            self.name = name;
        }
        if let Some(avatar) = supplied(patch.avatar) {
            self.avatar = Some(avatar);
        }
        if let Some(email) = supplied(patch.email) {
            self.email = email;
        }
    }

    fn validate(&self) -> CmsResult<()> {
        require(Self::MODEL, "clerkId", &self.clerk_id)?;
        require(Self::MODEL, "name", &self.name)?;
        require(Self::MODEL, "email", &self.email)
    }

    fn predicates(_filter: &()) -> Vec<Predicate> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::resource::parse_body;

    fn user() -> User {
        User {
            clerk_id: "user_1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar: None,
        }
    }

    #[test]
    fn patch_drops_fields_outside_allow_list() {
        let mut stored = user();
        let patch: UserPatch = parse_body(
            "User",
            json!({ "role": "admin", "clerkId": "user_2", "name": "Ada L." }),
        )
        .expect("extra fields are ignored");
        stored.apply_patch(patch);
        assert_eq!(stored.clerk_id, "user_1");
        assert_eq!(stored.name, "Ada L.");
        assert!(serde_json::to_value(&stored)
            .expect("serialize")
            .get("role")
            .is_none());
    }

    #[test]
    fn empty_values_are_not_applied() {
        let mut stored = user();
        stored.apply_patch(UserPatch {
            name: Some(String::new()),
            avatar: Some("/a.png".to_string()),
            email: Some(String::new()),
        });
        assert_eq!(stored.name, "Ada");
        assert_eq!(stored.email, "ada@example.com");
        assert_eq!(stored.avatar.as_deref(), Some("/a.png"));
    }

    #[test]
    fn unique_keys_check_clerk_id_before_email() {
        let fields: Vec<_> = User::UNIQUE_KEYS.iter().map(|key| key.field).collect();
        assert_eq!(fields, vec!["clerkId", "email"]);
        assert_eq!(User::COLLECTION.unique_fields, &["clerkId", "email"]);
    }
}
