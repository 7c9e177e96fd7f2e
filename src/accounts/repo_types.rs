use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Account role. Declaration order is the promotion order.
///
/// Demotion floors at `Client`: `Undefined` is a placeholder and is never
/// reached by demoting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Placeholder; as a query filter it matches every role.
    Undefined = 0,
    Client = 1,
    Librarian = 2,
    Admin = 3,
}

/// Roles reachable through promotion and demotion, lowest first.
const LADDER: [Role; 3] = [Role::Client, Role::Librarian, Role::Admin];

impl Role {
    /// One step up the ladder, `None` at the top. `Undefined` promotes to `Client`.
    pub fn promoted(self) -> Option<Role> {
        match self {
            Role::Undefined => Some(Role::Client),
            r => {
                let pos = LADDER.iter().position(|l| *l == r)?;
                LADDER.get(pos + 1).copied()
            }
        }
    }

    /// One step down the ladder, `None` at `Client` or for `Undefined`.
    pub fn demoted(self) -> Option<Role> {
        let pos = LADDER.iter().position(|l| *l == self)?;
        pos.checked_sub(1).and_then(|p| LADDER.get(p).copied())
    }

    /// `Undefined` means "any role" when used as a filter.
    pub fn as_filter(self) -> Option<Role> {
        match self {
            Role::Undefined => None,
            r => Some(r),
        }
    }
}

/// User record in the users collection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,                   // human-chosen unique name
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 PHC string, never exposed
    pub product_count: i64,
    pub created_at: OffsetDateTime,
}

/// Filter for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub id_contains: Option<String>,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        let id_ok = self
            .id_contains
            .as_deref()
            .map_or(true, |needle| user.id.contains(needle));
        let role_ok = self.role.map_or(true, |r| user.role == r);
        id_ok && role_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_walks_the_ladder() {
        assert_eq!(Role::Undefined.promoted(), Some(Role::Client));
        assert_eq!(Role::Client.promoted(), Some(Role::Librarian));
        assert_eq!(Role::Librarian.promoted(), Some(Role::Admin));
        assert_eq!(Role::Admin.promoted(), None);
    }

    #[test]
    fn demotion_floors_at_client() {
        assert_eq!(Role::Admin.demoted(), Some(Role::Librarian));
        assert_eq!(Role::Librarian.demoted(), Some(Role::Client));
        assert_eq!(Role::Client.demoted(), None);
        assert_eq!(Role::Undefined.demoted(), None);
    }

    #[test]
    fn promote_then_demote_is_identity_off_the_boundaries() {
        let r = Role::Librarian;
        assert_eq!(r.promoted().and_then(Role::demoted), Some(r));
    }

    #[test]
    fn roles_are_totally_ordered() {
        assert!(Role::Undefined < Role::Client);
        assert!(Role::Client < Role::Librarian);
        assert!(Role::Librarian < Role::Admin);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User {
            id: "alice".into(),
            role: Role::Client,
            password_hash: "$argon2id$secret".into(),
            product_count: 0,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("\"client\""));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn filter_matches_substring_and_role() {
        let user = User {
            id: "User1".into(),
            role: Role::Client,
            password_hash: String::new(),
            product_count: 0,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let f = UserFilter {
            id_contains: Some("ser1".into()),
            role: Role::Undefined.as_filter(),
        };
        assert!(f.matches(&user));
        let f = UserFilter {
            id_contains: None,
            role: Some(Role::Librarian),
        };
        assert!(!f.matches(&user));
    }
}
