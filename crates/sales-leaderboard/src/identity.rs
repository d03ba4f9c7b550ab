//! Signed-in manager identity
//!
//! Signing in is by nickname only. A nickname that matches a manager binds
//! the session to that manager's id; anything else still gets in as a guest
//! with a throwaway `temp-` id so the leaderboard can show them at zero.

use anyhow::Result;
use leaderboard_core::constants::NO_OFFICE_LABEL;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::pocketbase::UserRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub office_id: Option<String>,
    pub office_name: String,
    pub is_guest: bool,
}

impl Identity {
    pub fn from_user(user: &UserRecord) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            office_id: Some(user.office.clone()).filter(|id| !id.is_empty()),
            office_name: user.office_name().unwrap_or(NO_OFFICE_LABEL).to_string(),
            is_guest: false,
        }
    }

    /// Guest identity keyed by the sign-in time in unix milliseconds
    pub fn guest(nickname: &str, unix_millis: i64) -> Self {
        Self {
            user_id: format!("{}{}", constants::GUEST_ID_PREFIX, unix_millis),
            name: nickname.to_string(),
            office_id: None,
            office_name: NO_OFFICE_LABEL.to_string(),
            is_guest: true,
        }
    }
}

/// How a sign-in attempt ended
#[derive(Debug)]
pub enum LoginOutcome {
    Found(Identity),
    /// No manager matched; signed in as guest
    NotFound(Identity),
    /// The lookup itself failed; signed in as guest
    LookupFailed(Identity, anyhow::Error),
}

impl LoginOutcome {
    pub fn identity(&self) -> &Identity {
        match self {
            LoginOutcome::Found(identity)
            | LoginOutcome::NotFound(identity)
            | LoginOutcome::LookupFailed(identity, _) => identity,
        }
    }
}

/// Turn a nickname lookup result into an identity. Never refuses entry.
pub fn resolve_login(lookup: Result<Option<UserRecord>>, nickname: &str, unix_millis: i64) -> LoginOutcome {
    match lookup {
        Ok(Some(user)) => LoginOutcome::Found(Identity::from_user(&user)),
        Ok(None) => LoginOutcome::NotFound(Identity::guest(nickname, unix_millis)),
        Err(e) => LoginOutcome::LookupFailed(Identity::guest(nickname, unix_millis), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pocketbase::{OfficeRecord, UserExpand};

    fn user(office: Option<&str>) -> UserRecord {
        UserRecord {
            id: "u1".to_string(),
            name: "Aziz".to_string(),
            office: office.map(|_| "off1".to_string()).unwrap_or_default(),
            expand: office.map(|name| UserExpand {
                office: Some(OfficeRecord {
                    name: name.to_string(),
                }),
            }),
        }
    }

    #[test]
    fn test_found_user_binds_identity() {
        let outcome = resolve_login(Ok(Some(user(Some("Bishkek")))), "aziz", 1);
        let LoginOutcome::Found(identity) = outcome else {
            panic!("expected Found");
        };
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.name, "Aziz");
        assert_eq!(identity.office_id.as_deref(), Some("off1"));
        assert_eq!(identity.office_name, "Bishkek");
        assert!(!identity.is_guest);
    }

    #[test]
    fn test_found_user_without_office() {
        let identity = Identity::from_user(&user(None));
        assert_eq!(identity.office_id, None);
        assert_eq!(identity.office_name, "No office");
    }

    #[test]
    fn test_unknown_nickname_becomes_guest() {
        let outcome = resolve_login(Ok(None), "newbie", 1_741_000_000_000);
        assert!(matches!(outcome, LoginOutcome::NotFound(_)));
        let identity = outcome.identity();
        assert_eq!(identity.user_id, "temp-1741000000000");
        assert_eq!(identity.name, "newbie");
        assert_eq!(identity.office_name, "No office");
        assert!(identity.is_guest);
    }

    #[test]
    fn test_failed_lookup_still_lets_guest_in() {
        let outcome = resolve_login(Err(anyhow::anyhow!("connection refused")), "newbie", 5);
        assert!(matches!(outcome, LoginOutcome::LookupFailed(_, _)));
        assert_eq!(outcome.identity().user_id, "temp-5");
    }
}
