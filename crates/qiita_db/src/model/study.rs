//! Study and user records.

use serde::Serialize;
use std::fmt::{Display, Formatter};

pub type StudyId = i64;

/// Visibility lifecycle of a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyStatus {
    /// Still being assembled; editable by its owner.
    Sandbox,
    AwaitingApproval,
    Private,
    Public,
}

impl StudyStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::AwaitingApproval => "awaiting_approval",
            Self::Private => "private",
            Self::Public => "public",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sandbox" => Some(Self::Sandbox),
            "awaiting_approval" => Some(Self::AwaitingApproval),
            "private" => Some(Self::Private),
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

impl Display for StudyStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Permission level of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserLevel {
    Admin,
    Dev,
    Superuser,
    User,
    Unverified,
    Guest,
}

impl UserLevel {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Dev => "dev",
            Self::Superuser => "superuser",
            Self::User => "user",
            Self::Unverified => "unverified",
            Self::Guest => "guest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "dev" => Some(Self::Dev),
            "superuser" => Some(Self::Superuser),
            "user" => Some(Self::User),
            "unverified" => Some(Self::Unverified),
            "guest" => Some(Self::Guest),
            _ => None,
        }
    }
}

impl Display for UserLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Study {
    pub id: StudyId,
    /// Email of the owning user.
    pub owner: String,
    pub title: String,
    pub status: StudyStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub email: String,
    pub name: Option<String>,
    pub level: UserLevel,
}

#[cfg(test)]
mod tests {
    use super::{StudyStatus, UserLevel};

    #[test]
    fn status_text_roundtrips() {
        for status in [
            StudyStatus::Sandbox,
            StudyStatus::AwaitingApproval,
            StudyStatus::Private,
            StudyStatus::Public,
        ] {
            assert_eq!(StudyStatus::parse(status.as_db_str()), Some(status));
        }
        assert_eq!(StudyStatus::parse("archived"), None);
    }

    #[test]
    fn user_level_rejects_unknown_text() {
        assert_eq!(UserLevel::parse("admin"), Some(UserLevel::Admin));
        assert_eq!(UserLevel::parse("root"), None);
    }
}
