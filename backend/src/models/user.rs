//! Models for guild members, their roles, and physical credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a guild member account.
pub struct User {
    /// Unique identifier for the user.
    pub id: String,
    /// Immutable handle chosen at registration.
    pub username: String,
    /// Contact email address.
    pub email: String,
    /// Whether the email address has been verified. Unverified members
    /// cannot open facility sessions.
    pub email_verified: bool,
    /// Physical credential (RFID tag id) attached post-registration, if any.
    pub rfid_card_id: Option<String>,
    /// Role describing the user's privileges.
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Supported user roles stored in the database.
pub enum UserRole {
    /// Regular guild member.
    #[default]
    Member,
    /// Staff member who can administer facilities and sessions.
    Staff,
    /// Administrator with full privileges.
    Admin,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Staff => "staff",
            UserRole::Admin => "admin",
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "member" => Ok(UserRole::Member),
            "staff" => Ok(UserRole::Staff),
            "admin" => Ok(UserRole::Admin),
            // tolerate legacy uppercase role tags from the old platform
            "MEMBER" => Ok(UserRole::Member),
            "STAFF" => Ok(UserRole::Staff),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["member", "staff", "admin"],
            )),
        }
    }
}

impl User {
    /// Constructs a new member with a freshly generated identifier.
    pub fn new(username: String, email: String, role: UserRole, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            email_verified: false,
            rfid_card_id: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` when the user holds an elevated role.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, UserRole::Staff | UserRole::Admin)
    }

    /// Returns `true` when the user holds the `Admin` role.
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Compact user representation embedded in session and access responses.
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
/// Payload for attaching or replacing a member's RFID credential.
pub struct AttachCredentialRequest {
    #[validate(custom(function = "crate::validation::rules::validate_credential"))]
    pub rfid_card_id: String,
}
