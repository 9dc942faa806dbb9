use serde::{Deserialize, Serialize};

/// Opaque user identifier. Always derived from the email address, so the
/// same email reattaches to the same ledger partition on every login.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Email,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Email => "email",
            AuthProvider::Google => "google",
        }
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AuthProvider>,
}

impl User {
    /// A password-authenticated user. The display name is the email's local part.
    pub fn from_email(email: &str) -> Self {
        let name = email.split('@').next().unwrap_or(email).to_string();
        Self {
            id: user_id_for_email(email),
            email: email.to_string(),
            name,
            picture: None,
            provider: Some(AuthProvider::Email),
        }
    }

    /// A user established from an external identity assertion.
    pub fn from_google(profile: &GoogleProfile) -> Self {
        Self {
            id: user_id_for_email(&profile.email),
            email: profile.email.clone(),
            name: profile.name.clone(),
            picture: profile.picture.clone(),
            provider: Some(AuthProvider::Google),
        }
    }
}

/// Claims taken from a Google identity assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleProfile {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Derive the user id for an email address.
///
/// 32-bit rolling hash (`h * 31 + unit`, wrapping) over the UTF-16 code
/// units, rendered as `user_` followed by the base36 magnitude.
pub fn user_id_for_email(email: &str) -> UserId {
    let hash = email
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
    UserId(format!("user_{}", to_base36(u64::from(hash.unsigned_abs()))))
}

pub(crate) fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_is_deterministic() {
        let first = user_id_for_email("a@x.com");
        let second = user_id_for_email("a@x.com");
        assert_eq!(first, second);
        assert!(first.as_str().starts_with("user_"));
    }

    #[test]
    fn test_user_id_known_values() {
        // 'a' = 97 = 2*36 + 25
        assert_eq!(user_id_for_email("a").as_str(), "user_2p");
        // 97 * 31 + 98 = 3105 = 2*1296 + 14*36 + 9
        assert_eq!(user_id_for_email("ab").as_str(), "user_2e9");
        assert_eq!(user_id_for_email("").as_str(), "user_0");
    }

    #[test]
    fn test_user_id_differs_between_emails() {
        assert_ne!(user_id_for_email("a@x.com"), user_id_for_email("b@x.com"));
    }

    #[test]
    fn test_user_id_survives_overflow() {
        let long = "someone.with.a.very.long.address@example-domain.org";
        assert_eq!(user_id_for_email(long), user_id_for_email(long));
    }

    #[test]
    fn test_user_from_email_uses_local_part() {
        let user = User::from_email("jane.doe@example.com");
        assert_eq!(user.name, "jane.doe");
        assert_eq!(user.provider, Some(AuthProvider::Email));
        assert_eq!(user.id, user_id_for_email("jane.doe@example.com"));
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = User::from_google(&GoogleProfile {
            email: "g@x.com".into(),
            name: "Gee".into(),
            picture: Some("https://img/p.png".into()),
        });
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["provider"], "google");
        assert_eq!(json["picture"], "https://img/p.png");
        assert_eq!(json["id"], user.id.as_str());
    }
}
