use serde::{Deserialize, Serialize};

use super::token::Claims;

/// The identity shown for an authenticated session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        User {
            id: id.into(),
            username: username.into(),
        }
    }
}

impl From<&Claims> for User {
    fn from(claims: &Claims) -> Self {
        User {
            id: claims.subject_id.clone(),
            username: claims.username.clone(),
        }
    }
}
