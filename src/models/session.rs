use serde::Serialize;

use super::user::User;

/// Authentication state of the running client.
///
/// `Authenticated` may carry no user: a freshly issued token is trusted even
/// when its payload cannot be read.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "status", content = "user")]
pub enum Session {
    #[default]
    LoggedOut,
    Authenticated(Option<User>),
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Authenticated(user) => user.as_ref(),
            Session::LoggedOut => None,
        }
    }
}
