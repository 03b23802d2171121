use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Session {
    pub exp: DateTime<Utc>,
    pub account_id: AccountId,
    pub nbf: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub slug: String,
    pub is_superuser: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(pub i32);

#[derive(Deserialize, Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewAccount {
    pub fn cleaned(self) -> Result<NewAccount, &'static str> {
        let username = self.username.trim().to_string();
        if username.is_empty() {
            return Err("You must enter login.");
        }
        let email = self.email.trim().to_string();
        if !email.contains('@') {
            return Err("You must enter email.");
        }
        if self.password.is_empty() {
            return Err("You must enter password.");
        }

        Ok(NewAccount {
            username,
            email,
            password: self.password,
        })
    }
}

/// New login and email for an existing account.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AccountSettings {
    pub username: String,
    pub email: String,
}

impl AccountSettings {
    pub fn cleaned(self) -> Result<AccountSettings, &'static str> {
        let username = self.username.trim().to_string();
        if username.is_empty() {
            return Err("You must enter login.");
        }
        let email = self.email.trim().to_string();
        if !email.contains('@') {
            return Err("You must enter email.");
        }

        Ok(AccountSettings { username, email })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Public view of an account.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Member {
    pub id: AccountId,
    pub username: String,
    pub slug: String,
}
