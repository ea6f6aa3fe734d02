//! User administration, profile and password recovery.

use tracing::info;

use crate::api::{AuthApi, UserApi};
use crate::models::email::{generate_email, is_valid_email};
use crate::models::{NewUser, Role, User, UserId};
use crate::session::{Capability, Session};
use crate::{Error, Result};

pub const MIN_PASSWORD_CHARS: usize = 6;

fn check_password(password: &str, confirmation: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(Error::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    if password != confirmation {
        return Err(Error::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}

/// The create-user form. The email address is derived from the name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUserForm {
    pub name: String,
    pub surname: String,
    pub password: String,
    pub confirmation: String,
    pub role: Role,
}

impl NewUserForm {
    /// Preview of the address the account will get.
    pub fn generated_email(&self) -> Option<String> {
        generate_email(&self.name, &self.surname)
    }

    pub fn validate(&self) -> Result<NewUser> {
        if self.name.trim().is_empty() || self.surname.trim().is_empty() {
            return Err(Error::Validation(
                "Name and surname are required".to_string(),
            ));
        }
        let email = self.generated_email().ok_or_else(|| {
            Error::Validation("Name and surname must contain letters or digits".to_string())
        })?;
        check_password(&self.password, &self.confirmation)?;
        Ok(NewUser {
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            email,
            password: self.password.clone(),
            role: self.role,
        })
    }
}

pub fn create_user(api: &dyn UserApi, session: &Session, form: &NewUserForm) -> Result<User> {
    session.require(Capability::CreateUser)?;
    let payload = form.validate()?;
    let user = api.create_user(session, &payload)?;
    info!(user_id = user.id, email = %user.email, "user created");
    Ok(user)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivityFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl ActivityFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(ActivityFilter::All),
            "active" => Some(ActivityFilter::Active),
            "inactive" => Some(ActivityFilter::Inactive),
            _ => None,
        }
    }

    fn matches(&self, user: &User) -> bool {
        match self {
            ActivityFilter::All => true,
            ActivityFilter::Active => user.active,
            ActivityFilter::Inactive => !user.active,
        }
    }
}

/// Registered users with the directory filters applied locally.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
    pub name_filter: String,
    pub activity: ActivityFilter,
}

impl UserDirectory {
    pub fn load(api: &dyn UserApi, session: &Session) -> Result<Self> {
        session.require(Capability::ManageUsers)?;
        Ok(Self {
            users: api.list_users(session)?,
            ..Default::default()
        })
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn visible(&self) -> Vec<&User> {
        let needle = self.name_filter.trim().to_lowercase();
        self.users
            .iter()
            .filter(|u| needle.is_empty() || u.full_name().to_lowercase().contains(&needle))
            .filter(|u| self.activity.matches(u))
            .collect()
    }

    pub fn get(&self, id: UserId) -> Result<&User> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::NotFound(format!("User {} not found", id)))
    }

    /// Change the role of `id`. Own account, administrators and
    /// deactivated accounts are refused.
    pub fn change_role(
        &mut self,
        api: &dyn UserApi,
        session: &Session,
        id: UserId,
        role: Role,
    ) -> Result<User> {
        session.require(Capability::ManageUsers)?;
        let me = session.require_user()?.id;
        let target = self.get(id)?;
        if target.id == me {
            return Err(Error::Validation("You cannot change your own role".to_string()));
        }
        if target.is_admin() {
            return Err(Error::Validation(
                "The role of an administrator cannot be changed".to_string(),
            ));
        }
        if !target.active {
            return Err(Error::Validation(
                "Activate the account before changing its role".to_string(),
            ));
        }
        let updated = api.change_role(session, id, role)?;
        info!(user_id = id, role = %updated.role, "role changed");
        self.replace(updated.clone());
        Ok(updated)
    }

    /// The account whose status may be toggled. One's own account is refused.
    pub fn activation_target(&self, session: &Session, id: UserId) -> Result<&User> {
        session.require(Capability::ManageUsers)?;
        let me = session.require_user()?.id;
        let target = self.get(id)?;
        if target.id == me {
            return Err(Error::Validation(
                "You cannot change the status of your own account".to_string(),
            ));
        }
        Ok(target)
    }

    /// Activate or deactivate `id`.
    pub fn set_active(
        &mut self,
        api: &dyn UserApi,
        session: &Session,
        id: UserId,
        active: bool,
    ) -> Result<User> {
        self.activation_target(session, id)?;
        let updated = api.set_active(session, id, active)?;
        info!(user_id = id, active, "account status changed");
        self.replace(updated.clone());
        Ok(updated)
    }

    fn replace(&mut self, user: User) {
        if let Some(slot) = self.users.iter_mut().find(|u| u.id == user.id) {
            *slot = user;
        }
    }
}

/// Change the logged-in user's password after checking the confirmation.
pub fn change_password(
    api: &dyn AuthApi,
    session: &Session,
    password: &str,
    confirmation: &str,
) -> Result<String> {
    session.require_user()?;
    check_password(password, confirmation)?;
    let message = api.change_password(session, password)?;
    info!("password changed");
    Ok(message)
}

/// Ask the server to send recovery instructions to `email`.
pub fn recover_password(api: &dyn AuthApi, email: &str) -> Result<String> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(Error::Validation("Enter a valid email address".to_string()));
    }
    api.recover_password(email)
}
