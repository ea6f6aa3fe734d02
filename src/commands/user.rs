//! User administration and password change.

use serde::Serialize;

use super::{Confirm, Context, Message, Output, to_json_string};
use crate::Result;
use crate::models::{Role, User, UserId};
use crate::views::detail::ConfirmPrompt;
use crate::views::users::{self, ActivityFilter, NewUserForm, UserDirectory};

fn user_line(user: &User) -> String {
    format!(
        "[{}] {} <{}> {}{}",
        user.id,
        user.full_name(),
        user.email,
        user.role,
        if user.active { "" } else { " (inactive)" }
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub shown: usize,
    pub total: usize,
}

impl Output for UserList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.users.is_empty() {
            return "No users found.".to_string();
        }
        let mut lines: Vec<String> = self.users.iter().map(user_line).collect();
        lines.push(format!("Registered users ({} of {})", self.shown, self.total));
        lines.join("\n")
    }
}

pub fn user_list(
    ctx: &Context,
    name: Option<String>,
    activity: ActivityFilter,
) -> Result<UserList> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let mut directory = UserDirectory::load(&client, &session)?;
    directory.name_filter = name.unwrap_or_default();
    directory.activity = activity;
    let users: Vec<User> = directory.visible().into_iter().cloned().collect();
    Ok(UserList {
        shown: users.len(),
        total: directory.users().len(),
        users,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResult {
    pub user: User,
}

impl Output for UserResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        user_line(&self.user)
    }
}

pub fn user_create(ctx: &Context, form: &NewUserForm) -> Result<UserResult> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let user = users::create_user(&client, &session, form)?;
    Ok(UserResult { user })
}

pub fn user_role(ctx: &Context, id: UserId, role: Role) -> Result<UserResult> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let mut directory = UserDirectory::load(&client, &session)?;
    let user = directory.change_role(&client, &session, id, role)?;
    Ok(UserResult { user })
}

/// Activate or deactivate an account after confirmation.
pub fn user_set_active(
    ctx: &Context,
    id: UserId,
    active: bool,
    confirm: Confirm<'_>,
) -> Result<Option<UserResult>> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    let mut directory = UserDirectory::load(&client, &session)?;
    let target = directory.activation_target(&session, id)?;
    let verb = if active { "Activate" } else { "Deactivate" };
    let prompt = ConfirmPrompt {
        title: format!("{} user", verb),
        message: format!("{} {} <{}>?", verb, target.full_name(), target.email),
    };
    if !confirm(&prompt) {
        return Ok(None);
    }
    let user = directory.set_active(&client, &session, id, active)?;
    Ok(Some(UserResult { user }))
}

pub fn user_passwd(ctx: &Context, password: &str, confirmation: &str) -> Result<Message> {
    let session = ctx.session()?;
    let client = ctx.client()?;
    users::change_password(&client, &session, password, confirmation).map(Message::new)
}
