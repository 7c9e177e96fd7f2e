use anyhow::Context;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use super::dto::{
    DeleteOutcome, LoginOutcome, NewAccount, PasswordReset, RegisterOutcome, RoleChange,
};
use super::password::{generate_password, hash_password, verify_password};
use super::repo_types::{Role, User, UserFilter};
use crate::error::StoreError;
use crate::state::AppState;

fn build_user(state: &AppState, account: &NewAccount) -> anyhow::Result<User> {
    let password_hash = hash_password(&account.password, &state.config.passwords)?;
    Ok(User {
        id: account.id.clone(),
        role: account.role,
        password_hash,
        product_count: 0,
        created_at: OffsetDateTime::now_utc(),
    })
}

/// Creates the account unless the id is taken.
#[instrument(skip(state, account), fields(user_id = %account.id))]
pub async fn register(state: &AppState, account: &NewAccount) -> anyhow::Result<RegisterOutcome> {
    if state.stores.users.find(&account.id).await?.is_some() {
        warn!("user already registered");
        return Ok(RegisterOutcome::AlreadyExists);
    }

    let user = build_user(state, account)?;
    match state.stores.users.insert(&user).await {
        Ok(()) => {
            info!(role = ?user.role, "user registered");
            Ok(RegisterOutcome::Created)
        }
        // lost a race with a concurrent registration
        Err(StoreError::Duplicate { .. }) => {
            warn!("user already registered");
            Ok(RegisterOutcome::AlreadyExists)
        }
        Err(e) => Err(e).context("insert user"),
    }
}

/// Writes the account, overwriting any record with the same id.
#[instrument(skip(state, account), fields(user_id = %account.id))]
pub async fn insert(state: &AppState, account: &NewAccount) -> anyhow::Result<()> {
    let user = build_user(state, account)?;
    state
        .stores
        .users
        .upsert(&user)
        .await
        .context("upsert user")?;
    debug!("user written");
    Ok(())
}

#[instrument(skip(state, password))]
pub async fn verify_login(
    state: &AppState,
    user_id: &str,
    password: &str,
) -> anyhow::Result<LoginOutcome> {
    let Some(user) = state.stores.users.find(user_id).await? else {
        warn!("login unknown user");
        return Ok(LoginOutcome::NoSuchUser);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!("login invalid password");
        return Ok(LoginOutcome::WrongPassword);
    }

    info!("user logged in");
    Ok(LoginOutcome::Success)
}

pub async fn login(state: &AppState, user_id: &str, password: &str) -> anyhow::Result<bool> {
    Ok(verify_login(state, user_id, password).await? == LoginOutcome::Success)
}

async fn step_role(
    state: &AppState,
    user_id: &str,
    step: fn(Role) -> Option<Role>,
) -> anyhow::Result<RoleChange> {
    let Some(user) = state.stores.users.find(user_id).await? else {
        warn!(user_id, "role change for unknown user");
        return Ok(RoleChange::NoOp);
    };
    let Some(next) = step(user.role) else {
        debug!(user_id, role = ?user.role, "role already at boundary");
        return Ok(RoleChange::NoOp);
    };

    let updated = state
        .stores
        .users
        .update_role(user_id, user.role, next)
        .await
        .context("update role")?;
    if updated == 0 {
        // role changed between read and write
        warn!(user_id, "role changed concurrently");
        return Ok(RoleChange::NoOp);
    }

    info!(user_id, from = ?user.role, to = ?next, "role changed");
    Ok(RoleChange::Updated(next))
}

#[instrument(skip(state))]
pub async fn promote_role(state: &AppState, user_id: &str) -> anyhow::Result<RoleChange> {
    step_role(state, user_id, Role::promoted).await
}

#[instrument(skip(state))]
pub async fn demote_role(state: &AppState, user_id: &str) -> anyhow::Result<RoleChange> {
    step_role(state, user_id, Role::demoted).await
}

/// Replaces the password with a random one and hands back the plaintext.
#[instrument(skip(state))]
pub async fn reset_password(state: &AppState, user_id: &str) -> anyhow::Result<PasswordReset> {
    let password = generate_password(state.config.passwords.reset_length);
    let updated = change_password(state, user_id, &password).await?;
    Ok(PasswordReset { updated, password })
}

#[instrument(skip(state, password))]
pub async fn change_password(
    state: &AppState,
    user_id: &str,
    password: &str,
) -> anyhow::Result<u64> {
    let hash = hash_password(password, &state.config.passwords)?;
    let updated = state
        .stores
        .users
        .update_password_hash(user_id, &hash)
        .await
        .context("update password hash")?;
    if updated == 0 {
        warn!("password change for unknown user");
    } else {
        info!("password changed");
    }
    Ok(updated)
}

#[instrument(skip(state))]
pub async fn delete(state: &AppState, user_id: &str) -> anyhow::Result<DeleteOutcome> {
    let removed = state
        .stores
        .users
        .delete(user_id)
        .await
        .context("delete user")?;
    if removed == 0 {
        return Ok(DeleteOutcome::NotFound);
    }
    info!("user deleted");
    Ok(DeleteOutcome::Deleted)
}

pub async fn find_by_id(state: &AppState, user_id: &str) -> anyhow::Result<Option<User>> {
    state
        .stores
        .users
        .find(user_id)
        .await
        .with_context(|| format!("find user {user_id}"))
}

pub async fn list_all(state: &AppState) -> anyhow::Result<Vec<User>> {
    state
        .stores
        .users
        .list(&UserFilter::default())
        .await
        .context("list users")
}

/// Users whose id contains `id_filter`; `Role::Undefined` matches any role.
pub async fn query(state: &AppState, id_filter: &str, role: Role) -> anyhow::Result<Vec<User>> {
    let filter = UserFilter {
        id_contains: (!id_filter.is_empty()).then(|| id_filter.to_string()),
        role: role.as_filter(),
    };
    state.stores.users.list(&filter).await.context("query users")
}

#[instrument(skip(state))]
pub async fn increment_product_count(
    state: &AppState,
    user_id: &str,
) -> anyhow::Result<Option<i64>> {
    let count = state
        .stores
        .users
        .increment_product_count(user_id)
        .await
        .context("increment product count")?;
    match count {
        Some(n) => debug!(count = n, "product count incremented"),
        None => warn!("product count increment for unknown user"),
    }
    Ok(count)
}
