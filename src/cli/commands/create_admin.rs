use anyhow::{Result, anyhow};
use model::entities::{prelude::User, user, user::UserRole};
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, EntityTrait, QueryFilter, Set};
use tracing::{debug, error, info, trace};

use crate::auth::hash_password;

pub async fn create_admin(
    database_url: &str,
    username: &str,
    password: &str,
    superadmin: bool,
) -> Result<()> {
    trace!("Entering create_admin function");
    let role = if superadmin {
        UserRole::SuperAdmin
    } else {
        UserRole::Admin
    };
    info!("Creating {} account '{}'", role, username);

    if password.len() < 8 {
        return Err(anyhow!("Password must be at least 8 characters"));
    }

    let db = Database::connect(database_url).await?;
    debug!("Database connection established");

    let existing = User::find()
        .filter(user::Column::Username.eq(username))
        .one(&db)
        .await?;
    if existing.is_some() {
        error!("Username '{}' is already taken", username);
        return Err(anyhow!("Username '{}' is already taken", username));
    }

    let password_hash = hash_password(password)?;
    let account = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        role: Set(role),
        is_profile_complete: Set(true),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    info!("Created {} '{}' with id {}", role, account.username, account.id);
    Ok(())
}
