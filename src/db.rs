use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::{
    auth::password,
    config::{AdminSeed, AppConfig},
    users::{NewUser, Role, StoreError, User, UserStore},
};

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    Ok(db)
}

/// Creates `users` and `activity_logs` if missing. Safe to run on every start.
pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Seeds one admin account when no users exist yet. Returns the new admin, if any.
pub async fn seed_admin(users: &dyn UserStore, seed: &AdminSeed) -> anyhow::Result<Option<User>> {
    if users.count().await? > 0 {
        info!("users table already populated; skipping admin seed");
        return Ok(None);
    }

    let password_hash = password::hash_password_blocking(seed.password.clone()).await?;
    let new_admin = NewUser {
        name: "Admin User".into(),
        email: seed.email.trim().to_lowercase(),
        password_hash,
        role: Role::Admin,
    };

    match users.insert(new_admin).await {
        Ok(admin) => {
            info!(user_id = admin.id, email = %admin.email, "admin user created");
            Ok(Some(admin))
        }
        // Another instance seeded it first.
        Err(StoreError::DuplicateEmail) => Ok(None),
        Err(StoreError::Other(e)) => Err(e.context("seed admin user")),
    }
}
