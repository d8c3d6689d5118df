//! User repository for database operations

use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, User};

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        login: row.get("login"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        surname: row.get("surname"),
        patronymic: row.get("patronymic"),
        activated: row.get("activated"),
        admin: row.get("admin"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const USER_COLUMNS: &str = "id, login, email, password_hash, name, surname, patronymic, \
                            activated, admin, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check whether a user with the same login or email already exists,
    /// matching case-insensitively on both fields.
    pub async fn exists_with_login_or_email(&self, login: &str, email: &str) -> sqlx::Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 AS present
            FROM users
            WHERE LOWER(login) = LOWER($1) OR LOWER(email) = LOWER($2)
            "#,
        )
        .bind(login)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Persist a new user together with their activation link.
    ///
    /// Both rows are written in one transaction so a failed link insert
    /// cannot leave a user without any activation link.
    pub async fn create(
        &self,
        new_user: &NewUser,
        password_hash: &str,
        activation_link: &str,
    ) -> sqlx::Result<User> {
        info!("Creating new user: {}", new_user.login);

        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, login, email, password_hash, name, surname, patronymic)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&new_user.login)
        .bind(&new_user.email)
        .bind(password_hash)
        .bind(&new_user.name)
        .bind(&new_user.surname)
        .bind(&new_user.patronymic)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO activation_links (user_id, link)
            VALUES ($1, $2)
            "#,
        )
        .bind(id)
        .bind(activation_link)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user_from_row(&row))
    }

    /// Find a user by login
    pub async fn find_by_login(&self, login: &str) -> sqlx::Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE login = $1
            "#
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> sqlx::Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            "#
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> sqlx::Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Resolve an activation link to its owning user
    pub async fn find_by_activation_link(&self, link: &str) -> sqlx::Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT users.id, users.login, users.email, users.password_hash, users.name,
                   users.surname, users.patronymic, users.activated, users.admin,
                   users.created_at, users.updated_at
            FROM users
            JOIN activation_links ON activation_links.user_id = users.id
            WHERE activation_links.link = $1
            "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Latest activation link issued for a user. Historical rows are kept,
    /// so password-reset mail always carries the most recent one.
    pub async fn latest_activation_link(&self, user_id: Uuid) -> sqlx::Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT link
            FROM activation_links
            WHERE user_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("link")))
    }

    /// Mark a user's account as activated
    pub async fn set_activated(&self, user_id: Uuid) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET activated = TRUE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace a user's password hash
    pub async fn update_password(&self, user_id: Uuid, password_hash: &str) -> sqlx::Result<()> {
        info!("Updating password for user {}", user_id);

        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
