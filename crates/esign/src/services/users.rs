//! User directory: account creation, lookup and keyword search

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::{contains_pattern, is_unique_violation, normalize_term, Page};
use crate::entity::{users, Users};
use crate::error::{Result, ServiceError};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone)]
pub struct NewUser {
    /// External identifier, generated when absent
    pub identifier: Option<String>,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
}

/// Public view of a user returned by search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    pub email: String,
}

impl From<users::Model> for UserSummary {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            identifier: user.identifier,
            name: user.user_name,
            email: user.email,
        }
    }
}

pub async fn create_user<C: ConnectionTrait>(db: &C, new_user: NewUser) -> Result<users::Model> {
    let user_name = new_user.user_name.trim();
    let email = new_user.email.trim();
    if user_name.is_empty() {
        return Err(ServiceError::validation("user name is required"));
    }
    if email.is_empty() {
        return Err(ServiceError::validation("email is required"));
    }

    let identifier = new_user
        .identifier
        .filter(|i| !i.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let user = users::ActiveModel {
        identifier: Set(identifier),
        user_name: Set(user_name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(new_user.password_hash),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let user = user.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            ServiceError::Conflict("email or identifier already registered".to_string())
        } else {
            e.into()
        }
    })?;

    info!("Created user {} ({})", user.id, user.identifier);
    Ok(user)
}

pub async fn find_by_identifier<C: ConnectionTrait>(
    db: &C,
    identifier: &str,
) -> Result<Option<users::Model>> {
    Ok(Users::find()
        .filter(users::Column::Identifier.eq(identifier))
        .one(db)
        .await?)
}

/// Search users whose name, email or identifier contains `keyword`.
/// A blank keyword yields an empty page. A page whose row offset does not
/// fit in an `i64` is rejected as a validation error.
pub async fn search_users<C: ConnectionTrait>(
    db: &C,
    keyword: Option<&str>,
    page: u64,
    size: Option<u64>,
) -> Result<Page<UserSummary>> {
    let size = size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    // The row offset is bound as a signed 64-bit value
    let in_range = page
        .checked_mul(size)
        .is_some_and(|offset| offset <= i64::MAX as u64);
    if !in_range {
        return Err(ServiceError::validation("page out of range"));
    }
    let Some(keyword) = normalize_term(keyword) else {
        return Ok(Page::empty(page, size));
    };

    let pattern = contains_pattern(keyword, db.get_database_backend());
    let matches = |column: users::Column| {
        Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern.clone()).escape('\\'))
    };

    let paginator = Users::find()
        .filter(
            Condition::any()
                .add(matches(users::Column::UserName))
                .add(matches(users::Column::Email))
                .add(matches(users::Column::Identifier)),
        )
        .order_by_asc(users::Column::Id)
        .paginate(db, size);

    let counts = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page).await?;
    debug!(
        "User search matched {} users, returning page {}",
        counts.number_of_items, page
    );

    Ok(Page {
        items: items.into_iter().map(UserSummary::from).collect(),
        page,
        size,
        total_items: counts.number_of_items,
        total_pages: counts.number_of_pages,
    })
}
