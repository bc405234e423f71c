use crate::database::DbPool;
use crate::models::block::Block;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_user_id;
use sqlx::Row;

/// Records a block from `blocker_id` against `blocked_id`. Repeating an
/// existing block is a no-op. There is deliberately no unblock operation.
pub async fn block_user(pool: &DbPool, blocker_id: &str, blocked_id: &str) -> AppResult<Block> {
    validate_user_id(blocked_id)?;

    if blocker_id == blocked_id {
        return Err(AppError::BadRequest("Cannot block yourself".to_string()));
    }

    let block = Block::new(blocker_id.to_string(), blocked_id.to_string());

    sqlx::query(
        "INSERT INTO blocks (blocker_id, blocked_id, created_at) VALUES (?, ?, ?)
         ON CONFLICT (blocker_id, blocked_id) DO NOTHING",
    )
    .bind(&block.blocker_id)
    .bind(&block.blocked_id)
    .bind(&block.created_at)
    .execute(pool.as_ref())
    .await?;

    Ok(block)
}

/// Symmetric check: a row in either direction suppresses messaging both
/// ways.
pub async fn is_blocked(pool: &DbPool, user_a: &str, user_b: &str) -> AppResult<bool> {
    let count = sqlx::query(
        "SELECT COUNT(*) as count FROM blocks
         WHERE (blocker_id = ? AND blocked_id = ?) OR (blocker_id = ? AND blocked_id = ?)",
    )
    .bind(user_a)
    .bind(user_b)
    .bind(user_b)
    .bind(user_a)
    .fetch_one(pool.as_ref())
    .await?
    .get::<i64, _>("count");

    Ok(count > 0)
}
