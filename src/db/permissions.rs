use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Permission;

pub async fn grant<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    permissions: &[Permission],
) -> Result<(), sqlx::Error> {
    let codenames: Vec<&str> = permissions.iter().map(|p| p.codename()).collect();
    sqlx::query(
        "INSERT INTO user_permissions (user_id, codename)
         SELECT $1, unnest($2::text[])
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(&codenames)
    .execute(executor)
    .await?;
    Ok(())
}

/// Unknown codenames in the table are skipped with a warning.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Permission>, sqlx::Error> {
    let codenames = sqlx::query_scalar::<_, String>(
        "SELECT codename FROM user_permissions WHERE user_id = $1 ORDER BY codename",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(codenames
        .into_iter()
        .filter_map(|c| match c.parse() {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!("Ignoring stored permission for user {user_id}: {e}");
                None
            }
        })
        .collect())
}
