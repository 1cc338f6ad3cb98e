use sqlx::PgPool;

use crate::models::Product;

pub async fn create(
    pool: &PgPool,
    name: &str,
    description: &str,
    price_cents: i64,
    stock: i32,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (name, description, price_cents, stock)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(name)
    .bind(description)
    .bind(price_cents)
    .bind(stock)
    .fetch_one(pool)
    .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_names(pool: &PgPool, names: &[String]) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE name = ANY($1) ORDER BY name")
        .bind(names)
        .fetch_all(pool)
        .await
}

pub async fn update_price(
    pool: &PgPool,
    name: &str,
    price_cents: i64,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET price_cents = $2 WHERE name = $1 RETURNING *",
    )
    .bind(name)
    .bind(price_cents)
    .fetch_optional(pool)
    .await
}

pub async fn delete_by_name(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE name = $1")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
