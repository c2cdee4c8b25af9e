//! Postgres-backed catalog repository.
//!
//! ## Tables
//!
//! - `mice`: one row per record, `BIGSERIAL` ids
//! - `categories`: unique on `lower(name)`
//! - `mouse_categories`: join table, cascades from both sides
//!
//! ## Error Mapping
//!
//! | SQLx error | Code | Maps to |
//! |---|---|---|
//! | unique violation | `23505` | `DomainError::Conflict` |
//! | foreign key violation | `23503` | `DomainError::Validation` |
//! | anything else | | `RepositoryError::Storage` |

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::instrument;

use mousedeck_core::{
    Category, CategoryId, CategoryPatch, DomainError, Mouse, MouseFilter, MouseId, MousePatch,
    NewCategory, NewMouse,
};

use super::{
    duplicate_category, unknown_categories, CatalogRepository, RepositoryError, RepositoryResult,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS mice (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        price DOUBLE PRECISION NOT NULL CHECK (price > 0),
        details TEXT,
        image TEXT,
        is_generated BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS mice_price_idx ON mice (price)",
    "CREATE INDEX IF NOT EXISTS mice_is_generated_idx ON mice (is_generated)",
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS categories_name_key ON categories (lower(name))",
    r#"
    CREATE TABLE IF NOT EXISTS mouse_categories (
        mouse_id BIGINT NOT NULL REFERENCES mice (id) ON DELETE CASCADE,
        category_id BIGINT NOT NULL REFERENCES categories (id) ON DELETE CASCADE,
        PRIMARY KEY (mouse_id, category_id)
    )
    "#,
];

const SELECT_MICE: &str = r#"
    SELECT
        m.id,
        m.name,
        m.price,
        m.details,
        m.image,
        m.is_generated,
        COALESCE(
            ARRAY_AGG(mc.category_id ORDER BY mc.category_id)
                FILTER (WHERE mc.category_id IS NOT NULL),
            '{}'
        ) AS category_ids
    FROM mice m
    LEFT JOIN mouse_categories mc ON mc.mouse_id = m.id
"#;

#[derive(Debug)]
struct MouseRow {
    id: i64,
    name: String,
    price: f64,
    details: Option<String>,
    image: Option<String>,
    is_generated: bool,
    category_ids: Vec<i64>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for MouseRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MouseRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price: row.try_get("price")?,
            details: row.try_get("details")?,
            image: row.try_get("image")?,
            is_generated: row.try_get("is_generated")?,
            category_ids: row.try_get("category_ids")?,
        })
    }
}

impl From<MouseRow> for Mouse {
    fn from(row: MouseRow) -> Self {
        Mouse {
            id: MouseId::new(row.id),
            name: row.name,
            price: row.price,
            details: row.details,
            image: row.image,
            is_generated: row.is_generated,
            category_ids: row.category_ids.into_iter().map(CategoryId::new).collect(),
        }
    }
}

#[derive(Debug)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::new(row.id),
            name: row.name,
            description: row.description,
        }
    }
}

/// Postgres-backed catalog repository.
///
/// Uses the SQLx connection pool (thread-safe). Writes touching both `mice`
/// and `mouse_categories` run in a single transaction.
#[derive(Debug, Clone)]
pub struct PostgresCatalogRepository {
    pool: Arc<PgPool>,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the catalog tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn fetch_mouse(&self, id: MouseId) -> RepositoryResult<Mouse> {
        let sql = format!("{SELECT_MICE} WHERE m.id = $1 GROUP BY m.id");
        let row = sqlx::query_as::<_, MouseRow>(&sql)
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_mouse", e))?;
        row.map(Mouse::from)
            .ok_or_else(|| DomainError::mouse_not_found().into())
    }

    async fn check_categories(
        tx: &mut Transaction<'_, Postgres>,
        ids: &[CategoryId],
    ) -> RepositoryResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let raw: Vec<i64> = ids.iter().map(CategoryId::get).collect();
        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ANY($1)")
            .bind(&raw)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("check_categories", e))?;
        let found: HashSet<i64> = found.into_iter().collect();
        let missing: Vec<CategoryId> = ids
            .iter()
            .copied()
            .filter(|id| !found.contains(&id.get()))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(unknown_categories(&missing))
        }
    }

    async fn replace_links(
        tx: &mut Transaction<'_, Postgres>,
        mouse_id: MouseId,
        ids: &[CategoryId],
    ) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM mouse_categories WHERE mouse_id = $1")
            .bind(mouse_id.get())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("replace_links", e))?;
        for category_id in ids {
            sqlx::query(
                "INSERT INTO mouse_categories (mouse_id, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(mouse_id.get())
            .bind(category_id.get())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("replace_links", e))?;
        }
        Ok(())
    }

    async fn begin(&self, operation: &str) -> RepositoryResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    #[instrument(skip(self), err)]
    async fn list_mice(&self, filter: &MouseFilter) -> RepositoryResult<Vec<Mouse>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_MICE);
        qb.push(" WHERE TRUE");
        if let Some(min) = filter.min_price {
            qb.push(" AND m.price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND m.price <= ").push_bind(max);
        }
        if let Some(flag) = filter.is_generated {
            qb.push(" AND m.is_generated = ").push_bind(flag);
        }
        if let Some(search) = &filter.search {
            qb.push(" AND m.name ILIKE ")
                .push_bind(format!("%{}%", escape_like(search)));
        }
        qb.push(" GROUP BY m.id ORDER BY m.id");

        let rows = qb
            .build_query_as::<MouseRow>()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_mice", e))?;
        Ok(rows.into_iter().map(Mouse::from).collect())
    }

    async fn get_mouse(&self, id: MouseId) -> RepositoryResult<Mouse> {
        self.fetch_mouse(id).await
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    async fn create_mouse(&self, new: NewMouse) -> RepositoryResult<Mouse> {
        let mut tx = self.begin("create_mouse").await?;
        Self::check_categories(&mut tx, &new.category_ids).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO mice (name, price, details, image, is_generated)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(new.name.trim())
        .bind(new.price)
        .bind(&new.details)
        .bind(&new.image)
        .bind(new.is_generated)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_mouse", e))?;

        let id = MouseId::new(id);
        Self::replace_links(&mut tx, id, &new.category_ids).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_mouse", e))?;

        self.fetch_mouse(id).await
    }

    #[instrument(skip(self, patch), err)]
    async fn update_mouse(&self, id: MouseId, patch: MousePatch) -> RepositoryResult<Mouse> {
        let mut tx = self.begin("update_mouse").await?;

        let updated = sqlx::query(
            r#"
            UPDATE mice SET
                name = COALESCE($2, name),
                price = COALESCE($3, price),
                details = COALESCE($4, details),
                image = COALESCE($5, image),
                is_generated = COALESCE($6, is_generated),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.price)
        .bind(&patch.details)
        .bind(&patch.image)
        .bind(patch.is_generated)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_mouse", e))?;

        if updated.rows_affected() == 0 {
            return Err(DomainError::mouse_not_found().into());
        }

        if let Some(ids) = &patch.category_ids {
            Self::check_categories(&mut tx, ids).await?;
            Self::replace_links(&mut tx, id, ids).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_mouse", e))?;
        self.fetch_mouse(id).await
    }

    #[instrument(skip(self), err)]
    async fn delete_mouse(&self, id: MouseId) -> RepositoryResult<()> {
        let deleted = sqlx::query("DELETE FROM mice WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_mouse", e))?;
        if deleted.rows_affected() == 0 {
            return Err(DomainError::mouse_not_found().into());
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_generated(&self) -> RepositoryResult<Vec<MouseId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("DELETE FROM mice WHERE is_generated RETURNING id")
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("delete_generated", e))?;
        let mut ids: Vec<MouseId> = ids.into_iter().map(MouseId::new).collect();
        ids.sort();
        Ok(ids)
    }

    async fn count_mice(&self) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mice")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_mice", e))?;
        Ok(count.max(0) as u64)
    }

    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description FROM categories ORDER BY id",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category(&self, id: CategoryId) -> RepositoryResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description FROM categories WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_category", e))?;
        row.map(Category::from)
            .ok_or_else(|| DomainError::category_not_found().into())
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    async fn create_category(&self, new: NewCategory) -> RepositoryResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            "#,
        )
        .bind(new.name.trim())
        .bind(&new.description)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| match map_sqlx_error("create_category", e) {
            RepositoryError::Domain(DomainError::Conflict(_)) => duplicate_category(&new.name),
            other => other,
        })?;
        Ok(row.into())
    }

    #[instrument(skip(self, patch), err)]
    async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> RepositoryResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING id, name, description
            "#,
        )
        .bind(id.get())
        .bind(patch.name.as_deref().map(str::trim))
        .bind(&patch.description)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| match map_sqlx_error("update_category", e) {
            RepositoryError::Domain(DomainError::Conflict(_)) => {
                duplicate_category(patch.name.as_deref().unwrap_or_default())
            }
            other => other,
        })?;
        row.map(Category::from)
            .ok_or_else(|| DomainError::category_not_found().into())
    }

    #[instrument(skip(self), err)]
    async fn delete_category(&self, id: CategoryId) -> RepositoryResult<()> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        if deleted.rows_affected() == 0 {
            return Err(DomainError::category_not_found().into());
        }
        Ok(())
    }

    async fn mice_in_category(&self, id: CategoryId) -> RepositoryResult<Vec<Mouse>> {
        // 404 for an unknown category rather than an empty list.
        self.get_category(id).await?;

        let sql = format!(
            "{SELECT_MICE} WHERE m.id IN (SELECT mouse_id FROM mouse_categories WHERE category_id = $1) GROUP BY m.id ORDER BY m.id"
        );
        let rows = sqlx::query_as::<_, MouseRow>(&sql)
            .bind(id.get())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("mice_in_category", e))?;
        Ok(rows.into_iter().map(Mouse::from).collect())
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Map SQLx errors to repository errors.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Domain(DomainError::conflict(msg)),
                Some("23503") => RepositoryError::Domain(DomainError::validation(msg)),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("viper"), "viper");
    }

    fn decodes_from_pg_rows<T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin>() {}

    #[test]
    fn row_types_decode_from_postgres_rows() {
        decodes_from_pg_rows::<MouseRow>();
        decodes_from_pg_rows::<CategoryRow>();
    }

    #[test]
    fn pool_closed_is_a_storage_error() {
        let err = map_sqlx_error("list_mice", sqlx::Error::PoolClosed);
        assert!(matches!(err, RepositoryError::Storage(_)));
    }
}
