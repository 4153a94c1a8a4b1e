use autoportal_core::{Error, Result};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::models::{CatalogItem, CreateCatalogItem, UpdateCatalogItem};

const CATALOG_COLUMNS: &str = r#"
    id, name, namespace, description, template_id, inventory_id, instance_group_id,
    form_schema, custom_body, tags, pinned, featured, runs, created_at, updated_at
"#;

/// List catalog items, optionally scoped to a namespace
pub async fn list_catalog_items(
    pool: &Pool<Sqlite>,
    namespace: Option<&str>,
) -> Result<Vec<CatalogItem>> {
    let query = format!(
        r#"
        SELECT {CATALOG_COLUMNS}
        FROM catalog_items
        {}
        ORDER BY pinned DESC, name
        "#,
        if namespace.is_some() {
            "WHERE namespace = ?"
        } else {
            ""
        }
    );

    let mut q = sqlx::query_as::<_, CatalogItem>(&query);
    if let Some(namespace) = namespace {
        q = q.bind(namespace);
    }

    q.fetch_all(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list catalog items: {}", e)))
}

/// Get catalog item by id
pub async fn get_catalog_item(pool: &Pool<Sqlite>, id: &str) -> Result<CatalogItem> {
    sqlx::query_as::<_, CatalogItem>(&format!(
        "SELECT {CATALOG_COLUMNS} FROM catalog_items WHERE id = ?"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to get catalog item: {}", e)))
}

/// Create a catalog item; the id is generated here
pub async fn create_catalog_item(
    pool: &Pool<Sqlite>,
    input: &CreateCatalogItem,
) -> Result<CatalogItem> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO catalog_items
            (id, name, namespace, description, template_id, inventory_id, instance_group_id,
             form_schema, custom_body, tags, pinned, featured)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&input.name)
    .bind(&input.namespace)
    .bind(&input.description)
    .bind(&input.template_id)
    .bind(&input.inventory_id)
    .bind(&input.instance_group_id)
    .bind(input.form_schema_string())
    .bind(&input.custom_body)
    .bind(input.tags_string())
    .bind(input.pinned)
    .bind(input.featured)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to create catalog item: {}", e)))?;

    get_catalog_item(pool, &id).await
}

/// Update a catalog item; `template_id` is never touched here
pub async fn update_catalog_item(
    pool: &Pool<Sqlite>,
    id: &str,
    update: &UpdateCatalogItem,
) -> Result<CatalogItem> {
    let existing = get_catalog_item(pool, id).await?;

    sqlx::query(
        r#"
        UPDATE catalog_items
        SET name = ?, namespace = ?, description = ?, inventory_id = ?, instance_group_id = ?,
            form_schema = ?, custom_body = ?, tags = ?, pinned = ?, featured = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(update.name.as_ref().unwrap_or(&existing.name))
    .bind(update.namespace.as_ref().unwrap_or(&existing.namespace))
    .bind(update.description.as_ref().or(existing.description.as_ref()))
    .bind(update.inventory_id.as_ref().or(existing.inventory_id.as_ref()))
    .bind(
        update
            .instance_group_id
            .as_ref()
            .or(existing.instance_group_id.as_ref()),
    )
    .bind(update.form_schema_string().or(existing.form_schema.clone()))
    .bind(update.custom_body.as_ref().or(existing.custom_body.as_ref()))
    .bind(update.tags_string().or(existing.tags.clone()))
    .bind(update.pinned.unwrap_or(existing.pinned))
    .bind(update.featured.unwrap_or(existing.featured))
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to update catalog item: {}", e)))?;

    get_catalog_item(pool, id).await
}

/// Delete a catalog item
pub async fn delete_catalog_item(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM catalog_items WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to delete catalog item: {}", e)))?;

    Ok(())
}

/// Bump the launch counter
pub async fn increment_runs(pool: &Pool<Sqlite>, id: &str) -> Result<()> {
    sqlx::query("UPDATE catalog_items SET runs = runs + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to increment run counter: {}", e)))?;

    Ok(())
}
