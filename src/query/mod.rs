//! Tenant-scoped data access
//!
//! A [`ScopedQuery`] can only be obtained from [`ScopedQueryEnforcer`], which
//! seeds it with an equality filter on the table's tenant column. There is no
//! method that removes or replaces that filter; caller filters are ANDed after
//! it. Rendering is pure, execution takes the pool per call.

mod classify;
mod filter;

pub use classify::classify_db_error;
pub use filter::{escape_like, Filter, FilterValue};

use crate::domain::{ScopedContext, TenantId};
use crate::error::{AppError, ErrorCause, Result};
use crate::identifier::{classify, Classification};
use lazy_static::lazy_static;
use metrics::counter;
use regex::Regex;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, MySql, MySqlPool};
use tracing::debug;

lazy_static! {
    static ref SQL_IDENTIFIER: Regex = Regex::new(r"^[a-z_][a-z0-9_]*$").unwrap();
}

/// A tenant-owned table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantTable {
    name: &'static str,
    tenant_column: &'static str,
    soft_delete_column: Option<&'static str>,
}

impl TenantTable {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            tenant_column: "tenant_id",
            soft_delete_column: None,
        }
    }

    pub const fn tenant_column(mut self, column: &'static str) -> Self {
        self.tenant_column = column;
        self
    }

    /// Rows with a non-NULL value in `column` are treated as deleted.
    pub const fn soft_delete(mut self, column: &'static str) -> Self {
        self.soft_delete_column = Some(column);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// SQL text plus its bind values in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub binds: Vec<FilterValue>,
}

/// Entry point for tenant-scoped queries
pub struct ScopedQueryEnforcer;

impl ScopedQueryEnforcer {
    /// Scope `table` to `tenant_id`.
    ///
    /// The identifier is checked again here because background jobs and tests
    /// call services without going through the guard. Only the canonical form
    /// is accepted; translating an external id is the guard's job.
    pub fn scope(table: TenantTable, tenant_id: &str) -> Result<ScopedQuery> {
        match classify(tenant_id) {
            Classification::Canonical(tenant_id) => Ok(ScopedQuery::new(table, tenant_id)),
            _ => Err(AppError::BadRequest(
                ErrorCause::InvalidStoreIdFormat,
                "invalid store identifier format".to_string(),
            )),
        }
    }

    /// Scope `table` to the tenant an authorized request resolved to.
    pub fn for_context(ctx: &ScopedContext, table: TenantTable) -> ScopedQuery {
        ScopedQuery::new(table, ctx.tenant_id())
    }
}

/// Query handle bound to one tenant
#[derive(Debug, Clone)]
pub struct ScopedQuery {
    table: TenantTable,
    tenant_id: TenantId,
    columns: Vec<&'static str>,
    filters: Vec<Filter>,
    include_deleted: bool,
    order_by: Vec<(&'static str, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl ScopedQuery {
    fn new(table: TenantTable, tenant_id: TenantId) -> Self {
        Self {
            table,
            tenant_id,
            columns: Vec::new(),
            filters: Vec::new(),
            include_deleted: false,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Restrict the selected columns (default `*`).
    #[must_use]
    pub fn select(mut self, columns: &[&'static str]) -> Self {
        self.columns = columns.to_vec();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &'static str, direction: SortDirection) -> Self {
        self.order_by.push((column, direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// `page` is 1-based.
    #[must_use]
    pub fn page(self, page: u64, per_page: u64) -> Self {
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        self.limit(per_page).offset(offset)
    }

    fn validate(&self) -> Result<()> {
        let mut names = vec![self.table.name, self.table.tenant_column];
        names.extend(self.table.soft_delete_column);
        names.extend(self.columns.iter().copied());
        names.extend(self.filters.iter().flat_map(Filter::columns));
        names.extend(self.order_by.iter().map(|(column, _)| *column));

        match names.into_iter().find(|name| !SQL_IDENTIFIER.is_match(name)) {
            Some(bad) => Err(AppError::Internal(
                ErrorCause::InvalidQuery,
                anyhow::anyhow!("invalid SQL identifier {:?} in query on {}", bad, self.table.name),
            )),
            None => Ok(()),
        }
    }

    /// WHERE clause; the tenant predicate is always first.
    fn where_clause(&self, binds: &mut Vec<FilterValue>) -> String {
        binds.push(FilterValue::Text(self.tenant_id.to_string()));
        let mut predicates = vec![format!("{} = ?", self.table.tenant_column)];

        if let Some(column) = self.table.soft_delete_column {
            if !self.include_deleted {
                predicates.push(format!("{} IS NULL", column));
            }
        }

        predicates.extend(self.filters.iter().filter_map(|f| f.render(binds)));
        format!("WHERE {}", predicates.join(" AND "))
    }

    pub fn render_select(&self) -> Result<RenderedQuery> {
        self.validate()?;

        let mut binds = Vec::new();
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        let mut sql = format!(
            "SELECT {} FROM {} {}",
            columns,
            self.table.name,
            self.where_clause(&mut binds)
        );

        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction.as_sql()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
        }

        // MySQL has no OFFSET without LIMIT
        if self.limit.is_some() || self.offset.is_some() {
            let limit = self.limit.map_or(i64::MAX, clamp_i64);
            binds.push(FilterValue::Int(limit));
            sql.push_str(" LIMIT ?");
            if let Some(offset) = self.offset {
                binds.push(FilterValue::Int(clamp_i64(offset)));
                sql.push_str(" OFFSET ?");
            }
        }

        Ok(RenderedQuery { sql, binds })
    }

    /// Total rows matching the same filters, ignoring ordering and pagination
    pub fn render_count(&self) -> Result<RenderedQuery> {
        self.validate()?;

        let mut binds = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {} {}",
            self.table.name,
            self.where_clause(&mut binds)
        );
        Ok(RenderedQuery { sql, binds })
    }

    pub fn render_soft_delete(&self, deleted_at: chrono::DateTime<chrono::Utc>) -> Result<RenderedQuery> {
        self.validate()?;

        let column = self.table.soft_delete_column.ok_or_else(|| {
            AppError::Internal(
                ErrorCause::InvalidQuery,
                anyhow::anyhow!("table {} has no soft delete column", self.table.name),
            )
        })?;

        // Already-deleted rows keep their original marker.
        let mut scoped = self.clone();
        scoped.include_deleted = false;

        let mut binds = vec![FilterValue::Timestamp(deleted_at)];
        let sql = format!(
            "UPDATE {} SET {} = ? {}",
            self.table.name,
            column,
            scoped.where_clause(&mut binds)
        );
        Ok(RenderedQuery { sql, binds })
    }

    pub async fn fetch_all<T>(&self, pool: &MySqlPool) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let rendered = self.render_select()?;
        let result = bind_all_as(sqlx::query_as::<_, T>(&rendered.sql), rendered.binds)
            .fetch_all(pool)
            .await;
        self.finish(result)
    }

    /// Like [`fetch_optional`](Self::fetch_optional), but absence is `NotFound`.
    pub async fn fetch_one<T>(&self, pool: &MySqlPool) -> Result<T>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let rendered = self.render_select()?;
        let result = bind_all_as(sqlx::query_as::<_, T>(&rendered.sql), rendered.binds)
            .fetch_one(pool)
            .await;
        self.finish(result)
    }

    pub async fn fetch_optional<T>(&self, pool: &MySqlPool) -> Result<Option<T>>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let rendered = self.render_select()?;
        let result = bind_all_as(sqlx::query_as::<_, T>(&rendered.sql), rendered.binds)
            .fetch_optional(pool)
            .await;
        self.finish(result)
    }

    pub async fn count(&self, pool: &MySqlPool) -> Result<i64> {
        let rendered = self.render_count()?;
        let result = bind_all_as(sqlx::query_as::<_, (i64,)>(&rendered.sql), rendered.binds)
            .fetch_one(pool)
            .await;
        self.finish(result).map(|(count,)| count)
    }

    /// One page of rows plus the total for the same filter set
    pub async fn fetch_with_count<T>(&self, pool: &MySqlPool) -> Result<(Vec<T>, i64)>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let rows = self.fetch_all(pool).await?;
        let total = self.count(pool).await?;
        Ok((rows, total))
    }

    /// Mark matching rows deleted. Returns the number of rows affected.
    pub async fn soft_delete(&self, pool: &MySqlPool) -> Result<u64> {
        let rendered = self.render_soft_delete(chrono::Utc::now())?;
        let result = bind_all(sqlx::query(&rendered.sql), rendered.binds)
            .execute(pool)
            .await;
        self.finish(result).map(|done| done.rows_affected())
    }

    fn finish<T>(&self, result: std::result::Result<T, sqlx::Error>) -> Result<T> {
        let result = result.map_err(classify_db_error);
        let label = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        counter!(
            "storegate_scoped_queries_total",
            "table" => self.table.name,
            "result" => label
        )
        .increment(1);

        if let Err(e) = &result {
            debug!(
                table = self.table.name,
                tenant_id = %self.tenant_id,
                cause = %e.cause(),
                "Scoped query failed"
            );
        }
        result
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn bind_all_as<'q, T>(
    mut query: QueryAs<'q, MySql, T, MySqlArguments>,
    binds: Vec<FilterValue>,
) -> QueryAs<'q, MySql, T, MySqlArguments> {
    for value in binds {
        query = match value {
            FilterValue::Text(v) => query.bind(v),
            FilterValue::Int(v) => query.bind(v),
            FilterValue::Bool(v) => query.bind(v),
            FilterValue::Timestamp(v) => query.bind(v),
        };
    }
    query
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    binds: Vec<FilterValue>,
) -> Query<'q, MySql, MySqlArguments> {
    for value in binds {
        query = match value {
            FilterValue::Text(v) => query.bind(v),
            FilterValue::Int(v) => query.bind(v),
            FilterValue::Bool(v) => query.bind(v),
            FilterValue::Timestamp(v) => query.bind(v),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AuthenticatedUser, MembershipRole, SessionMetadata, UserId};
    use crate::error::ErrorKind;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    const T1: &str = "550e8400-e29b-41d4-a716-446655440000";
    const T2: &str = "6ba7b810-9dad-41d1-80b4-00c04fd430c8";

    const ORDERS: TenantTable = TenantTable::new("orders").soft_delete("deleted_at");
    const PRODUCTS: TenantTable = TenantTable::new("products").tenant_column("store_id");

    #[test]
    fn test_scope_seeds_tenant_filter() {
        let rendered = ScopedQueryEnforcer::scope(PRODUCTS, T1)
            .unwrap()
            .render_select()
            .unwrap();

        assert_eq!(rendered.sql, "SELECT * FROM products WHERE store_id = ?");
        assert_eq!(rendered.binds, vec![FilterValue::from(T1)]);
    }

    #[test]
    fn test_scope_canonicalizes_tenant_id() {
        let rendered = ScopedQueryEnforcer::scope(PRODUCTS, &T1.to_uppercase())
            .unwrap()
            .render_select()
            .unwrap();
        assert_eq!(rendered.binds, vec![FilterValue::from(T1)]);
    }

    #[test]
    fn test_scope_rejects_non_canonical_ids() {
        for raw in ["", "store_01HQWE123", "not-a-uuid", "' OR 1=1 --"] {
            let err = ScopedQueryEnforcer::scope(ORDERS, raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest);
            assert_eq!(err.cause(), ErrorCause::InvalidStoreIdFormat);
        }
    }

    #[test]
    fn test_scope_from_context() {
        let tenant_id = TenantId::parse(T2).unwrap();
        let ctx = ScopedContext::new(
            tenant_id,
            None,
            AuthenticatedUser::new(UserId::new_v4()),
            MembershipRole::Viewer,
            SessionMetadata::default(),
        );
        let query = ScopedQueryEnforcer::for_context(&ctx, PRODUCTS);
        assert_eq!(query.tenant_id(), tenant_id);
    }

    #[test]
    fn test_soft_deleted_rows_excluded_by_default() {
        let query = ScopedQueryEnforcer::scope(ORDERS, T1).unwrap();

        assert_eq!(
            query.render_select().unwrap().sql,
            "SELECT * FROM orders WHERE tenant_id = ? AND deleted_at IS NULL"
        );
        assert_eq!(
            query.include_deleted().render_select().unwrap().sql,
            "SELECT * FROM orders WHERE tenant_id = ?"
        );
    }

    #[test]
    fn test_caller_filters_are_added_after_tenant_filter() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rendered = ScopedQueryEnforcer::scope(ORDERS, T1)
            .unwrap()
            .select(&["id", "status", "total"])
            .filter(Filter::any_of("status", ["paid", "shipped"]))
            .filter(Filter::between("created_at", Some(from), None))
            .filter(Filter::search(&["customer_name", "note"], "smith"))
            .filter(Filter::eq("tenant_id", "6ba7b810-9dad-41d1-80b4-00c04fd430c8"))
            .order_by("created_at", SortDirection::Desc)
            .page(3, 20)
            .render_select()
            .unwrap();

        assert_eq!(
            rendered.sql,
            "SELECT id, status, total FROM orders WHERE tenant_id = ? AND deleted_at IS NULL \
             AND status IN (?, ?) AND created_at >= ? \
             AND (customer_name LIKE ? OR note LIKE ?) AND tenant_id = ? \
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            rendered.binds,
            vec![
                FilterValue::from(T1),
                FilterValue::from("paid"),
                FilterValue::from("shipped"),
                FilterValue::from(from),
                FilterValue::from("%smith%"),
                FilterValue::from("%smith%"),
                FilterValue::from(T2),
                FilterValue::Int(20),
                FilterValue::Int(40),
            ]
        );
    }

    #[test]
    fn test_scoping_is_idempotent() {
        let build = || {
            ScopedQueryEnforcer::scope(ORDERS, T1)
                .unwrap()
                .filter(Filter::json_overlaps("tags", ["sale"]))
                .render_select()
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_distinct_tenants_bind_distinct_values() {
        let a = ScopedQueryEnforcer::scope(ORDERS, T1).unwrap().render_select().unwrap();
        let b = ScopedQueryEnforcer::scope(ORDERS, T2).unwrap().render_select().unwrap();

        assert_eq!(a.sql, b.sql);
        assert_ne!(a.binds[0], b.binds[0]);
    }

    #[test]
    fn test_count_ignores_pagination() {
        let rendered = ScopedQueryEnforcer::scope(ORDERS, T1)
            .unwrap()
            .filter(Filter::eq("status", "paid"))
            .order_by("id", SortDirection::Asc)
            .limit(10)
            .render_count()
            .unwrap();

        assert_eq!(
            rendered.sql,
            "SELECT COUNT(*) FROM orders WHERE tenant_id = ? AND deleted_at IS NULL AND status = ?"
        );
        assert_eq!(rendered.binds.len(), 2);
    }

    #[test]
    fn test_offset_without_limit() {
        let rendered = ScopedQueryEnforcer::scope(PRODUCTS, T1)
            .unwrap()
            .offset(5)
            .render_select()
            .unwrap();
        assert!(rendered.sql.ends_with(" LIMIT ? OFFSET ?"));
        assert_eq!(
            &rendered.binds[1..],
            &[FilterValue::Int(i64::MAX), FilterValue::Int(5)]
        );
    }

    #[test]
    fn test_soft_delete_keeps_tenant_filter() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let rendered = ScopedQueryEnforcer::scope(ORDERS, T1)
            .unwrap()
            .include_deleted()
            .filter(Filter::eq("id", 42i64))
            .render_soft_delete(at)
            .unwrap();

        assert_eq!(
            rendered.sql,
            "UPDATE orders SET deleted_at = ? WHERE tenant_id = ? AND deleted_at IS NULL AND id = ?"
        );
        assert_eq!(
            rendered.binds,
            vec![
                FilterValue::from(at),
                FilterValue::from(T1),
                FilterValue::Int(42)
            ]
        );
    }

    #[test]
    fn test_soft_delete_requires_marker_column() {
        let err = ScopedQueryEnforcer::scope(PRODUCTS, T1)
            .unwrap()
            .render_soft_delete(Utc::now())
            .unwrap_err();
        assert_eq!(err.cause(), ErrorCause::InvalidQuery);
    }

    #[test]
    fn test_bad_identifiers_are_rejected() {
        let query = ScopedQueryEnforcer::scope(ORDERS, T1).unwrap();

        let err = query
            .clone()
            .filter(Filter::eq("status; DROP TABLE orders", "x"))
            .render_select()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.cause(), ErrorCause::InvalidQuery);

        let err = query
            .order_by("Created_At", SortDirection::Asc)
            .render_count()
            .unwrap_err();
        assert_eq!(err.cause(), ErrorCause::InvalidQuery);

        let bad_table = TenantTable::new("orders o");
        let err = ScopedQueryEnforcer::scope(bad_table, T1)
            .unwrap()
            .render_select()
            .unwrap_err();
        assert_eq!(err.cause(), ErrorCause::InvalidQuery);
    }
}
