use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use marg_core::repository::RouteRepository;
use marg_core::BoxedError;
use marg_shared::models::Route;

pub struct StoreRouteRepository {
    pool: PgPool,
}

impl StoreRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    name: String,
    origin: String,
    destination: String,
    total_seats: i32,
    price: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Route {
            id: row.id,
            name: row.name,
            origin: row.origin,
            destination: row.destination,
            total_seats: row.total_seats as u16,
            price: row.price,
            created_at: row.created_at,
        }
    }
}

const ROUTE_COLUMNS: &str = "id, name, origin, destination, total_seats, price, created_at";

#[async_trait]
impl RouteRepository for StoreRouteRepository {
    async fn create(&self, route: &Route) -> Result<(), BoxedError> {
        sqlx::query(
            r#"
            INSERT INTO routes (id, name, origin, destination, total_seats, price, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(route.id)
        .bind(&route.name)
        .bind(&route.origin)
        .bind(&route.destination)
        .bind(route.total_seats as i32)
        .bind(route.price)
        .bind(route.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Route>, BoxedError> {
        let row: Option<RouteRow> =
            sqlx::query_as(&format!("SELECT {} FROM routes WHERE id = $1", ROUTE_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Route::from))
    }

    async fn list(&self) -> Result<Vec<Route>, BoxedError> {
        let rows: Vec<RouteRow> = sqlx::query_as(&format!(
            "SELECT {} FROM routes ORDER BY created_at",
            ROUTE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Route::from).collect())
    }

    async fn update_price(&self, id: Uuid, price: i64) -> Result<bool, BoxedError> {
        let result = sqlx::query("UPDATE routes SET price = $1 WHERE id = $2")
            .bind(price)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, BoxedError> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_endpoints(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Option<Route>, BoxedError> {
        let row: Option<RouteRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM routes
            WHERE lower(origin) = lower($1) AND lower(destination) = lower($2)
            ORDER BY created_at
            LIMIT 1
            "#,
            ROUTE_COLUMNS
        ))
        .bind(origin.trim())
        .bind(destination.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Route::from))
    }
}
