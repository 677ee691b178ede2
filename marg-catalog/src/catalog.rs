use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use marg_core::repository::RouteRepository;
use marg_core::BoxedError;
use marg_shared::models::Route;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Route not found: {0}")]
    NotFound(String),
}

/// Validate operator input and build a new Route record.
pub fn new_route(
    name: &str,
    origin: &str,
    destination: &str,
    total_seats: u16,
    price: i64,
) -> Result<Route, CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::Validation("route name is required".into()));
    }
    if origin.trim().is_empty() || destination.trim().is_empty() {
        return Err(CatalogError::Validation(
            "origin and destination are required".into(),
        ));
    }
    if total_seats < 1 {
        return Err(CatalogError::Validation(
            "total_seats must be at least 1".into(),
        ));
    }
    if price < 0 {
        return Err(CatalogError::Validation("price must not be negative".into()));
    }

    Ok(Route {
        id: Uuid::new_v4(),
        name: name.trim().to_string(),
        origin: origin.trim().to_string(),
        destination: destination.trim().to_string(),
        total_seats,
        price,
        created_at: Utc::now(),
    })
}

/// In-memory route catalog. Read-mostly; the only mutations are price
/// updates and explicit deletes by an operator.
pub struct RouteCatalog {
    routes: RwLock<HashMap<Uuid, Route>>,
}

impl RouteCatalog {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_route(
        &self,
        name: &str,
        origin: &str,
        destination: &str,
        total_seats: u16,
        price: i64,
    ) -> Result<Route, CatalogError> {
        let route = new_route(name, origin, destination, total_seats, price)?;
        self.routes.write().await.insert(route.id, route.clone());
        Ok(route)
    }

    pub async fn update_price(&self, route_id: Uuid, price: i64) -> Result<(), CatalogError> {
        if price < 0 {
            return Err(CatalogError::Validation("price must not be negative".into()));
        }
        let mut routes = self.routes.write().await;
        let route = routes
            .get_mut(&route_id)
            .ok_or_else(|| CatalogError::NotFound(route_id.to_string()))?;
        route.price = price;
        Ok(())
    }

    pub async fn remove_route(&self, route_id: Uuid) -> Result<(), CatalogError> {
        self.routes
            .write()
            .await
            .remove(&route_id)
            .map(|_| ())
            .ok_or_else(|| CatalogError::NotFound(route_id.to_string()))
    }

    pub async fn list_routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self.routes.read().await.values().cloned().collect();
        routes.sort_by_key(|r| r.created_at);
        routes
    }

    /// First route matching both endpoints, case-insensitively. Mirrors the
    /// booking portal's search box, which treats endpoints as labels.
    pub async fn find_route(&self, origin: &str, destination: &str) -> Option<Route> {
        let routes = self.routes.read().await;
        let mut matches: Vec<&Route> = routes
            .values()
            .filter(|r| {
                r.origin.eq_ignore_ascii_case(origin.trim())
                    && r.destination.eq_ignore_ascii_case(destination.trim())
            })
            .collect();
        matches.sort_by_key(|r| r.created_at);
        matches.first().map(|r| (*r).clone())
    }

    pub async fn get_route(&self, route_id: Uuid) -> Option<Route> {
        self.routes.read().await.get(&route_id).cloned()
    }
}

impl Default for RouteCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteRepository for RouteCatalog {
    async fn create(&self, route: &Route) -> Result<(), BoxedError> {
        self.routes.write().await.insert(route.id, route.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Route>, BoxedError> {
        Ok(self.get_route(id).await)
    }

    async fn list(&self) -> Result<Vec<Route>, BoxedError> {
        Ok(self.list_routes().await)
    }

    async fn update_price(&self, id: Uuid, price: i64) -> Result<bool, BoxedError> {
        match RouteCatalog::update_price(self, id, price).await {
            Ok(()) => Ok(true),
            Err(CatalogError::NotFound(_)) => Ok(false),
            Err(e) => Err(Box::new(e)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, BoxedError> {
        match self.remove_route(id).await {
            Ok(()) => Ok(true),
            Err(CatalogError::NotFound(_)) => Ok(false),
            Err(e) => Err(Box::new(e)),
        }
    }

    async fn find_by_endpoints(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Option<Route>, BoxedError> {
        Ok(self.find_route(origin, destination).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_route_lifecycle() {
        let catalog = RouteCatalog::new();

        let route = catalog
            .add_route("Morning Express", "Patna", "Motihari", 50, 450)
            .await
            .unwrap();
        assert_eq!(catalog.list_routes().await.len(), 1);

        catalog.update_price(route.id, 500).await.unwrap();
        assert_eq!(catalog.get_route(route.id).await.unwrap().price, 500);

        catalog.remove_route(route.id).await.unwrap();
        assert!(catalog.list_routes().await.is_empty());
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_input() {
        let catalog = RouteCatalog::new();

        let err = catalog
            .add_route("Night Rider", "Patna", "Motihari", 0, 450)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let err = catalog
            .add_route("Night Rider", "Patna", "Motihari", 50, -1)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        let err = catalog
            .add_route("", "Patna", "Motihari", 50, 450)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_missing_route() {
        let catalog = RouteCatalog::new();
        let err = catalog.remove_route(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_route_is_case_insensitive() {
        let catalog = RouteCatalog::new();
        catalog
            .add_route("Morning Express", "Patna", "Motihari", 50, 450)
            .await
            .unwrap();

        let found = catalog.find_route("patna", "MOTIHARI").await;
        assert!(found.is_some());
        assert!(catalog.find_route("Patna", "Gaya").await.is_none());
    }

    #[tokio::test]
    async fn test_update_price_rejects_negative() {
        let catalog = RouteCatalog::new();
        let route = catalog
            .add_route("Morning Express", "Patna", "Motihari", 50, 450)
            .await
            .unwrap();

        let err = catalog.update_price(route.id, -10).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert_eq!(catalog.get_route(route.id).await.unwrap().price, 450);
    }
}
