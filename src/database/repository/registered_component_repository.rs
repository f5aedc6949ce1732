//! Registered component repository.
//!
//! Besides the usual cached CRUD it tracks which persisted components the
//! running binary actually ships (`available` codes).

use std::time::Duration;

use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::EntityResult;
use crate::cache::{CacheConfig, CacheError, CacheRegistry, TypedCache};
use crate::database::Database;
use crate::database::models::RegisteredComponent;
use crate::database::models::registered_component::COLUMN_CODE;

pub struct RegisteredComponentRepository {
    db: Database,
    cache: TypedCache<String, RegisteredComponent>,
    available: RwLock<Vec<String>>,
}

impl RegisteredComponentRepository {
    pub fn new(db: &Database, cache: &CacheRegistry, ttl: Duration) -> Result<Self, CacheError> {
        Ok(Self {
            db: db.clone(),
            cache: cache.get_or_create("registered_components", CacheConfig::entities(1_000, ttl))?,
            available: RwLock::new(Vec::new()),
        })
    }

    /// Get a registered component by its code.
    pub async fn get(&self, code: &str) -> EntityResult<RegisteredComponent> {
        if let Some(component) = self.cache.get(&code.to_string()) {
            return Ok(component);
        }

        let component: RegisteredComponent =
            self.db.get_first(&[(COLUMN_CODE, json!(code))]).await?;
        self.cache.insert(code.to_string(), component.clone());

        Ok(component)
    }

    pub async fn count(&self) -> EntityResult<i64> {
        Ok(self.db.count::<RegisteredComponent>(&[]).await?)
    }

    pub async fn create(&self, component: &mut RegisteredComponent) -> EntityResult<()> {
        self.db.create(component).await?;
        self.cache.invalidate(&component.code);
        debug!("Registered component {} in database", component.code);

        Ok(())
    }

    pub async fn save(&self, component: &mut RegisteredComponent) -> EntityResult<()> {
        self.db.save(component).await?;
        self.cache.invalidate(&component.code);

        Ok(())
    }

    pub async fn update(
        &self,
        component: &mut RegisteredComponent,
        column: &'static str,
        value: impl Into<Value>,
    ) -> EntityResult<()> {
        let previous_code = component.code.clone();
        self.db.update_column(component, column, value).await?;
        self.cache.invalidate(&previous_code);
        self.cache.invalidate(&component.code);

        Ok(())
    }

    /// Mark a component code as shipped by this binary. Idempotent.
    pub fn mark_as_available(&self, code: &str) {
        let mut available = self.available.write();
        if !available.iter().any(|c| c == code) {
            available.push(code.to_string());
        }
    }

    /// Codes marked available, in marking order.
    pub fn available_codes(&self) -> Vec<String> {
        self.available.read().clone()
    }

    /// Persisted components that are also available, in marking order.
    pub async fn get_available(&self) -> Vec<RegisteredComponent> {
        let mut components = Vec::new();

        for code in self.available_codes() {
            match self.get(&code).await {
                Ok(component) => components.push(component),
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!("Failed to load registered component {}: {}", code, e),
            }
        }

        components
    }
}

#[cfg(test)]
mod tests {
    use crate::database::models::RegisteredComponent;
    use crate::database::repository::testing::entity_manager;

    fn component(code: &str) -> RegisteredComponent {
        RegisteredComponent {
            code: code.to_string(),
            name: code.to_uppercase(),
            description: String::new(),
            default_enabled: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_available_is_intersection_in_marking_order() {
        let em = entity_manager().await;
        let repo = em.registered_components();

        repo.create(&mut component("ping_pong")).await.unwrap();
        repo.create(&mut component("bot_core")).await.unwrap();

        repo.mark_as_available("bot_core");
        repo.mark_as_available("ghost");
        repo.mark_as_available("ping_pong");
        repo.mark_as_available("bot_core");

        assert_eq!(repo.available_codes(), vec!["bot_core", "ghost", "ping_pong"]);

        let codes: Vec<String> = repo
            .get_available()
            .await
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["bot_core", "ping_pong"]);
    }

    #[tokio::test]
    async fn test_save_invalidates_cached_row() {
        let em = entity_manager().await;
        let repo = em.registered_components();

        let mut stats = component("statistics");
        repo.create(&mut stats).await.unwrap();
        assert_eq!(repo.get("statistics").await.unwrap().name, "STATISTICS");

        stats.name = "Statistics".to_string();
        repo.save(&mut stats).await.unwrap();

        assert_eq!(repo.get("statistics").await.unwrap().name, "Statistics");
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
