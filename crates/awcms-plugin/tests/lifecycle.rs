//! Registry projection through the in-memory store.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use awcms_core::error::ErrorKind;
use awcms_entity::extension::ExtensionConfig;
use awcms_plugin::lifecycle::{LifecycleSync, MemoryRegistryStore, StoreOp, SyncStep};
use awcms_plugin::ExtensionError;

fn config() -> ExtensionConfig {
    serde_json::from_value(json!({
        "routes": [
            { "path": "/backup", "component": "backup:BackupManager", "name": "Backups" },
            { "path": "/backup/public", "requires_auth": false }
        ],
        "menus": [
            { "label": "Backups", "path": "/backup", "icon": "archive", "order": 5 },
            { "label": "Schedules", "path": "/backup/schedule" }
        ],
        "permissions": ["plugin.backup.view", "plugin.backup.create"]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_sync_projects_all_sections() {
    let store = Arc::new(MemoryRegistryStore::new());
    let sync = LifecycleSync::new(store.clone());
    let id = Uuid::new_v4();

    let report = sync.sync_extension_to_registry(id, Some(&config())).await.unwrap();

    assert!(report.is_clean());
    assert_eq!(report.routes, Some(2));
    assert_eq!(report.menus, Some(2));
    assert_eq!(report.permissions, Some(2));

    let routes = store.routes(id).await;
    assert!(routes[0].requires_auth);
    assert!(!routes[1].requires_auth);

    let orders: Vec<i32> = store.menus(id).await.iter().map(|m| m.sort_order).collect();
    assert_eq!(orders, vec![5, 100]);

    assert_eq!(store.extension_permissions(id).await.len(), 2);
    let core = store.core_permissions().await;
    assert_eq!(core.len(), 2);
    assert!(core.iter().all(|p| p.resource == "extension" && p.action == "dynamic"));
}

#[tokio::test]
async fn test_resync_replaces_rows() {
    let store = Arc::new(MemoryRegistryStore::new());
    let sync = LifecycleSync::new(store.clone());
    let id = Uuid::new_v4();

    sync.sync_extension_to_registry(id, Some(&config())).await.unwrap();
    let smaller: ExtensionConfig =
        serde_json::from_value(json!({ "routes": [{ "path": "/only" }] })).unwrap();
    let report = sync.sync_extension_to_registry(id, Some(&smaller)).await.unwrap();

    assert_eq!(report.menus, None);
    assert_eq!(store.routes(id).await.len(), 1);
    assert_eq!(store.menus(id).await.len(), 2);
}

#[tokio::test]
async fn test_missing_config_is_noop() {
    let store = Arc::new(MemoryRegistryStore::new());
    let sync = LifecycleSync::new(store.clone());
    let id = Uuid::new_v4();

    let report = sync.sync_extension_to_registry(id, None).await.unwrap();
    assert!(report.routes.is_none() && report.menus.is_none() && report.permissions.is_none());
    assert!(store.routes(id).await.is_empty());
}

#[tokio::test]
async fn test_failed_step_does_not_block_siblings() {
    let store = Arc::new(MemoryRegistryStore::new());
    store.fail_on(StoreOp::ReplaceRoutes, ErrorKind::Database).await;
    let sync = LifecycleSync::new(store.clone());
    let id = Uuid::new_v4();

    let report = sync.sync_extension_to_registry(id, Some(&config())).await.unwrap();

    assert_eq!(report.routes, None);
    assert_eq!(report.menus, Some(2));
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0],
        ExtensionError::Sync { step: SyncStep::Routes, .. }
    ));
    assert_eq!(store.menus(id).await.len(), 2);
}

#[tokio::test]
async fn test_core_permission_conflict_is_swallowed() {
    let store = Arc::new(MemoryRegistryStore::new());
    store.fail_on(StoreOp::UpsertCorePermission, ErrorKind::Conflict).await;
    let sync = LifecycleSync::new(store.clone());

    let report = sync.sync_extension_to_registry(Uuid::new_v4(), Some(&config())).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.permissions, Some(2));
}

#[tokio::test]
async fn test_unreachable_backend_aborts_sync() {
    let store = Arc::new(MemoryRegistryStore::new());
    store.fail_on(StoreOp::ReplaceMenus, ErrorKind::ServiceUnavailable).await;
    let sync = LifecycleSync::new(store.clone());
    let id = Uuid::new_v4();

    let err = sync.sync_extension_to_registry(id, Some(&config())).await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(store.extension_permissions(id).await.is_empty());
}

#[tokio::test]
async fn test_deactivate_keeps_permissions() {
    let store = Arc::new(MemoryRegistryStore::new());
    let sync = LifecycleSync::new(store.clone());
    let id = Uuid::new_v4();
    sync.sync_extension_to_registry(id, Some(&config())).await.unwrap();

    sync.deactivate_extension_registry(id).await.unwrap();
    assert!(store.routes(id).await.iter().all(|r| !r.is_active));
    assert!(store.menus(id).await.iter().all(|m| !m.is_active));
    assert_eq!(store.extension_permissions(id).await.len(), 2);

    sync.activate_extension_registry(id).await.unwrap();
    assert!(store.routes(id).await.iter().all(|r| r.is_active));
}
