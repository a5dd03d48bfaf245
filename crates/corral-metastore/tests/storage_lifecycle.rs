//! Integration tests for the table storage lifecycle.
//!
//! These tests verify location resolution at create time and the
//! location-aware deletion rules on drop: data is removed only when no
//! other catalog entry claims the location, exactly or from inside it,
//! and metadata always goes before bytes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use corral_core::{Error as CoreError, MemoryBackend, Result as CoreResult, StorageBackend};
use corral_metastore::prelude::*;
use corral_metastore::PrincipalPrivileges;

fn harness() -> (InMemoryMetastore, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let metastore = InMemoryMetastore::new(backend.clone());
    (metastore, backend)
}

async fn seed_database(metastore: &InMemoryMetastore, name: &str, root: &str) {
    metastore
        .create_database(Database::new(name).with_location(root))
        .await
        .unwrap();
}

async fn put_files(backend: &MemoryBackend, root: &str, names: &[&str]) {
    for name in names {
        backend
            .put(&format!("{root}/{name}"), Bytes::from_static(b"data"))
            .await
            .unwrap();
    }
}

/// Backend whose recursive deletes always fail, for exercising the
/// partial-failure path of location-aware drops.
#[derive(Debug, Default)]
struct FailingDeleteBackend {
    inner: MemoryBackend,
}

#[async_trait]
impl StorageBackend for FailingDeleteBackend {
    async fn exists(&self, location: &str) -> CoreResult<bool> {
        self.inner.exists(location).await
    }

    async fn delete_recursive(&self, location: &str) -> CoreResult<u64> {
        Err(CoreError::Internal {
            message: format!("injected delete failure for {location}"),
        })
    }

    async fn put(&self, location: &str, data: Bytes) -> CoreResult<()> {
        self.inner.put(location, data).await
    }

    async fn list(&self, prefix: &str) -> CoreResult<Vec<String>> {
        self.inner.list(prefix).await
    }
}

#[tokio::test]
async fn test_external_table_full_lifecycle() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;

    let location = "mem://external/events";
    metastore
        .create_table(
            TableBuilder::new("lake", "events", TableType::External)
                .column("id", "bigint")
                .location(location)
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();

    // Location recorded verbatim, never rewritten under the database root.
    let table = metastore.get_table("lake", "events").await.unwrap().unwrap();
    assert_eq!(table.storage.location, location);

    put_files(&backend, location, &["part-0.parquet", "part-1.parquet"]).await;
    assert!(backend
        .exists(&format!("{location}/part-0.parquet"))
        .await
        .unwrap());

    metastore.drop_table("lake", "events", true).await.unwrap();

    assert!(metastore.get_table("lake", "events").await.unwrap().is_none());
    assert!(!backend
        .exists(&format!("{location}/part-0.parquet"))
        .await
        .unwrap());
    assert!(!backend
        .exists(&format!("{location}/part-1.parquet"))
        .await
        .unwrap());
    assert!(backend.list(location).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_drop_without_delete_data_keeps_files() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;

    let location = "mem://external/retained";
    metastore
        .create_table(
            TableBuilder::new("lake", "retained", TableType::External)
                .column("id", "bigint")
                .location(location)
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    put_files(&backend, location, &["part-0.parquet"]).await;

    metastore.drop_table("lake", "retained", false).await.unwrap();

    assert!(metastore.get_table("lake", "retained").await.unwrap().is_none());
    assert!(backend
        .exists(&format!("{location}/part-0.parquet"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_managed_drop_removes_derived_location() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;

    metastore
        .create_table(
            TableBuilder::new("lake", "orders", TableType::Managed)
                .column("id", "bigint")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    put_files(&backend, "mem://warehouse/lake/orders", &["part-0.parquet"]).await;

    metastore.drop_table("lake", "orders", true).await.unwrap();
    assert!(!backend
        .exists("mem://warehouse/lake/orders/part-0.parquet")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_shared_location_refuses_delete() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;

    let location = "mem://external/shared";
    for name in ["reader_a", "reader_b"] {
        metastore
            .create_table(
                TableBuilder::new("lake", name, TableType::External)
                    .column("id", "bigint")
                    .location(location)
                    .build(),
                PrincipalPrivileges::empty(),
            )
            .await
            .unwrap();
    }
    put_files(&backend, location, &["part-0.parquet"]).await;

    let result = metastore.drop_table("lake", "reader_a", true).await;
    match result {
        Err(MetastoreError::SharedLocation { references, .. }) => {
            assert_eq!(references, 2);
        }
        other => panic!("expected SharedLocation, got {other:?}"),
    }

    // The refusal covers metadata too: the table is still there.
    assert!(metastore.get_table("lake", "reader_a").await.unwrap().is_some());
    assert!(backend
        .exists(&format!("{location}/part-0.parquet"))
        .await
        .unwrap());

    // Once the other reference is gone (metadata only), deletion proceeds.
    metastore.drop_table("lake", "reader_b", false).await.unwrap();
    metastore.drop_table("lake", "reader_a", true).await.unwrap();
    assert!(!backend
        .exists(&format!("{location}/part-0.parquet"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_prefix_overlap_is_not_sharing() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;

    metastore
        .create_table(
            TableBuilder::new("lake", "events", TableType::External)
                .column("id", "bigint")
                .location("mem://external/events")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    metastore
        .create_table(
            TableBuilder::new("lake", "events_v2", TableType::External)
                .column("id", "bigint")
                .location("mem://external/events_v2")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    put_files(&backend, "mem://external/events_v2", &["part-0.parquet"]).await;

    // "events" is a string prefix of "events_v2" but not the same location.
    metastore.drop_table("lake", "events", true).await.unwrap();
    assert!(backend
        .exists("mem://external/events_v2/part-0.parquet")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_drop_partition_removes_only_its_data() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;

    metastore
        .create_table(
            TableBuilder::new("lake", "orders", TableType::Managed)
                .column("id", "bigint")
                .partition_column("ds", "date")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    let table = metastore.get_table("lake", "orders").await.unwrap().unwrap();

    metastore
        .add_partitions(
            "lake",
            "orders",
            vec![
                PartitionWithStatistics::without_statistics(Partition::new(
                    &table,
                    vec!["2024-06-01".into()],
                    "",
                )),
                PartitionWithStatistics::without_statistics(Partition::new(
                    &table,
                    vec!["2024-06-02".into()],
                    "",
                )),
            ],
        )
        .await
        .unwrap();

    let root = &table.storage.location;
    put_files(&backend, &format!("{root}/ds=2024-06-01"), &["part-0.parquet"]).await;
    put_files(&backend, &format!("{root}/ds=2024-06-02"), &["part-0.parquet"]).await;

    metastore
        .drop_partition("lake", "orders", &["2024-06-01".to_string()], true)
        .await
        .unwrap();

    assert!(!backend
        .exists(&format!("{root}/ds=2024-06-01/part-0.parquet"))
        .await
        .unwrap());
    assert!(backend
        .exists(&format!("{root}/ds=2024-06-02/part-0.parquet"))
        .await
        .unwrap());
    assert!(metastore
        .get_partition(&table, &["2024-06-01".to_string()])
        .await
        .unwrap()
        .is_none());
    assert!(metastore
        .get_partition(&table, &["2024-06-02".to_string()])
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_drop_database_deletes_own_location() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "scratch", "mem://warehouse/scratch").await;
    put_files(&backend, "mem://warehouse/scratch", &["leftover.tmp"]).await;

    metastore.drop_database("scratch", true).await.unwrap();
    assert!(metastore.get_database("scratch").await.unwrap().is_none());
    assert!(!backend
        .exists("mem://warehouse/scratch/leftover.tmp")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_view_create_and_drop_touch_no_storage() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;
    put_files(&backend, "mem://warehouse/lake", &["unrelated.parquet"]).await;

    metastore
        .create_table(
            TableBuilder::new("lake", "orders_v", TableType::View)
                .view_text("SELECT 1")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    let view = metastore.get_table("lake", "orders_v").await.unwrap().unwrap();
    assert!(view.storage.location.is_empty());

    metastore.drop_table("lake", "orders_v", true).await.unwrap();
    assert!(backend
        .exists("mem://warehouse/lake/unrelated.parquet")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_managed_table_rejects_explicit_location() {
    let (metastore, _backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;

    let result = metastore
        .create_table(
            TableBuilder::new("lake", "orders", TableType::Managed)
                .column("id", "bigint")
                .location("mem://somewhere/else")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await;
    assert!(matches!(result, Err(MetastoreError::InvalidState { .. })));
}

#[tokio::test]
async fn test_external_table_requires_location() {
    let (metastore, _backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;

    let result = metastore
        .create_table(
            TableBuilder::new("lake", "events", TableType::External)
                .column("id", "bigint")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await;
    assert!(matches!(result, Err(MetastoreError::InvalidState { .. })));
}

#[tokio::test]
async fn test_nested_location_refuses_delete() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "lake", "mem://warehouse/lake").await;

    metastore
        .create_table(
            TableBuilder::new("lake", "all_events", TableType::External)
                .column("id", "bigint")
                .location("mem://external/events")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    metastore
        .create_table(
            TableBuilder::new("lake", "click_events", TableType::External)
                .column("id", "bigint")
                .location("mem://external/events/clicks")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    put_files(&backend, "mem://external/events/clicks", &["part-0.parquet"]).await;

    // Deleting the enclosing root would take the nested table's data
    // with it, so the drop is refused wholesale.
    let result = metastore.drop_table("lake", "all_events", true).await;
    assert!(matches!(result, Err(MetastoreError::SharedLocation { .. })));
    assert!(metastore
        .get_table("lake", "all_events")
        .await
        .unwrap()
        .is_some());
    assert!(backend
        .exists("mem://external/events/clicks/part-0.parquet")
        .await
        .unwrap());

    // Once the nested entry is gone (metadata only), deletion proceeds.
    metastore
        .drop_table("lake", "click_events", false)
        .await
        .unwrap();
    metastore.drop_table("lake", "all_events", true).await.unwrap();
    assert!(!backend
        .exists("mem://external/events/clicks/part-0.parquet")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_drop_database_refuses_shared_location() {
    let (metastore, backend) = harness();
    seed_database(&metastore, "raw", "mem://warehouse/shared").await;
    seed_database(&metastore, "staging", "mem://warehouse/shared").await;
    put_files(&backend, "mem://warehouse/shared", &["part-0.parquet"]).await;

    let result = metastore.drop_database("raw", true).await;
    match result {
        Err(MetastoreError::SharedLocation { references, .. }) => {
            assert_eq!(references, 2);
        }
        other => panic!("expected SharedLocation, got {other:?}"),
    }
    assert!(metastore.get_database("raw").await.unwrap().is_some());
    assert!(backend
        .exists("mem://warehouse/shared/part-0.parquet")
        .await
        .unwrap());

    metastore.drop_database("staging", false).await.unwrap();
    metastore.drop_database("raw", true).await.unwrap();
    assert!(!backend
        .exists("mem://warehouse/shared/part-0.parquet")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_failed_deletion_keeps_metadata_removed() {
    let backend = Arc::new(FailingDeleteBackend::default());
    let metastore = InMemoryMetastore::new(backend.clone());
    metastore
        .create_database(Database::new("lake").with_location("mem://warehouse/lake"))
        .await
        .unwrap();
    metastore
        .create_table(
            TableBuilder::new("lake", "events", TableType::External)
                .column("id", "bigint")
                .location("mem://external/events")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    backend
        .put("mem://external/events/part-0.parquet", Bytes::from_static(b"data"))
        .await
        .unwrap();

    // Metadata goes first; the physical failure surfaces without
    // restoring the entry, and the bytes stay put for an out-of-band
    // retry.
    let result = metastore.drop_table("lake", "events", true).await;
    assert!(matches!(result, Err(MetastoreError::Storage(_))));
    assert!(metastore.get_table("lake", "events").await.unwrap().is_none());
    assert!(backend
        .exists("mem://external/events/part-0.parquet")
        .await
        .unwrap());
}
