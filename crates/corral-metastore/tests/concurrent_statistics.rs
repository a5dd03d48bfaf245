//! Integration tests for transform-based statistics updates under
//! contention.
//!
//! Updates to one entity must apply one at a time with no lost
//! increments; updates to different entities must not serialize against
//! each other's outcomes.

use std::sync::Arc;

use corral_core::MemoryBackend;
use corral_metastore::prelude::*;
use corral_metastore::{AcidTransaction, PrincipalPrivileges, TableBuilder};

async fn metastore_with_table(table_name: &str) -> Arc<InMemoryMetastore> {
    let metastore = Arc::new(InMemoryMetastore::new(Arc::new(MemoryBackend::new())));
    metastore
        .create_database(Database::new("lake").with_location("mem://warehouse/lake"))
        .await
        .unwrap();
    metastore
        .create_table(
            TableBuilder::new("lake", table_name, TableType::Managed)
                .column("id", "bigint")
                .partition_column("ds", "date")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    metastore
}

fn increment_row_count(statistics: PartitionStatistics) -> PartitionStatistics {
    let mut statistics = statistics;
    statistics.basic.row_count = Some(statistics.basic.row_count.unwrap_or(0) + 1);
    statistics
}

#[tokio::test]
async fn test_concurrent_table_increments_are_not_lost() {
    let metastore = metastore_with_table("orders").await;
    let writers = 50;

    let handles: Vec<_> = (0..writers)
        .map(|_| {
            let metastore = metastore.clone();
            tokio::spawn(async move {
                metastore
                    .update_table_statistics(
                        "lake",
                        "orders",
                        AcidTransaction::none(),
                        Box::new(increment_row_count),
                    )
                    .await
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let table = metastore.get_table("lake", "orders").await.unwrap().unwrap();
    let statistics = metastore.get_table_statistics(&table).await.unwrap();
    assert_eq!(statistics.basic.row_count, Some(writers));
}

#[tokio::test]
async fn test_updates_to_different_tables_proceed_independently() {
    let metastore = metastore_with_table("orders").await;
    metastore
        .create_table(
            TableBuilder::new("lake", "shipments", TableType::Managed)
                .column("id", "bigint")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for table_name in ["orders", "shipments"] {
        for _ in 0..20 {
            let metastore = metastore.clone();
            handles.push(tokio::spawn(async move {
                metastore
                    .update_table_statistics(
                        "lake",
                        table_name,
                        AcidTransaction::none(),
                        Box::new(increment_row_count),
                    )
                    .await
                    .unwrap();
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for table_name in ["orders", "shipments"] {
        let table = metastore
            .get_table("lake", table_name)
            .await
            .unwrap()
            .unwrap();
        let statistics = metastore.get_table_statistics(&table).await.unwrap();
        assert_eq!(statistics.basic.row_count, Some(20), "table {table_name}");
    }
}

#[tokio::test]
async fn test_concurrent_partition_increments_are_not_lost() {
    let metastore = metastore_with_table("orders").await;
    let table = metastore.get_table("lake", "orders").await.unwrap().unwrap();
    metastore
        .add_partitions(
            "lake",
            "orders",
            vec![PartitionWithStatistics::without_statistics(Partition::new(
                &table,
                vec!["2024-06-01".into()],
                "",
            ))],
        )
        .await
        .unwrap();

    let writers = 30;
    let handles: Vec<_> = (0..writers)
        .map(|_| {
            let metastore = metastore.clone();
            let table = table.clone();
            tokio::spawn(async move {
                metastore
                    .update_partition_statistics(
                        &table,
                        vec![("ds=2024-06-01".to_string(), Box::new(increment_row_count) as _)],
                    )
                    .await
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let partition = metastore
        .get_partition(&table, &["2024-06-01".to_string()])
        .await
        .unwrap()
        .unwrap();
    let statistics = metastore
        .get_partition_statistics(&table, &[partition])
        .await
        .unwrap();
    assert_eq!(
        statistics["ds=2024-06-01"].basic.row_count,
        Some(writers)
    );
}

#[tokio::test]
async fn test_update_on_missing_table_fails_without_creating_state() {
    let metastore = metastore_with_table("orders").await;
    let result = metastore
        .update_table_statistics(
            "lake",
            "ghost",
            AcidTransaction::none(),
            Box::new(increment_row_count),
        )
        .await;
    assert!(matches!(result, Err(MetastoreError::NotFound { .. })));
}

#[tokio::test]
async fn test_transform_sees_previous_value() {
    let metastore = metastore_with_table("orders").await;
    metastore
        .update_table_statistics(
            "lake",
            "orders",
            AcidTransaction::none(),
            Box::new(|_| PartitionStatistics::with_row_count(100)),
        )
        .await
        .unwrap();
    metastore
        .update_table_statistics(
            "lake",
            "orders",
            AcidTransaction::none(),
            Box::new(|statistics| {
                assert_eq!(statistics.basic.row_count, Some(100));
                increment_row_count(statistics)
            }),
        )
        .await
        .unwrap();

    let table = metastore.get_table("lake", "orders").await.unwrap().unwrap();
    let statistics = metastore.get_table_statistics(&table).await.unwrap();
    assert_eq!(statistics.basic.row_count, Some(101));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_drop_discards_in_flight_statistics_update() {
    let metastore = metastore_with_table("orders").await;
    let in_transform = Arc::new(std::sync::Barrier::new(2));

    let update = {
        let metastore = metastore.clone();
        let in_transform = in_transform.clone();
        tokio::spawn(async move {
            metastore
                .update_table_statistics(
                    "lake",
                    "orders",
                    AcidTransaction::none(),
                    Box::new(move |mut statistics| {
                        in_transform.wait();
                        statistics.basic.row_count = Some(7);
                        statistics
                    }),
                )
                .await
        })
    };

    let rendezvous = in_transform.clone();
    tokio::task::spawn_blocking(move || {
        rendezvous.wait();
    })
    .await
    .unwrap();

    // The transform is in flight and holds the entity lock; the drop
    // has to wait for it and then discards whatever it wrote.
    metastore.drop_table("lake", "orders", false).await.unwrap();
    update.await.unwrap().unwrap();

    metastore
        .create_table(
            TableBuilder::new("lake", "orders", TableType::Managed)
                .column("id", "bigint")
                .build(),
            PrincipalPrivileges::empty(),
        )
        .await
        .unwrap();
    let table = metastore.get_table("lake", "orders").await.unwrap().unwrap();
    let statistics = metastore.get_table_statistics(&table).await.unwrap();
    assert_eq!(statistics.basic.row_count, None);
}
