use esusu_sdk::advanced::calls;
use esusu_sdk::core::constants::entrypoints;
use esusu_sdk::{EsusuClient, GroupId, WalletSession};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{contract, group_record, test_config, MockConnection};

fn scripted_groups(count: u64) -> MockConnection {
    (1..=count).fold(MockConnection::new(), |mock, id| {
        mock.with_read_for(
            calls::get_group_info(contract(), GroupId::from(id)),
            group_record(id, 2, 5),
        )
    })
}

#[test_log::test(tokio::test)]
async fn test_one_failing_lookup_does_not_abort_batch() -> anyhow::Result<()> {
    let mock = scripted_groups(10).fail_group(4);
    let client = EsusuClient::with_cache(mock.clone(), Arc::new(WalletSession::new()), test_config());

    let report = client.preloader().run().await;

    assert_eq!(report.failed, vec![GroupId::from(4)]);
    assert_eq!(report.warmed.len(), 9);
    assert!(report.missing.is_empty());

    let cache = client.connection();
    for id in 1..=10u64 {
        let call = calls::get_group_info(contract(), GroupId::from(id));
        assert_eq!(cache.contains(&call).await, id != 4, "group {id}");
    }
    assert_eq!(cache.len().await, 9);
    Ok(())
}

#[tokio::test]
async fn test_warmed_groups_are_served_from_cache() -> anyhow::Result<()> {
    let mock = scripted_groups(10);
    let client = EsusuClient::with_cache(mock.clone(), Arc::new(WalletSession::new()), test_config());

    client.preloader().spawn().await?;
    assert_eq!(mock.read_count(entrypoints::GET_GROUP_INFO), 10);

    let mock = mock
        .with_read(entrypoints::GET_GROUP_LOCKED_FUNDS, json!(0))
        .with_read(entrypoints::GET_CONTRIBUTION_DEADLINE, json!(0));
    let analytics = client.group_analytics(Some(GroupId::from(3))).fetch().await;

    assert!(analytics.data.is_some());
    assert_eq!(mock.read_count(entrypoints::GET_GROUP_INFO), 10);
    Ok(())
}

#[tokio::test]
async fn test_sentinel_records_are_not_counted_as_warmed() {
    let mock = scripted_groups(3).with_read(
        entrypoints::GET_GROUP_INFO,
        json!([0, 0, 0, 0, 0, 0, 0, 0, 0]),
    );
    let mut config = test_config();
    config.preload.count = 5;
    let client = EsusuClient::with_cache(mock, Arc::new(WalletSession::new()), config);

    let report = client.preloader().run().await;

    assert_eq!(report.warmed.len(), 3);
    assert_eq!(report.missing, vec![GroupId::from(4), GroupId::from(5)]);
    assert!(report.failed.is_empty());

    // placeholders are evicted so a freshly created group is read from the node
    let cache = client.connection();
    for id in 1..=5u64 {
        let call = calls::get_group_info(contract(), GroupId::from(id));
        assert_eq!(cache.contains(&call).await, id <= 3, "group {id}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_preload_waits_for_start_delay() {
    let mock = scripted_groups(2);
    let mut config = test_config();
    config.preload.count = 2;
    config.preload.delay_ms = 1_000;
    let client = EsusuClient::with_cache(mock.clone(), Arc::new(WalletSession::new()), config);

    let handle = client.preloader().spawn();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(mock.total_reads(), 0);

    let report = handle.await.unwrap();
    assert_eq!(report.warmed, vec![GroupId::from(1), GroupId::from(2)]);
}
