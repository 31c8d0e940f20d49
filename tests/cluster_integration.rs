//! Integration tests against a real Redis Cluster.
//!
//! These tests require a Redis Cluster running on localhost.
//! All tests are marked with #[ignore] by default.
//!
//! Setup with Docker:
//! ```bash
//! docker run -d --name redis-cluster \
//!   -p 7000-7005:7000-7005 \
//!   grokzen/redis-cluster:latest
//! ```
//!
//! Run tests:
//! ```bash
//! cargo test --test cluster_integration -- --ignored
//! ```

use bytes::Bytes;
use muxpipe::{ClusterClient, Error, Frame, Result};

/// Helper function to create a cluster client for testing.
async fn create_test_client() -> Result<ClusterClient> {
    ClusterClient::connect("127.0.0.1:7000,127.0.0.1:7001,127.0.0.1:7002").await
}

#[tokio::test]
#[ignore]
async fn test_cluster_connect() {
    let client = create_test_client().await.expect("failed to connect");

    let node_count = client.node_count();
    assert!(node_count >= 3, "expected at least 3 primaries, got {}", node_count);
    assert!(client.is_fully_covered(), "cluster should cover all 16384 slots");
}

#[tokio::test]
#[ignore]
async fn test_cluster_basic_operations() {
    let client = create_test_client().await.expect("failed to connect");

    let key = "integration:test:basic";
    let value = Bytes::from("Hello, Cluster!");

    client.set(key, value.clone()).await.expect("SET failed");
    assert_eq!(client.get(key).await.expect("GET failed"), Some(value));
    assert!(client.exists(key).await.expect("EXISTS failed"));
    assert_eq!(client.del(key).await.expect("DEL failed"), 1);
    assert!(!client.exists(key).await.expect("EXISTS failed"));
}

#[tokio::test]
#[ignore]
async fn test_pipeline_spans_nodes() {
    let client = create_test_client().await.expect("failed to connect");

    let mut pipeline = client.pipeline();
    for i in 0..100 {
        pipeline
            .set(format!("integration:pipe:{}", i), i.to_string())
            .unwrap();
    }
    let reads: Vec<_> = (0..100)
        .map(|i| pipeline.get(format!("integration:pipe:{}", i)).unwrap())
        .collect();
    pipeline.flush().await.expect("flush failed");

    for (i, read) in reads.iter().enumerate() {
        assert_eq!(read.get().unwrap(), Some(Bytes::from(i.to_string())));
    }
}

#[tokio::test]
#[ignore]
async fn test_pipeline_wrong_type_is_isolated() {
    let client = create_test_client().await.expect("failed to connect");

    let mut pipeline = client.pipeline();
    pipeline.set("integration:foo", "bar").unwrap();
    let members = pipeline.smembers("integration:foo").unwrap();
    let value = pipeline.get("integration:foo").unwrap();
    pipeline.flush().await.expect("flush failed");

    assert!(matches!(members.get(), Err(Error::Server { .. })));
    assert_eq!(value.get().unwrap().as_deref(), Some(&b"bar"[..]));
}

#[tokio::test]
#[ignore]
async fn test_cluster_hash_tags() {
    let client = create_test_client().await.expect("failed to connect");

    let keys = ["user:{12345}:name", "user:{12345}:email", "user:{12345}:age"];
    let slot = client.validate_same_slot(&keys).expect("keys should share a slot");
    assert_eq!(slot, muxpipe::key_slot("12345"));

    let mut pipeline = client.pipeline();
    pipeline.set(keys[0], "John Doe").unwrap();
    pipeline.set(keys[1], "john@example.com").unwrap();
    pipeline.set(keys[2], "30").unwrap();
    let removed = pipeline.del(keys).unwrap();
    pipeline.flush().await.expect("flush failed");
    assert_eq!(removed.get().unwrap(), 3);
}

#[tokio::test]
#[ignore]
async fn test_pipeline_scripts() {
    let client = create_test_client().await.expect("failed to connect");

    let mut pipeline = client.pipeline();
    let success = pipeline
        .eval("return 'success!'", Vec::<&str>::new(), Vec::<&str>::new())
        .unwrap();
    pipeline.set("{integration}.n", "3").unwrap();
    let nothing = pipeline
        .eval(
            "redis.call('INCRBY', KEYS[1], ARGV[1]); redis.call('INCRBY', KEYS[1], ARGV[1]);",
            ["{integration}.n"],
            ["5"],
        )
        .unwrap();
    let total = pipeline.get("{integration}.n").unwrap();
    let nested = pipeline
        .eval("return { {KEYS[1]} , {2} }", ["key1"], Vec::<&str>::new())
        .unwrap();
    pipeline.flush().await.expect("flush failed");

    assert_eq!(success.get().unwrap(), Frame::bulk("success!"));
    assert_eq!(nothing.get().unwrap(), Frame::Null);
    assert_eq!(total.get().unwrap().as_deref(), Some(&b"13"[..]));
    assert_eq!(
        nested.get().unwrap(),
        Frame::Array(vec![
            Frame::Array(vec![Frame::bulk("key1")]),
            Frame::Array(vec![Frame::Integer(2)]),
        ])
    );

    let sha = client
        .script_load("return 'success!'", "{integration}")
        .await
        .expect("SCRIPT LOAD failed");
    let mut pipeline = client.pipeline();
    let result = pipeline
        .evalsha(sha, ["{integration}"], Vec::<&str>::new())
        .unwrap();
    pipeline.flush().await.expect("flush failed");
    assert_eq!(result.get().unwrap(), Frame::bulk("success!"));
}

#[tokio::test]
#[ignore]
async fn test_refresh_topology() {
    let client = create_test_client().await.expect("failed to connect");

    let before = client.topology().epoch();
    let topology = client.refresh_topology().await.expect("refresh failed");
    assert!(topology.epoch() > before);
    assert_eq!(topology.nodes().len(), client.node_count());
}
