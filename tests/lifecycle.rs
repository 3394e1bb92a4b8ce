//! Lifecycle behaviour of the provider against the in-memory stub API.

use std::sync::Arc;

use forge_provider::models::{Server, Site};
use forge_provider::testing::{
    assert_error_contains, assert_plan_creates, assert_plan_replaces, ProviderTester,
    StubForgeApi, TestError, STUB_FIRST_ID,
};
use forge_provider::{EntityKind, ForgeProvider, ProviderError};
use serde_json::{json, Value};

fn tester(stub: &Arc<StubForgeApi>) -> ProviderTester<ForgeProvider> {
    ProviderTester::new(ForgeProvider::with_client(stub.clone()))
}

#[tokio::test]
async fn create_then_read_keeps_supplied_fields() {
    let stub = Arc::new(StubForgeApi::new());
    let tester = tester(&stub);

    let config = json!({
        "platform": "aws",
        "type": "database",
        "name": "db-primary",
        "credential_id": 7,
        "region": "us-east-1",
        "size": "t3.small",
        "php_version": "php82"
    });
    let state = tester.lifecycle_create("forge_server", config.clone()).await.unwrap();

    for key in ["platform", "type", "name", "credential_id", "region", "size", "php_version"] {
        assert_eq!(state[key], config[key], "{}", key);
    }
    assert_eq!(state["id"], STUB_FIRST_ID);
}

#[tokio::test]
async fn ocean2_server_gets_id_123_and_reads_back() {
    let stub = Arc::new(StubForgeApi::new());
    let tester = tester(&stub);

    let plan = tester
        .plan_create("forge_server", json!({"platform": "ocean2"}))
        .await
        .unwrap();
    assert_plan_creates(&plan);
    assert!(plan.planned_state["id"].is_null());

    let created = tester.create("forge_server", plan.planned_state).await.unwrap();
    assert_eq!(created["id"], 123);

    let read = tester
        .read("forge_server", json!({"id": 123}))
        .await
        .unwrap();
    assert_eq!(read["platform"], "ocean2");
    assert_eq!(stub.server(123).unwrap().provider.as_deref(), Some("ocean2"));
}

#[tokio::test]
async fn read_of_missing_entity_is_not_found_for_every_kind() {
    let stub = Arc::new(StubForgeApi::new());
    let tester = tester(&stub);

    let configs = [
        (EntityKind::Server, json!({"id": 1})),
        (EntityKind::Site, json!({"server_id": 1, "id": 2})),
        (EntityKind::Database, json!({"server_id": 1, "id": 2})),
        (EntityKind::Daemon, json!({"server_id": 1, "id": 2})),
        (EntityKind::Deployment, json!({"server_id": 1, "site_id": 2, "id": 3})),
    ];
    for (kind, config) in configs {
        let err = tester
            .read_data_source(kind.type_name(), config)
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{}: {}", kind, err);
    }
    assert_eq!(stub.calls(), 5);

    let state = tester
        .read("forge_server", json!({"id": 1, "platform": "aws"}))
        .await
        .unwrap();
    assert!(state.is_null());
}

#[tokio::test]
async fn out_of_set_values_fail_before_any_call() {
    let stub = Arc::new(StubForgeApi::new());
    let tester = tester(&stub);

    for config in [
        json!({"platform": "ocean3"}),
        json!({"platform": "aws", "type": "mainframe"}),
    ] {
        let err = tester
            .validate_resource_config("forge_server", config.clone())
            .await
            .unwrap_err();
        match err {
            TestError::Diagnostics(diagnostics) => {
                assert_error_contains(&diagnostics, "Invalid value")
            },
            other => panic!("unexpected error: {}", other),
        }

        let err = tester
            .plan_create("forge_server", config.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));

        let err = tester.create("forge_server", config).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn changing_platform_replaces_the_server() {
    let stub = Arc::new(StubForgeApi::new());
    let tester = tester(&stub);

    let state = tester
        .lifecycle_create("forge_server", json!({"platform": "ocean2", "name": "web"}))
        .await
        .unwrap();
    let (plan, replaced) = tester
        .lifecycle_replace(
            "forge_server",
            state,
            json!({"platform": "hetzner", "name": "web"}),
        )
        .await
        .unwrap();

    assert_plan_replaces(&plan);
    assert!(plan.planned_state["id"].is_null());
    assert_eq!(replaced["platform"], "hetzner");
    assert_eq!(replaced["name"], "web");
    assert_ne!(replaced["id"], json!(STUB_FIRST_ID));
}

#[tokio::test]
async fn delete_of_vanished_server_succeeds() {
    let stub = Arc::new(StubForgeApi::new());
    let tester = tester(&stub);

    tester
        .lifecycle_delete("forge_server", json!({"id": 55, "platform": "aws"}))
        .await
        .unwrap();
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn repeated_reads_are_byte_identical() {
    let stub = Arc::new(
        StubForgeApi::new()
            .with_server(Server {
                id: 9,
                provider: Some("linode4".to_string()),
                network: vec![3, 1],
                is_ready: Some(true),
                ..Default::default()
            })
            .with_site(
                9,
                Site {
                    id: 4,
                    name: Some("example.com".to_string()),
                    aliases: vec!["b.example.com".to_string(), "a.example.com".to_string()],
                    wildcards: Some(true),
                    ..Default::default()
                },
            ),
    );
    let tester = tester(&stub);

    let reads: Vec<(&str, Value)> = vec![
        ("forge_server", json!({"id": 9})),
        ("forge_site", json!({"server_id": 9, "id": 4})),
    ];
    for (data_source, config) in reads {
        let first = tester
            .read_data_source(data_source, config.clone())
            .await
            .unwrap();
        let second = tester.read_data_source(data_source, config).await.unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap(),
            "{}",
            data_source
        );
    }

    let first = tester.read("forge_server", json!({"id": 9})).await.unwrap();
    let second = tester.read("forge_server", first.clone()).await.unwrap();
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn import_then_read_fills_the_record() {
    let stub = Arc::new(StubForgeApi::new().with_server(Server {
        id: 321,
        provider: Some("vultr2".to_string()),
        name: Some("imported".to_string()),
        ..Default::default()
    }));
    let tester = tester(&stub);

    let states = tester.lifecycle_import("forge_server", "321").await.unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0]["platform"], "vultr2");
    assert_eq!(states[0]["name"], "imported");

    let err = tester
        .import_resource("forge_server", "1/321")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)));
}

#[tokio::test]
async fn update_fails_loudly() {
    let stub = Arc::new(StubForgeApi::new());
    let tester = tester(&stub);

    let err = tester
        .update(
            "forge_server",
            json!({"id": 1, "platform": "aws"}),
            json!({"id": 1, "platform": "aws", "name": "renamed"}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unimplemented(_)));
    assert_eq!(stub.calls(), 0);
}
