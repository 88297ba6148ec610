// ABOUTME: Integration tests for workload deployment and rollout waiting.
// ABOUTME: Scripted kubectl/helm responses drive the polling loop.

mod support;

use skiff::types::Sensitive;
use skiff::workload::{ChartRelease, DbSecret, RolloutError, WorkloadDeployer, update_kubeconfig};
use std::time::Duration;
use support::{ScriptedRunner, failed, ok};

fn deployment_json(ready: u32) -> String {
    format!(r#"{{"status":{{"replicas":3,"readyReplicas":{ready}}}}}"#)
}

fn db_secret() -> DbSecret {
    DbSecret {
        name: "webapp-db".to_string(),
        host: Sensitive::new("webapp-db.internal".to_string()),
        database: "webapp".to_string(),
        username: "webapp".to_string(),
        password: Sensitive::new("s3cret".to_string()),
    }
}

#[tokio::test]
async fn kubeconfig_update_targets_the_provisioned_cluster() {
    let runner = ScriptedRunner::new(vec![ok("Updated context webapp-eks")]);

    update_kubeconfig(&runner, "eu-west-1", "webapp-eks")
        .await
        .unwrap();

    assert_eq!(
        runner.calls(),
        vec!["aws eks update-kubeconfig --region eu-west-1 --name webapp-eks"]
    );
}

#[tokio::test]
async fn rollout_succeeds_once_desired_replicas_are_ready() {
    let runner = ScriptedRunner::new(vec![
        ok(&deployment_json(0)),
        ok(&deployment_json(1)),
        ok(&deployment_json(3)),
    ]);
    let deployer = WorkloadDeployer::new(&runner, "default");

    deployer
        .wait_for_rollout(
            "webapp",
            3,
            Duration::from_secs(5),
            Duration::from_millis(10),
        )
        .await
        .unwrap();

    assert_eq!(runner.calls().len(), 3);
    assert!(
        runner.calls()[0].starts_with("kubectl get deployment webapp -n default"),
        "unexpected call: {}",
        runner.calls()[0]
    );
}

#[tokio::test]
async fn rollout_times_out_below_desired_count() {
    // 2 of 3 replicas ready, forever.
    let runner = ScriptedRunner::new(vec![ok(&deployment_json(2))]);
    let deployer = WorkloadDeployer::new(&runner, "default");

    let err = deployer
        .wait_for_rollout(
            "webapp",
            3,
            Duration::from_millis(50),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();

    match err {
        RolloutError::Timeout { ready, desired, .. } => {
            assert_eq!(ready, 2);
            assert_eq!(desired, 3);
        }
        other => panic!("expected timeout, got {other}"),
    }
}

#[tokio::test]
async fn missing_ready_replicas_field_counts_as_zero() {
    let runner = ScriptedRunner::new(vec![ok(r#"{"status":{"replicas":3}}"#)]);
    let deployer = WorkloadDeployer::new(&runner, "default");

    let err = deployer
        .wait_for_rollout(
            "webapp",
            1,
            Duration::from_millis(20),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RolloutError::Timeout { ready: 0, .. }));
}

#[tokio::test]
async fn malformed_kubectl_output_is_rejected() {
    let runner = ScriptedRunner::new(vec![ok("not json")]);
    let deployer = WorkloadDeployer::new(&runner, "default");

    let err = deployer
        .wait_for_rollout("webapp", 1, Duration::from_secs(1), Duration::from_millis(10))
        .await
        .unwrap_err();

    assert!(matches!(err, RolloutError::Malformed { .. }));
}

#[tokio::test]
async fn kubectl_failure_aborts_the_wait() {
    let runner = ScriptedRunner::new(vec![failed(1, "connection refused")]);
    let deployer = WorkloadDeployer::new(&runner, "default");

    let err = deployer
        .wait_for_rollout("webapp", 1, Duration::from_secs(1), Duration::from_millis(10))
        .await
        .unwrap_err();

    assert!(matches!(err, RolloutError::Exec(_)));
}

#[tokio::test]
async fn secret_is_rendered_client_side_then_applied() {
    let runner = ScriptedRunner::new(vec![
        ok("apiVersion: v1\nkind: Secret\n"),
        ok("secret/webapp-db configured"),
    ]);
    let deployer = WorkloadDeployer::new(&runner, "apps");

    deployer.apply_secret(&db_secret()).await.unwrap();

    let requests = runner.requests();
    assert_eq!(requests.len(), 2);

    // Render step: client-side dry run, redacted from logs.
    assert_eq!(requests[0].program, "kubectl");
    assert!(requests[0].args.contains(&"--dry-run=client".to_string()));
    assert!(requests[0].redact_args);
    assert!(
        requests[0]
            .args
            .contains(&"--from-literal=DB_PASSWORD=s3cret".to_string())
    );

    // Apply step: rendered object piped over stdin.
    assert_eq!(
        requests[1].args,
        vec!["apply", "-n", "apps", "-f", "-"]
    );
    assert_eq!(
        requests[1].stdin.as_deref(),
        Some(b"apiVersion: v1\nkind: Secret\n".as_slice())
    );
}

#[tokio::test]
async fn reapplying_the_secret_issues_the_same_commands() {
    // Create-or-replace semantics: a re-run repeats the dry-run/apply
    // pair instead of patching.
    let runner = ScriptedRunner::new(vec![
        ok("kind: Secret\n"),
        ok("secret/webapp-db configured"),
        ok("kind: Secret\n"),
        ok("secret/webapp-db unchanged"),
    ]);
    let deployer = WorkloadDeployer::new(&runner, "default");

    deployer.apply_secret(&db_secret()).await.unwrap();
    deployer.apply_secret(&db_secret()).await.unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0], calls[2]);
}

#[tokio::test]
async fn manifests_are_applied_in_order() {
    let runner = ScriptedRunner::new(vec![ok("applied"), ok("applied")]);
    let deployer = WorkloadDeployer::new(&runner, "default");

    deployer
        .apply_manifests(&["k8s/deployment.yaml".into(), "k8s/ingress.yaml".into()])
        .await
        .unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            "kubectl apply -n default -f k8s/deployment.yaml",
            "kubectl apply -n default -f k8s/ingress.yaml",
        ]
    );
}

#[tokio::test]
async fn chart_upgrade_passes_values_overlay() {
    let runner = ScriptedRunner::new(vec![ok("Release \"webapp\" has been upgraded")]);
    let deployer = WorkloadDeployer::new(&runner, "apps");

    deployer
        .upgrade_chart(&ChartRelease {
            chart: "charts/webapp".to_string(),
            release: "webapp".to_string(),
            values: vec![
                ("image.tag".to_string(), "v1.2.3".to_string()),
            ],
        })
        .await
        .unwrap();

    assert_eq!(
        runner.calls(),
        vec!["helm upgrade --install webapp charts/webapp -n apps --set image.tag=v1.2.3"]
    );
}

#[tokio::test]
async fn ingress_hostname_resolves_when_published() {
    let runner = ScriptedRunner::new(vec![ok(
        r#"{"status":{"loadBalancer":{"ingress":[{"hostname":"alb-123.us-east-1.elb.amazonaws.com"}]}}}"#,
    )]);
    let deployer = WorkloadDeployer::new(&runner, "default");

    let hostname = deployer.ingress_hostname("webapp").await.unwrap();
    assert_eq!(
        hostname.as_deref(),
        Some("alb-123.us-east-1.elb.amazonaws.com")
    );
}

#[tokio::test]
async fn ingress_hostname_is_none_before_publication() {
    let runner = ScriptedRunner::new(vec![ok(r#"{"status":{"loadBalancer":{}}}"#)]);
    let deployer = WorkloadDeployer::new(&runner, "default");

    let hostname = deployer.ingress_hostname("webapp").await.unwrap();
    assert!(hostname.is_none());
}
