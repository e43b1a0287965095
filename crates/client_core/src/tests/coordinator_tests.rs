use super::*;
use crate::{
    actions::ActionKind,
    fake_api::{package, Call, FakeApi},
};
use shared::{domain::ManifestFile, error::Operation};

fn coordinator(api: &Arc<FakeApi>) -> ActionCoordinator {
    ActionCoordinator::new(api.clone())
}

#[tokio::test]
async fn create_refetches_the_full_environment_list() {
    let api = Arc::new(FakeApi::with_environments(&["base"]));
    let outcome = coordinator(&api)
        .execute(ActionRequest::Create {
            name: " envA ".into(),
            runtime_version: "3.11".into(),
        })
        .await;

    assert_eq!(
        api.calls(),
        vec![
            Call::Create("envA".into(), "3.11".into()),
            Call::ListEnvironments
        ]
    );
    match outcome {
        ActionOutcome::Succeeded {
            notice,
            effect: Effect::Environments(Ok(envs)),
            ..
        } => {
            assert_eq!(notice.as_deref(), Some("Environment 'envA' created"));
            let names: Vec<_> = envs.iter().map(|env| env.name.as_str()).collect();
            assert_eq!(names, vec!["base", "envA"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn install_refreshes_only_the_affected_packages() {
    let api = Arc::new(FakeApi::with_environments(&["base", "envA"]));
    api.set_packages("envA", &["python"]);

    let outcome = coordinator(&api)
        .execute(ActionRequest::Install {
            env: "envA".into(),
            spec: "numpy".into(),
        })
        .await;

    assert_eq!(
        api.calls(),
        vec![
            Call::Install("envA".into(), "numpy".into()),
            Call::ListPackages("envA".into())
        ]
    );
    assert_eq!(
        outcome,
        ActionOutcome::Succeeded {
            key: ActionKey::new(ActionKind::Install, "envA"),
            notice: Some("Package 'numpy' installed into 'envA'".into()),
            effect: Effect::Packages {
                env: "envA".into(),
                packages: Ok(vec![package("python"), package("numpy")]),
            },
        }
    );
}

#[tokio::test]
async fn failed_mutation_issues_no_refresh() {
    let api = Arc::new(FakeApi::with_environments(&["envA"]));
    api.set_packages("envA", &["numpy"]);
    api.fail(Operation::UninstallPackage, "PackagesNotFoundError: numpy");

    let outcome = coordinator(&api)
        .execute(ActionRequest::Uninstall {
            env: "envA".into(),
            package: "numpy".into(),
        })
        .await;

    assert_eq!(
        api.calls(),
        vec![Call::Uninstall("envA".into(), "numpy".into())]
    );
    assert_eq!(
        outcome,
        ActionOutcome::Failed {
            key: ActionKey::new(ActionKind::Uninstall, "envA/numpy"),
            message: "PackagesNotFoundError: numpy".into(),
        }
    );
}

#[tokio::test]
async fn transport_failures_report_the_attempted_operation() {
    let api = Arc::new(FakeApi::with_environments(&["envA"]));
    api.fail_transport(Operation::DeleteEnvironment);

    let outcome = coordinator(&api)
        .execute(ActionRequest::Delete { env: "envA".into() })
        .await;

    match outcome {
        ActionOutcome::Failed { message, .. } => {
            assert_eq!(message, "Failed to delete environment")
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn refresh_failure_after_a_successful_mutation_is_carried_in_the_effect() {
    let api = Arc::new(FakeApi::with_environments(&["envA"]));
    api.fail_transport(Operation::ListEnvironments);

    let outcome = coordinator(&api)
        .execute(ActionRequest::Clone {
            source: "envA".into(),
            new_name: "envA_clone".into(),
        })
        .await;

    match outcome {
        ActionOutcome::Succeeded {
            notice,
            effect: Effect::Environments(Err(err)),
            ..
        } => {
            assert_eq!(notice.as_deref(), Some("Environment 'envA' cloned to 'envA_clone'"));
            assert_eq!(err.to_string(), "Failed to fetch environments");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn base_delete_is_rejected_without_any_call() {
    let api = Arc::new(FakeApi::with_environments(&["base"]));
    let outcome = coordinator(&api)
        .execute(ActionRequest::Delete { env: "base".into() })
        .await;

    assert!(!outcome.is_success());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn export_returns_manifest_without_touching_the_registry() {
    let api = Arc::new(FakeApi::with_environments(&["envA"]));
    let outcome = coordinator(&api)
        .execute(ActionRequest::Export { env: "envA".into() })
        .await;

    assert_eq!(api.calls(), vec![Call::Export("envA".into())]);
    match outcome {
        ActionOutcome::Succeeded {
            effect: Effect::SaveManifest { env, manifest },
            ..
        } => {
            assert_eq!(env, "envA");
            assert!(manifest.starts_with("name: envA"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn bulk_install_reports_the_server_message_verbatim() {
    let api = Arc::new(FakeApi::with_environments(&["envA"]));
    let manifest = ManifestFile::new("requirements.txt", "numpy\nscipy\n");

    let outcome = coordinator(&api)
        .execute(ActionRequest::BulkInstall {
            env: "envA".into(),
            manifest,
        })
        .await;

    assert_eq!(
        api.calls(),
        vec![
            Call::InstallFromFile("envA".into(), "requirements.txt".into()),
            Call::ListPackages("envA".into())
        ]
    );
    match outcome {
        ActionOutcome::Succeeded { notice, .. } => assert_eq!(
            notice.as_deref(),
            Some("Packages from 'requirements.txt' installed successfully (pip).")
        ),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn import_drops_blank_optional_fields() {
    let api = Arc::new(FakeApi::with_environments(&[]));
    let outcome = coordinator(&api)
        .execute(ActionRequest::Import {
            manifest: ManifestFile::new("environment.yml", "name: imported\n"),
            name: Some("  ".into()),
            runtime_version: None,
        })
        .await;

    assert!(outcome.is_success());
    assert_eq!(
        api.calls(),
        vec![
            Call::Import("environment.yml".into(), None, None),
            Call::ListEnvironments
        ]
    );
}

#[tokio::test]
async fn check_size_reports_usage_without_refresh() {
    let api = Arc::new(FakeApi::with_environments(&["envA"]));
    let outcome = coordinator(&api)
        .execute(ActionRequest::CheckSize { env: "envA".into() })
        .await;

    assert_eq!(api.calls(), vec![Call::Size("envA".into())]);
    assert_eq!(
        outcome,
        ActionOutcome::Succeeded {
            key: ActionKey::new(ActionKind::CheckSize, "envA"),
            notice: Some("Disk usage for 'envA': 1.2G".into()),
            effect: Effect::None,
        }
    );
}
