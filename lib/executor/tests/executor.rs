use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
  },
};

use async_trait::async_trait;
use executor::{Executor, LoggingReporter, Runner, RunnerArgs, RunnerOutput};
use indexmap::IndexMap;
use kongctl_client::{
  ClientError, StateClient,
  entities::{
    Action, ExternalToolSpec, Plan, PlanMetadata, PlanMode, PlannedChange,
    Protection, ReferenceInfo, RemoteResource, ResourceKind,
  },
};
use tokio::sync::Mutex;

/// An in-memory `StateClient` fake backing every integration test here:
/// a flat list per resource kind, ids assigned sequentially.
#[derive(Default)]
struct FakeClient {
  resources: Mutex<HashMap<ResourceKind, Vec<RemoteResource>>>,
  next_id: AtomicU32,
}

impl FakeClient {
  fn seed(&self, kind: ResourceKind, resource: RemoteResource) {
    self
      .resources
      .try_lock()
      .unwrap()
      .entry(kind)
      .or_default()
      .push(resource);
  }

  fn next_id(&self) -> String {
    format!("id-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
  }
}

fn labels_from(pairs: &[(&str, &str)]) -> kongctl_client::entities::Labels {
  pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn managed_labels(protected: bool) -> kongctl_client::entities::Labels {
  let mut labels = labels_from(&[
    ("managed", "true"),
    ("namespace", "default"),
  ]);
  labels.insert("protected".to_string(), protected.to_string());
  labels
}

#[async_trait]
impl StateClient for FakeClient {
  async fn create(
    &self,
    kind: ResourceKind,
    _parent_id: Option<&str>,
    body: serde_json::Value,
  ) -> Result<RemoteResource, ClientError> {
    let id = self.next_id();
    let name = body
      .get("name")
      .and_then(|v| v.as_str())
      .unwrap_or_default()
      .to_string();
    let labels = body
      .get("labels")
      .and_then(|v| serde_json::from_value(v.clone()).ok())
      .unwrap_or_default();
    let raw = body.as_object().cloned().unwrap_or_default();
    let resource = RemoteResource {
      id: id.clone(),
      name,
      labels,
      raw,
    };
    self
      .resources
      .lock()
      .await
      .entry(kind)
      .or_default()
      .push(resource.clone());
    Ok(resource)
  }

  async fn update(
    &self,
    kind: ResourceKind,
    _parent_id: Option<&str>,
    id: &str,
    body: serde_json::Value,
  ) -> Result<RemoteResource, ClientError> {
    let mut resources = self.resources.lock().await;
    let list = resources.entry(kind).or_default();
    let existing = list.iter_mut().find(|r| r.id == id);
    match existing {
      Some(resource) => {
        if let Some(name) = body.get("name").and_then(|v| v.as_str()) {
          resource.name = name.to_string();
        }
        Ok(resource.clone())
      }
      None => Ok(RemoteResource {
        id: id.to_string(),
        name: String::new(),
        labels: Default::default(),
        raw: Default::default(),
      }),
    }
  }

  async fn delete(
    &self,
    kind: ResourceKind,
    _parent_id: Option<&str>,
    id: &str,
  ) -> Result<(), ClientError> {
    let mut resources = self.resources.lock().await;
    if let Some(list) = resources.get_mut(&kind) {
      list.retain(|r| r.id != id);
    }
    Ok(())
  }

  async fn get_by_id(
    &self,
    kind: ResourceKind,
    _parent_id: Option<&str>,
    id: &str,
  ) -> Result<Option<RemoteResource>, ClientError> {
    Ok(
      self
        .resources
        .lock()
        .await
        .get(&kind)
        .and_then(|list| list.iter().find(|r| r.id == id).cloned()),
    )
  }

  async fn get_by_name(
    &self,
    kind: ResourceKind,
    _parent_id: Option<&str>,
    name: &str,
  ) -> Result<Option<RemoteResource>, ClientError> {
    Ok(
      self
        .resources
        .lock()
        .await
        .get(&kind)
        .and_then(|list| list.iter().find(|r| r.name == name).cloned()),
    )
  }

  async fn list_all(
    &self,
    kind: ResourceKind,
    _parent_id: Option<&str>,
  ) -> Result<Vec<RemoteResource>, ClientError> {
    Ok(self.resources.lock().await.get(&kind).cloned().unwrap_or_default())
  }

  async fn list_managed(
    &self,
    kind: ResourceKind,
    parent_id: Option<&str>,
  ) -> Result<Vec<RemoteResource>, ClientError> {
    Ok(
      self
        .list_all(kind, parent_id)
        .await?
        .into_iter()
        .filter(|r| r.is_managed())
        .collect(),
    )
  }

  async fn upsert_group_membership(
    &self,
    _group_id: &str,
    _member_ids: Vec<String>,
  ) -> Result<(), ClientError> {
    Ok(())
  }

  async fn list_gateway_services(
    &self,
    _control_plane_id: &str,
  ) -> Result<Vec<RemoteResource>, ClientError> {
    Ok(
      self
        .resources
        .lock()
        .await
        .get(&ResourceKind::GatewayService)
        .cloned()
        .unwrap_or_default(),
    )
  }
}

struct FakeRunner {
  success: bool,
}

#[async_trait]
impl Runner for FakeRunner {
  async fn run(&self, _args: RunnerArgs) -> RunnerOutput {
    RunnerOutput {
      success: self.success,
      stdout: "{\"created\":1,\"updated\":0,\"deleted\":0}".to_string(),
      stderr: String::new(),
    }
  }
}

fn api_create_change(id: &str, resource_ref: &str, name: &str) -> PlannedChange {
  PlannedChange {
    id: id.to_string(),
    action: Action::Create,
    resource_type: "api".to_string(),
    resource_ref: resource_ref.to_string(),
    resource_id: None,
    fields: IndexMap::from([(
      "name".to_string(),
      serde_json::Value::String(name.to_string()),
    )]),
    references: Default::default(),
    parent: None,
    depends_on: vec![],
    protection: Some(Protection::Fixed(false)),
    namespace: "default".to_string(),
    external_tool: None,
  }
}

fn bare_plan(changes: Vec<PlannedChange>) -> Plan {
  let execution_order = changes.iter().map(|c| c.id.clone()).collect();
  Plan {
    metadata: PlanMetadata {
      mode: PlanMode::Apply,
      base_dir: None,
    },
    changes,
    execution_order,
  }
}

fn executor_with(client: Arc<FakeClient>, runner: Arc<dyn Runner>) -> Executor {
  Executor::new(
    client,
    runner,
    Arc::new(LoggingReporter::default()),
    "test-token",
    "https://example.konnect.local",
  )
}

#[tokio::test]
async fn happy_path_create_succeeds_and_stamps_labels() {
  let client = Arc::new(FakeClient::default());
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let mut plan = bare_plan(vec![api_create_change("c1", "api_orders", "orders")]);
  let result = exec.execute(&mut plan, false).await;

  assert_eq!(result.success_count, 1);
  assert_eq!(result.failure_count, 0);
  assert_eq!(result.changes_applied.len(), 1);

  let stored = client.resources.lock().await;
  let apis = stored.get(&ResourceKind::Api).unwrap();
  assert_eq!(apis.len(), 1);
  assert_eq!(apis[0].name, "orders");
}

#[tokio::test]
async fn openid_connect_auth_strategy_defaults_credential_claim_on_wire() {
  let client = Arc::new(FakeClient::default());
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let mut fields = IndexMap::new();
  fields.insert(
    "name".to_string(),
    serde_json::Value::String("sso".to_string()),
  );
  fields.insert(
    "strategy_type".to_string(),
    serde_json::Value::String("openid_connect".to_string()),
  );
  fields.insert(
    "configs".to_string(),
    serde_json::json!({ "issuer": "https://issuer.example" }),
  );
  let change = PlannedChange {
    id: "c1".to_string(),
    action: Action::Create,
    resource_type: "application_auth_strategy".to_string(),
    resource_ref: "auth_sso".to_string(),
    resource_id: None,
    fields,
    references: Default::default(),
    parent: None,
    depends_on: vec![],
    protection: Some(Protection::Fixed(false)),
    namespace: "default".to_string(),
    external_tool: None,
  };

  let mut plan = bare_plan(vec![change]);
  let result = exec.execute(&mut plan, false).await;

  assert_eq!(result.failure_count, 0, "{:?}", result.errors);
  let stored = client.resources.lock().await;
  let strategies =
    stored.get(&ResourceKind::ApplicationAuthStrategy).unwrap();
  let configs = strategies[0].raw.get("configs").unwrap();
  assert_eq!(
    configs.get("credential_claim"),
    Some(&serde_json::json!(["sub"]))
  );
}

#[tokio::test]
async fn protected_resource_blocks_update() {
  let client = Arc::new(FakeClient::default());
  client.seed(
    ResourceKind::Api,
    RemoteResource {
      id: "id-0".to_string(),
      name: "orders".to_string(),
      labels: managed_labels(true),
      raw: Default::default(),
    },
  );
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let mut change = api_create_change("c1", "api_orders", "orders-v2");
  change.action = Action::Update;
  change.resource_id = Some("id-0".to_string());
  change.protection = Some(Protection::Fixed(true));

  let mut plan = bare_plan(vec![change]);
  let result = exec.execute(&mut plan, false).await;

  assert_eq!(result.success_count, 0);
  assert_eq!(result.failure_count, 1);
  assert!(result.errors[0].error.contains("protected"));
}

#[tokio::test]
async fn unprotect_transition_allows_update() {
  let client = Arc::new(FakeClient::default());
  client.seed(
    ResourceKind::Api,
    RemoteResource {
      id: "id-0".to_string(),
      name: "orders".to_string(),
      labels: managed_labels(true),
      raw: Default::default(),
    },
  );
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let mut change = api_create_change("c1", "api_orders", "orders-v2");
  change.action = Action::Update;
  change.resource_id = Some("id-0".to_string());
  change.protection = Some(Protection::Transition {
    old: true,
    new: false,
  });

  let mut plan = bare_plan(vec![change]);
  let result = exec.execute(&mut plan, false).await;

  assert_eq!(result.success_count, 1);
  assert_eq!(result.failure_count, 0);
}

#[tokio::test]
async fn back_propagates_created_id_into_later_reference() {
  let client = Arc::new(FakeClient::default());
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let create = api_create_change("c1", "api_orders", "orders");

  let mut version = PlannedChange {
    id: "c2".to_string(),
    action: Action::Create,
    resource_type: "api_version".to_string(),
    resource_ref: "api_orders_v1".to_string(),
    resource_id: None,
    fields: IndexMap::from([(
      "version".to_string(),
      serde_json::Value::String("v1".to_string()),
    )]),
    references: Default::default(),
    parent: Some(kongctl_client::entities::ParentRef {
      r#ref: Some("api_orders".to_string()),
      id: None,
    }),
    depends_on: vec!["c1".to_string()],
    protection: Some(Protection::Fixed(false)),
    namespace: "default".to_string(),
    external_tool: None,
  };
  version.references.insert(
    "api_id".to_string(),
    ReferenceInfo {
      r#ref: "api_orders".to_string(),
      id: None,
      ..Default::default()
    },
  );

  let mut plan = bare_plan(vec![create, version]);
  let result = exec.execute(&mut plan, false).await;

  assert_eq!(result.failure_count, 0, "{:?}", result.errors);
  assert_eq!(result.success_count, 2);

  let resolved_id =
    plan.changes[1].references.get("api_id").unwrap().id.clone();
  assert!(resolved_id.is_some());
}

#[tokio::test]
async fn idempotent_delete_of_already_absent_resource_succeeds() {
  let client = Arc::new(FakeClient::default());
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let change = PlannedChange {
    id: "c1".to_string(),
    action: Action::Delete,
    resource_type: "api".to_string(),
    resource_ref: "api_orders".to_string(),
    resource_id: Some("id-missing".to_string()),
    fields: Default::default(),
    references: Default::default(),
    parent: None,
    depends_on: vec![],
    protection: None,
    namespace: "default".to_string(),
    external_tool: None,
  };

  let mut plan = bare_plan(vec![change]);
  let result = exec.execute(&mut plan, false).await;

  assert_eq!(result.success_count, 1);
  assert_eq!(result.failure_count, 0);
}

#[tokio::test]
async fn external_tool_skips_gateway_service_lookup_when_unreferenced() {
  let client = Arc::new(FakeClient::default());
  client.seed(
    ResourceKind::ControlPlane,
    RemoteResource {
      id: "cp-1".to_string(),
      name: "default".to_string(),
      labels: Default::default(),
      raw: Default::default(),
    },
  );
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let change = PlannedChange {
    id: "c1".to_string(),
    action: Action::ExternalTool,
    resource_type: "gateway_entities".to_string(),
    resource_ref: "gw_orders".to_string(),
    resource_id: None,
    fields: Default::default(),
    references: Default::default(),
    parent: None,
    depends_on: vec![],
    protection: None,
    namespace: "default".to_string(),
    external_tool: Some(ExternalToolSpec {
      control_plane_ref: Some("default".to_string()),
      control_plane_id: None,
      control_plane_name: Some("default".to_string()),
      files: vec!["kong.yaml".to_string()],
      flags: vec![],
      work_dir: None,
      gateway_services: vec![kongctl_client::entities::GatewayServiceDeclaration {
        r#ref: "gw_orders".to_string(),
        selector_name: "orders-service".to_string(),
      }],
    }),
  };

  let mut plan = bare_plan(vec![change]);
  let result = exec.execute(&mut plan, false).await;

  assert_eq!(result.success_count, 1);
  assert_eq!(result.failure_count, 0);
  // No later change references the declared gateway service, so the
  // fake client never needed to answer `list_gateway_services`; nothing
  // to assert beyond the run succeeding.
}

#[tokio::test]
async fn external_tool_resolves_gateway_service_into_later_change() {
  let client = Arc::new(FakeClient::default());
  client.seed(
    ResourceKind::ControlPlane,
    RemoteResource {
      id: "cp-1".to_string(),
      name: "default".to_string(),
      labels: Default::default(),
      raw: Default::default(),
    },
  );
  client.seed(
    ResourceKind::GatewayService,
    RemoteResource {
      id: "svc-1".to_string(),
      name: "orders-service".to_string(),
      labels: Default::default(),
      raw: Default::default(),
    },
  );
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let tool_change = PlannedChange {
    id: "c1".to_string(),
    action: Action::ExternalTool,
    resource_type: "gateway_entities".to_string(),
    resource_ref: "gw_orders".to_string(),
    resource_id: None,
    fields: Default::default(),
    references: Default::default(),
    parent: None,
    depends_on: vec![],
    protection: None,
    namespace: "default".to_string(),
    external_tool: Some(ExternalToolSpec {
      control_plane_ref: Some("default".to_string()),
      control_plane_id: None,
      control_plane_name: Some("default".to_string()),
      files: vec!["kong.yaml".to_string()],
      flags: vec![],
      work_dir: None,
      gateway_services: vec![kongctl_client::entities::GatewayServiceDeclaration {
        r#ref: "gw_orders".to_string(),
        selector_name: "orders-service".to_string(),
      }],
    }),
  };

  let mut service_fields = IndexMap::new();
  service_fields.insert(
    "service".to_string(),
    serde_json::json!({
      "id": kongctl_client::entities::format_placeholder("gw_orders", "id"),
    }),
  );
  let downstream = PlannedChange {
    id: "c2".to_string(),
    action: Action::Create,
    resource_type: "catalog_service".to_string(),
    resource_ref: "catalog_orders".to_string(),
    resource_id: None,
    fields: service_fields,
    references: Default::default(),
    parent: None,
    depends_on: vec!["c1".to_string()],
    protection: Some(Protection::Fixed(false)),
    namespace: "default".to_string(),
    external_tool: None,
  };

  let mut plan = bare_plan(vec![tool_change, downstream]);
  let result = exec.execute(&mut plan, false).await;

  assert_eq!(result.failure_count, 0, "{:?}", result.errors);
  assert_eq!(result.success_count, 2);

  let service = plan.changes[1]
    .fields
    .get("service")
    .and_then(|v| v.as_object())
    .unwrap();
  assert_eq!(
    service.get("id").and_then(|v| v.as_str()),
    Some("svc-1")
  );
  assert_eq!(
    service.get("control_plane_id").and_then(|v| v.as_str()),
    Some("cp-1")
  );
}

#[tokio::test]
async fn dry_run_reports_would_fail_without_mutating() {
  let client = Arc::new(FakeClient::default());
  client.seed(
    ResourceKind::Api,
    RemoteResource {
      id: "id-0".to_string(),
      name: "orders".to_string(),
      labels: managed_labels(true),
      raw: Default::default(),
    },
  );
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let mut change = api_create_change("c1", "api_orders", "orders-v2");
  change.action = Action::Update;
  change.resource_id = Some("id-0".to_string());
  change.protection = Some(Protection::Fixed(true));

  let mut plan = bare_plan(vec![change]);
  let result = exec.execute(&mut plan, true).await;

  assert_eq!(result.dry_run, true);
  assert_eq!(result.failure_count, 1);
  assert_eq!(result.validation_results.len(), 1);
  assert_eq!(
    result.validation_results[0].status,
    executor::ValidationStatus::WouldFail
  );

  let stored = client.resources.lock().await;
  let apis = stored.get(&ResourceKind::Api).unwrap();
  assert_eq!(apis[0].name, "orders", "dry run must not mutate state");
}

#[tokio::test]
async fn dry_run_surfaces_unresolvable_parent_as_validation_result() {
  let client = Arc::new(FakeClient::default());
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let version = PlannedChange {
    id: "c1".to_string(),
    action: Action::Create,
    resource_type: "api_version".to_string(),
    resource_ref: "api_orders_v1".to_string(),
    resource_id: None,
    fields: IndexMap::from([(
      "version".to_string(),
      serde_json::Value::String("v1".to_string()),
    )]),
    references: Default::default(),
    parent: Some(kongctl_client::entities::ParentRef {
      r#ref: Some("no_such_api".to_string()),
      id: None,
    }),
    depends_on: vec![],
    protection: Some(Protection::Fixed(false)),
    namespace: "default".to_string(),
    external_tool: None,
  };

  let mut plan = bare_plan(vec![version]);
  let result = exec.execute(&mut plan, true).await;

  assert_eq!(result.dry_run, true);
  assert_eq!(result.failure_count, 1);
  assert_eq!(
    result.validation_results.len(),
    1,
    "a pre-dispatch failure must still appear in validation_results under dry-run"
  );
  assert!(result.errors.is_empty());
  assert_eq!(
    result.validation_results[0].status,
    executor::ValidationStatus::WouldFail
  );
}

#[tokio::test]
async fn dry_run_predicts_not_supported_kind_as_would_fail() {
  let client = Arc::new(FakeClient::default());
  client.seed(
    ResourceKind::PortalSnippet,
    RemoteResource {
      id: "id-0".to_string(),
      name: "banner".to_string(),
      labels: managed_labels(false),
      raw: Default::default(),
    },
  );
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  let change = PlannedChange {
    id: "c1".to_string(),
    action: Action::Update,
    resource_type: "portal_snippet".to_string(),
    resource_ref: "snippet_banner".to_string(),
    resource_id: Some("id-0".to_string()),
    fields: IndexMap::from([(
      "content".to_string(),
      serde_json::Value::String("hi".to_string()),
    )]),
    references: Default::default(),
    parent: None,
    depends_on: vec![],
    protection: Some(Protection::Fixed(false)),
    namespace: "default".to_string(),
    external_tool: None,
  };

  let mut plan = bare_plan(vec![change]);
  let dry_result = exec.execute(&mut plan.clone(), true).await;
  assert_eq!(
    dry_result.validation_results[0].status,
    executor::ValidationStatus::WouldFail,
    "dry-run must predict the NotSupported failure a real run would hit"
  );

  let real_result = exec.execute(&mut plan, false).await;
  assert_eq!(real_result.failure_count, 1);
  assert!(
    real_result.errors[0].error.contains("not supported"),
    "{:?}",
    real_result.errors
  );
}

#[tokio::test]
async fn cancellation_skips_changes_not_yet_started() {
  let client = Arc::new(FakeClient::default());
  let exec = executor_with(client.clone(), Arc::new(FakeRunner { success: true }));

  exec.cancel_handle().cancel();

  let mut plan = bare_plan(vec![
    api_create_change("c1", "api_orders", "orders"),
    api_create_change("c2", "api_payments", "payments"),
  ]);
  let result = exec.execute(&mut plan, false).await;

  assert_eq!(result.success_count, 0);
  assert_eq!(result.failure_count, 0);
  assert_eq!(result.skipped_count, 2);
  assert_eq!(result.total(), 2);
  assert!(client.resources.lock().await.is_empty());
}
