//! Provisioning against an embedded PostgreSQL cluster.
//!
//! Exercises the `postgres` adapter end to end: role and database creation,
//! password rotation, ownership repair, schema and search path handling, and
//! the status written by the reconciler. Set `SKIP_TEST_CLUSTER=1` to skip
//! when the cluster cannot start.

mod support;

use std::collections::BTreeMap;
use std::sync::Arc;

use operator::domain::ports::{CredentialStore, InformerCache};
use operator::domain::{
    Convergence, CredentialHolder, Password, ProvisionReport, ProvisioningState, ReconcileOutcome,
    Reconciler, ResourceKey, SqlProvisioner, TenantDescriptor, TenantProvisioner,
    TenantReconciler, TenantSpec, retarget_database,
};
use operator::outbound::informer::InMemoryInformerCache;
use operator::outbound::postgres::PostgresConnector;
use operator::outbound::status::InMemoryStatusStore;
use operator::settings::{OperatorSettings, ValidatedSettings};
use pg_embedded_setup_unpriv::TestCluster;
use postgres::{Client, Config, NoTls};
use rstest::rstest;
use uuid::Uuid;

use support::{format_postgres_error, handle_cluster_setup_failure};

struct LiveServer {
    admin_url: String,
    settings: ValidatedSettings,
    _cluster: TestCluster,
}

impl LiveServer {
    fn start() -> Option<Self> {
        let cluster = match support::pg_embed::test_cluster() {
            Ok(cluster) => cluster,
            Err(reason) => return handle_cluster_setup_failure(reason),
        };
        let admin_url = cluster.connection().database_url("postgres");
        let settings = OperatorSettings {
            host: None,
            grant_user_role_to_admin: true,
            admin_url: Some(admin_url.clone()),
            admin_username: None,
            admin_password: None,
            connect_timeout_secs: Some(10),
            max_concurrent_reconciles: None,
        }
        .validate()
        .expect("embedded cluster URL is valid");
        Some(Self {
            admin_url,
            settings,
            _cluster: cluster,
        })
    }

    fn provisioner(&self) -> SqlProvisioner<PostgresConnector> {
        SqlProvisioner::new(
            PostgresConnector::new(self.settings.connection.clone()),
            &self.settings.operator,
        )
    }

    fn admin(&self, database: &str) -> Client {
        Client::connect(&retarget_database(&self.admin_url, database), NoTls)
            .unwrap_or_else(|err| panic!("admin connect: {}", format_postgres_error(&err)))
    }

    fn login(&self, database: &str, user: &str, password: &str) -> Result<Client, String> {
        let mut config: Config = retarget_database(&self.admin_url, database)
            .parse()
            .map_err(|err: postgres::Error| err.to_string())?;
        config.user(user);
        config.password(password);
        config
            .connect(NoTls)
            .map_err(|err| format_postgres_error(&err))
    }
}

fn unique(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &suffix[..8])
}

fn tenant_spec(user: &str, database: &str) -> TenantSpec {
    TenantSpec {
        host: Some("postgresql".to_owned()),
        user: Some(user.to_owned()),
        name: Some(database.to_owned()),
        password_secrets: Some("tenant-db".to_owned()),
        password_key: Some("password".to_owned()),
        schema: Some(user.to_owned()),
        user_search_path: Some(format!("{user},public")),
        ..TenantSpec::default()
    }
}

fn database_owner(client: &mut Client, database: &str) -> String {
    client
        .query_one(
            "SELECT pg_catalog.pg_get_userbyid(datdba) FROM pg_catalog.pg_database WHERE datname = $1",
            &[&database],
        )
        .map(|row| row.get(0))
        .unwrap_or_else(|err| panic!("owner query: {}", format_postgres_error(&err)))
}

#[test]
fn fresh_tenant_is_created_and_reachable() {
    let Some(server) = LiveServer::start() else {
        return;
    };
    let (user, database) = (unique("tenant"), unique("db"));
    let spec = tenant_spec(&user, &database);

    let report = server
        .provisioner()
        .provision(&spec, &Password::new("first-pass"))
        .expect("provisioning succeeds");

    assert_eq!(
        report,
        ProvisionReport {
            role: Convergence::Created,
            database: Convergence::Created,
        }
    );
    let mut admin = server.admin("postgres");
    assert_eq!(database_owner(&mut admin, &database), user);
    let search_path: Option<Vec<String>> = admin
        .query_one(
            "SELECT rolconfig FROM pg_catalog.pg_roles WHERE rolname = $1",
            &[&user],
        )
        .map(|row| row.get(0))
        .expect("role config query");
    assert_eq!(
        search_path,
        Some(vec![format!("search_path={user}, public")])
    );

    let mut tenant = server
        .login(&database, &user, "first-pass")
        .expect("tenant can log in");
    let schema_owner: String = tenant
        .query_one(
            "SELECT nspowner::regrole::text FROM pg_catalog.pg_namespace WHERE nspname = $1",
            &[&user],
        )
        .map(|row| row.get(0))
        .expect("schema query");
    assert_eq!(schema_owner, user);
}

#[test]
fn reprovisioning_rotates_password_and_repairs_ownership() {
    let Some(server) = LiveServer::start() else {
        return;
    };
    let (user, database) = (unique("tenant"), unique("db"));
    let spec = tenant_spec(&user, &database);
    let provisioner = server.provisioner();
    provisioner
        .provision(&spec, &Password::new("first-pass"))
        .expect("first provisioning succeeds");

    let mut admin = server.admin("postgres");
    admin
        .batch_execute(&format!("ALTER DATABASE \"{database}\" OWNER TO CURRENT_USER"))
        .expect("ownership drift");

    let report = provisioner
        .provision(&spec, &Password::new("second-pass"))
        .expect("second provisioning succeeds");

    assert_eq!(
        report,
        ProvisionReport {
            role: Convergence::Updated,
            database: Convergence::Updated,
        }
    );
    assert_eq!(database_owner(&mut admin, &database), user);
    server
        .login(&database, &user, "second-pass")
        .expect("rotated password works");
    assert!(
        server.login(&database, &user, "first-pass").is_err(),
        "previous password must be rejected"
    );
}

#[test]
fn existing_nologin_role_is_made_able_to_log_in() {
    let Some(server) = LiveServer::start() else {
        return;
    };
    let (user, database) = (unique("tenant"), unique("db"));
    let mut admin = server.admin("postgres");
    admin
        .batch_execute(&format!("CREATE ROLE \"{user}\" NOLOGIN"))
        .expect("pre-existing role");

    let report = server
        .provisioner()
        .provision(&tenant_spec(&user, &database), &Password::new("login-pass"))
        .expect("provisioning succeeds");

    assert_eq!(report.role, Convergence::Updated);
    server
        .login(&database, &user, "login-pass")
        .expect("tenant can log in");
}

fn current_schema(client: &mut Client) -> String {
    client
        .query_one("SELECT current_schema()::text", &[])
        .map(|row| row.get(0))
        .unwrap_or_else(|err| panic!("current_schema query: {}", format_postgres_error(&err)))
}

#[rstest]
#[case::server_default(false)]
#[case::own_schema(true)]
fn tenant_lands_in_the_declared_schema(#[case] declare_own_schema: bool) {
    let Some(server) = LiveServer::start() else {
        return;
    };
    let (user, database) = (unique("tenant"), unique("db"));
    let mut spec = tenant_spec(&user, &database);
    spec.schema = declare_own_schema.then(|| user.clone());
    spec.user_search_path = None;

    server
        .provisioner()
        .provision(&spec, &Password::new("schema-pass"))
        .expect("provisioning succeeds");

    let mut tenant = server
        .login(&database, &user, "schema-pass")
        .expect("tenant can log in");
    let expected = if declare_own_schema { user.as_str() } else { "public" };
    assert_eq!(current_schema(&mut tenant), expected);
}

#[test]
fn reconciler_publishes_status_for_live_tenant() {
    let Some(server) = LiveServer::start() else {
        return;
    };
    let (user, database) = (unique("tenant"), unique("db"));
    let cache = Arc::new(InMemoryInformerCache::new());
    let status = Arc::new(InMemoryStatusStore::new());
    let reconciler = Reconciler::new(
        &server.settings.operator,
        Arc::new(server.provisioner()),
        Arc::clone(&cache),
        Arc::clone(&status),
    );
    let holder_key = ResourceKey::new("tenants", "tenant-db");
    cache
        .apply_credential(CredentialHolder::new(
            holder_key.clone(),
            BTreeMap::from([("password".to_owned(), "czNjcjN0".to_owned())]),
        ))
        .expect("holder cached");
    assert!(cache.credential(&holder_key).expect("read").is_some());

    let key = ResourceKey::new("tenants", "live");
    let mut spec = tenant_spec(&user, &database);
    spec.schema = None;
    spec.user_search_path = None;
    let descriptor = TenantDescriptor::new(key.clone(), spec).with_generation(7);

    let outcome = reconciler.reconcile(&descriptor).expect("reconcile returns");

    let written = match outcome {
        ReconcileOutcome::Succeeded(written) => written,
        other => panic!("expected success, got {other:?}"),
    };
    assert_eq!(written.status, ProvisioningState::Created);
    assert_eq!(written.url.as_deref(), Some(database.as_str()));
    assert_eq!(written.user.as_deref(), Some(user.as_str()));
    assert_eq!(written.observed_generation, Some(7));
    assert_eq!(status.latest(&key), Some(written));
    server
        .login(&database, &user, "s3cr3t")
        .expect("tenant can log in");
}

#[test]
fn server_errors_surface_in_the_status_message() {
    let Some(server) = LiveServer::start() else {
        return;
    };
    let (user, database) = (unique("tenant"), unique("db"));
    let cache = Arc::new(InMemoryInformerCache::new());
    let status = Arc::new(InMemoryStatusStore::new());
    let reconciler = Reconciler::new(
        &server.settings.operator,
        Arc::new(server.provisioner()),
        Arc::clone(&cache),
        Arc::clone(&status),
    );
    cache
        .apply_credential(CredentialHolder::new(
            ResourceKey::new("tenants", "tenant-db"),
            BTreeMap::from([("password".to_owned(), "czNjcjN0".to_owned())]),
        ))
        .expect("holder cached");
    let mut spec = tenant_spec(&user, &database);
    spec.schema = None;
    spec.user_search_path = Some("\"unterminated".to_owned());
    let descriptor = TenantDescriptor::new(ResourceKey::new("tenants", "broken"), spec);

    let outcome = reconciler.reconcile(&descriptor).expect("reconcile returns");

    let written = match outcome {
        ReconcileOutcome::Failed(written) => written,
        other => panic!("expected failure, got {other:?}"),
    };
    assert_eq!(written.status, ProvisioningState::Error);
    let message = written.message.expect("message present");
    assert!(message.starts_with("ERROR: "), "unexpected message {message}");

    let mut admin = server.admin("postgres");
    assert_eq!(database_owner(&mut admin, &database), user);
}
