/*!
 * permcheck - Permission Check CLI
 *
 * Resolves one permission check against a directory snapshot and prints the
 * decision as JSON. Exit status is 0 when allowed, 1 when denied.
 *
 * Usage:
 *   permcheck <actor-id> <resource> <action> [record-json]
 *
 * Environment variables:
 * - PERMISSIONS_CONFIG: Path to configuration JSON
 * - PERMISSIONS_DIRECTORY: Path to actors/overrides snapshot JSON
 * - PERMISSIONS_AUDIT_LOG: Append audit events to this file (default: log them)
 */

use anyhow::{bail, Context};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use portal_permissions::{
    init_tracing, AuditSink, DirectorySnapshot, InMemoryDirectory, JsonLinesSink,
    PermissionChecker, PermissionManager, PermissionRequest, PermissionsConfig, StaticSession,
    TracingSink,
};

struct Args {
    actor_id: String,
    resource: String,
    action: String,
    record: Option<serde_json::Value>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let (Some(actor_id), Some(resource), Some(action)) = (args.next(), args.next(), args.next())
    else {
        bail!("usage: permcheck <actor-id> <resource> <action> [record-json]");
    };
    let record = args
        .next()
        .map(|raw| serde_json::from_str(&raw).context("record must be a JSON object"))
        .transpose()?;

    Ok(Args {
        actor_id,
        resource,
        action,
        record,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let args = parse_args()?;
    let config = PermissionsConfig::from_env().context("invalid permissions configuration")?;

    let directory = match std::env::var("PERMISSIONS_DIRECTORY") {
        Ok(path) => {
            info!(path = %path, "Loading directory snapshot");
            InMemoryDirectory::from(
                DirectorySnapshot::load(&path)
                    .await
                    .with_context(|| format!("failed to load directory snapshot {path}"))?,
            )
        }
        Err(_) => InMemoryDirectory::new(),
    };
    let directory = Arc::new(directory);

    let sink: Arc<dyn AuditSink> = match std::env::var("PERMISSIONS_AUDIT_LOG") {
        Ok(path) => Arc::new(
            JsonLinesSink::open(&path)
                .await
                .with_context(|| format!("failed to open audit log {path}"))?,
        ),
        Err(_) => Arc::new(TracingSink),
    };

    let manager = PermissionManager::from_config(
        &config,
        directory.clone(),
        directory,
        Arc::new(StaticSession::new()),
        sink,
    );

    let mut request = PermissionRequest::new(args.actor_id, args.resource, args.action);
    if let Some(record) = &args.record {
        request = request.with_record(record);
    }

    let response = manager.check_request(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    manager.shutdown().await;

    Ok(if response.is_allowed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
