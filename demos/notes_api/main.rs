//! Notes API Example
//!
//! Exposes the `note`, `todo` and `group` entity types declared in
//! `rest.yaml`, stored in memory, with two demo bearer tokens:
//! - `manager-token`: may manage groups and save notes
//! - `viewer-token`: may view groups and notes
//!
//! ```text
//! curl -X POST localhost:3000/todo -d '{"name":"Write docs","kind":"chore"}'
//! curl localhost:3000/todo?graph=basic
//! curl -H 'Authorization: Bearer manager-token' -X POST localhost:3000/group -d '{"name":"Ops"}'
//! ```

use graph_rest::prelude::*;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = include_str!("rest.yaml");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,graph_rest=debug")),
        )
        .init();

    let config = RestConfig::from_yaml_str(CONFIG)?;

    let auth = TokenAuthProvider::new()
        .with_token(
            "manager-token",
            Principal::new("manager", ["manage_groups", "save_notes"]),
        )
        .with_token(
            "viewer-token",
            Principal::new("viewer", ["view_groups", "view_notes"]),
        );

    let builder = ServerBuilder::new()
        .with_config(config)?
        .with_hooks("group", |hooks| {
            hooks.on_set("name", |_, value, changes| {
                let name = value.as_str().map(str::trim).unwrap_or_default();
                if name.is_empty() {
                    return Err("group name may not be blank".to_string());
                }
                changes.set("name", json!(name));
                Ok(())
            });
            hooks.on_get("label", |record| {
                let name = record.value("name").unwrap_or(Value::Null);
                let kind = record.value("kind").unwrap_or(Value::Null);
                json!(format!(
                    "{} ({})",
                    name.as_str().unwrap_or_default(),
                    kind.as_str().unwrap_or_default()
                ))
            });
        })?
        .with_auth_provider(auth);

    println!("🚀 Starting notes API");
    println!("\n🌐 Server running on http://127.0.0.1:3000");
    println!("\n📚 Routes:");
    println!("    GET    /health                  - Health check");
    println!("    GET    /{{type}}                  - List (graph, sort, size, start, filters)");
    println!("    POST   /{{type}}                  - Create");
    println!("    GET    /{{type}}/{{key}}            - Get");
    println!("    PUT    /{{type}}/{{key}}            - Update (json fields deep-merge)");
    println!("    DELETE /{{type}}/{{key}}            - Delete (group only)");

    builder.serve("127.0.0.1:3000").await
}
