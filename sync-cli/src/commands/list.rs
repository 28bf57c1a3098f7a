//! Print local records.

use anyhow::Result;
use spendsync_client::EntityStore;
use spendsync_types::{Entity, EntityKind, EntityPayload};

use crate::engine::Engine;

/// Run the list command: one JSON record per line.
pub async fn run(engine: &Engine, kind: EntityKind) -> Result<()> {
    let records = engine
        .context
        .read_stores(|stores| match kind {
            EntityKind::User => payloads(&stores.users),
            EntityKind::Friend => payloads(&stores.friends),
            EntityKind::Transaction => payloads(&stores.transactions),
            EntityKind::Budget => payloads(&stores.budgets),
        })
        .await;

    for record in &records {
        println!("{}", record.to_json()?);
    }
    eprintln!("{} {} record(s)", records.len(), kind);
    Ok(())
}

fn payloads<E>(store: &EntityStore<E>) -> Vec<EntityPayload>
where
    E: Entity + Into<EntityPayload>,
{
    store.list().into_iter().cloned().map(Into::into).collect()
}
