use tracing::{debug, info};

use super::{WarmupGuard, next_usable};
use crate::error::StreamFault;
use crate::filter::AttributeFilter;
use crate::system::process::EnrichedRecord;
use crate::system::source::{NameResolver, SnapshotSource};

/// Takes one usable snapshot, filters it and attaches exec names.
///
/// The warm-up snapshot is always discarded and nothing past the second
/// snapshot is requested. The session is closed before returning. Resolver
/// misses degrade to the resolver's fallback instead of failing the query.
pub async fn run<S, R>(
    source: &mut S,
    resolver: &mut R,
    filter: &AttributeFilter,
) -> Result<Vec<EnrichedRecord>, StreamFault>
where
    S: SnapshotSource,
    R: NameResolver,
{
    info!(source = %source.description(), filters = filter.pairs().len(), "single snapshot query");

    let snapshot = {
        let mut session = source.open().await?;
        let mut guard = WarmupGuard::new();
        next_usable(&mut session, &mut guard).await?
    };

    let total = snapshot.len();
    let result: Vec<EnrichedRecord> = snapshot
        .into_records()
        .into_iter()
        .filter(|record| filter.matches(record))
        .map(|record| {
            let exec_name = resolver.resolve(record.pid);
            EnrichedRecord { record, exec_name }
        })
        .collect();

    debug!(total, matched = result.len(), "single snapshot filtered");
    Ok(result)
}
