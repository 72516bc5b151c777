use tracing::{debug, instrument, warn};

use crate::engine::DocumentEngine;
use crate::error::Error;
use crate::Position;

/// Result cap per query.
pub const RESULT_LIMIT: usize = 20;

/// A single query hit. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub position: Position,
    pub excerpt: String,
    pub substructure: usize,
}

/// Scans the document's substructures in document order and aggregates up to
/// [`RESULT_LIMIT`] results. A substructure that fails to load or scan
/// contributes zero results; partial results beat total failure.
#[instrument(skip(engine, query))]
pub async fn search(engine: &dyn DocumentEngine, query: &str) -> Vec<SearchResult> {
    let mut results = Vec::new();
    for index in 0..engine.substructure_count() {
        if results.len() >= RESULT_LIMIT {
            break;
        }
        match scan_substructure(engine, index, query).await {
            Ok(mut matches) => results.append(&mut matches),
            Err(err) => warn!(%err, index, "substructure scan failed"),
        }
    }
    results.truncate(RESULT_LIMIT);
    debug!(count = results.len(), "search finished");
    results
}

/// Runs one scoped load → scan → unload cycle. A substructure that was not
/// resident before the scan is unloaded on every exit path, including scan
/// failure, so a search never grows the engine's resident set.
async fn scan_substructure(
    engine: &dyn DocumentEngine,
    index: usize,
    query: &str,
) -> Result<Vec<SearchResult>, Error> {
    let was_resident = engine.is_substructure_loaded(index);
    if !was_resident {
        engine
            .load_substructure(index)
            .await
            .map_err(|err| Error::SearchScan {
                index,
                message: err.to_string(),
            })?;
    }

    let scan = engine.scan_substructure(index, query).await;

    if !was_resident {
        if let Err(err) = engine.unload_substructure(index).await {
            warn!(%err, index, "failed to unload substructure after scan");
        }
    }

    let matches = scan.map_err(|err| Error::SearchScan {
        index,
        message: err.to_string(),
    })?;
    Ok(matches
        .into_iter()
        .map(|hit| SearchResult {
            position: hit.cursor,
            excerpt: hit.excerpt,
            substructure: index,
        })
        .collect())
}
