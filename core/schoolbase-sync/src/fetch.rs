//! Bulk fetch: reads whole remote tables page by page.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{RemotePage, RemoteStore};
use futures::future::try_join_all;
use schoolbase_types::Record;
use std::future::Future;
use tracing::{debug, info};

/// Walks a table in `page_size` steps until every row has been read.
///
/// Stops when the accumulated count reaches the reported total, when a page
/// comes back short, or when a page is empty. Without a reported total only
/// the last two conditions apply. Any page error aborts the whole scan.
pub(crate) async fn paginate<T, F, Fut>(
    table: &str,
    page_size: usize,
    mut fetch: F,
) -> SyncResult<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = SyncResult<RemotePage<T>>>,
{
    let mut rows = Vec::new();
    let mut from = 0;

    loop {
        let page = fetch(from, page_size).await?;
        let received = page.rows.len();
        debug!("{}: page at {} returned {} rows", table, from, received);

        if received == 0 {
            break;
        }
        rows.extend(page.rows);

        let reached_total = page.total.is_some_and(|total| rows.len() >= total);
        if reached_total || received < page_size {
            break;
        }
        from += page_size;
    }

    Ok(rows)
}

/// Reads every row of `table`, ordered by id.
pub async fn fetch_collection(
    store: &dyn RemoteStore,
    table: &str,
    config: &SyncConfig,
) -> SyncResult<Vec<Record>> {
    config.validate()?;
    let rows = paginate(table, config.page_size, |from, limit| {
        store.fetch_page(table, from, limit)
    })
    .await?;
    info!("Fetched {} rows from {}", rows.len(), table);
    Ok(rows)
}

/// Reads every identifier of `table`.
pub async fn fetch_remote_ids(
    store: &dyn RemoteStore,
    table: &str,
    config: &SyncConfig,
) -> SyncResult<Vec<String>> {
    config.validate()?;
    paginate(table, config.page_size, |from, limit| {
        store.fetch_id_page(table, from, limit)
    })
    .await
}

/// Fetches several tables concurrently.
///
/// Resolves once all succeed, or with the first error.
pub async fn fetch_collections<'a>(
    store: &dyn RemoteStore,
    tables: impl IntoIterator<Item = &'a str>,
    config: &SyncConfig,
) -> SyncResult<Vec<(String, Vec<Record>)>> {
    try_join_all(tables.into_iter().map(|table| async move {
        let rows = fetch_collection(store, table, config).await?;
        Ok::<_, SyncError>((table.to_string(), rows))
    }))
    .await
}
