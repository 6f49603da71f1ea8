use std::collections::HashMap;

use rand::Rng;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use trawl_core::CrawlResult;

/// Route every frontier URL to exactly one worker, pinning each host to
/// the worker first drawn for it. Pinning keeps politeness state local to
/// one worker, with no cross-worker locking. When the frontier stream
/// ends, the worker senders are dropped, closing every input channel.
pub(crate) async fn distribute_urls(
    mut urls: mpsc::Receiver<Url>,
    inputs: Vec<mpsc::Sender<Url>>,
) {
    let mut host_to_worker: HashMap<String, usize> = HashMap::new();

    while let Some(url) = urls.recv().await {
        let host = url.host_str().unwrap_or_default().to_string();
        let index = match host_to_worker.get(&host) {
            Some(&index) => index,
            None => {
                let index = rand::thread_rng().gen_range(0..inputs.len());
                host_to_worker.insert(host, index);
                index
            }
        };
        if inputs[index].send(url).await.is_err() {
            warn!(worker = index, "worker input closed, dropping URL");
        }
    }
    debug!("frontier drained, closing worker inputs");
}

/// Fan the per-worker result streams into one. One forwarder task per
/// worker; the shared sender is dropped here, so the merged stream closes
/// once every worker stream has closed. Ordering is as-arrived only.
pub(crate) fn merge_results(
    worker_results: Vec<mpsc::Receiver<CrawlResult>>,
) -> mpsc::Receiver<CrawlResult> {
    let (tx, rx) = mpsc::channel(1);

    for (worker, mut results) in worker_results.into_iter().enumerate() {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(result) = results.recv().await {
                if tx.send(result).await.is_err() {
                    return;
                }
            }
            debug!(worker, "result stream finished");
        });
    }

    rx
}
