// tests/node_network.rs
// Two running nodes on an in-process gossip network converge on one chain
// and one ledger.

mod common;

use helix_core::blockchain::load_chain;
use helix_core::{GossipNode, HelixConfig, HelixNode, LocalGossipNetwork};
use std::path::Path;
use std::time::Duration;
use tokio::sync::oneshot;

fn config(dir: &Path, id: &str, mining_attempts: u64) -> HelixConfig {
    HelixConfig {
        node_id: id.to_string(),
        microblock_size: 2,
        mining_attempts,
        sweep_interval_ms: 10,
        data_dir: dir.join(id),
        ..HelixConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn miner_finalizes_and_observer_adopts() {
    let dir = tempfile::tempdir().unwrap();
    let net = LocalGossipNetwork::new();

    let cfg_a = config(dir.path(), "miner", 100_000);
    let cfg_b = config(dir.path(), "observer", 0);
    let mut a = HelixNode::open(cfg_a.clone(), GossipNode::join_local("miner", &net, cfg_a.seen_ttl())).unwrap();
    let b = HelixNode::open(cfg_b.clone(), GossipNode::join_local("observer", &net, cfg_b.seen_ttl())).unwrap();

    let statement = common::compressible_statement(2);
    let statement_id = a.create_statement(&statement, None).unwrap();

    let (stop_a, rx_a) = oneshot::channel::<()>();
    let (stop_b, rx_b) = oneshot::channel::<()>();
    let task_a = tokio::spawn(a.run(async move {
        let _ = rx_a.await;
    }));
    let task_b = tokio::spawn(b.run(async move {
        let _ = rx_b.await;
    }));

    let chain_path = cfg_b.chain_path();
    let mut adopted = false;
    for _ in 0..500 {
        if load_chain(&chain_path).map(|c| c.len() == 1).unwrap_or(false) {
            adopted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(adopted, "observer never adopted the miner's block");

    stop_a.send(()).unwrap();
    stop_b.send(()).unwrap();
    let a = task_a.await.unwrap().unwrap();
    let b = task_b.await.unwrap().unwrap();

    assert_eq!(a.chain(), b.chain());
    assert_eq!(a.chain()[0].finalizer, "miner");
    assert!(b.event(&statement_id).unwrap().is_finalized());
    assert_eq!(a.ledger().total_supply(), b.ledger().total_supply());
    assert_eq!(a.ledger().balances(), b.ledger().balances());
    assert_eq!(b.ledger().balance("miner"), 2.0);
    assert!(b.gossip().known_peers().contains(&"miner".to_string()));
}
