// HTTP Surface Tests
// Handlers are exercised directly against a shared node

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chainmesh::api::{add_peer, blocks, mine_block, peers, router};
use chainmesh::ledger::GENESIS_HASH;
use chainmesh::transport::TcpTransport;
use chainmesh::{Node, NodeConfig};
use std::sync::Arc;

fn test_config() -> NodeConfig {
    NodeConfig::new()
        .with_p2p_bind_address("127.0.0.1")
        .with_p2p_port(0)
        .with_connect_timeout_secs(2)
}

#[tokio::test]
async fn test_blocks_returns_chain() {
    let node = Node::new(test_config()).unwrap();

    let chain = blocks(State(Arc::clone(&node))).await.0;

    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].hash(), GENESIS_HASH);
}

#[tokio::test]
async fn test_mine_block_uses_raw_body_as_payload() {
    let node = Node::new(test_config()).unwrap();

    let block = mine_block(State(Arc::clone(&node)), "new-block".to_string())
        .await
        .unwrap()
        .0;

    assert_eq!(block.data(), "new-block");
    assert_eq!(node.latest().await, block);
}

#[tokio::test]
async fn test_add_peer_rejects_bad_address() {
    let node = Node::new(test_config()).unwrap();

    let err = add_peer(State(node), "no-port-here".to_string())
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_peer_unreachable_is_bad_gateway() {
    let node = Node::new(test_config()).unwrap();
    let port = {
        let t = TcpTransport::bind(test_config().transport()).await.unwrap();
        t.local_address().port()
    };

    let err = add_peer(State(node), format!("127.0.0.1:{}", port))
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_add_peer_connects_and_lists() {
    let remote = Node::new(test_config()).unwrap();
    let transport = TcpTransport::bind(remote.config().transport()).await.unwrap();
    let remote_addr = transport.local_address().to_string();
    tokio::spawn(Arc::clone(&remote).listen(transport));

    let node = Node::new(test_config()).unwrap();
    let added = add_peer(State(Arc::clone(&node)), remote_addr.clone())
        .await
        .unwrap()
        .0;

    assert_eq!(added.address, remote_addr);
    let listed = peers(State(node)).await.0;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].connection_id, added.connection_id);
}

#[test]
fn test_router_builds() {
    let node = Node::new(test_config()).unwrap();
    let _router = router(node);
}
