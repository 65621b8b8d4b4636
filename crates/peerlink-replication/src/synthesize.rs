//! Discovery-chain sidecar-proxy synthesis
//!
//! An exported discovery chain has no instances of its own; traffic from the
//! remote peer reaches it through the local mesh gateways. For each gateway
//! instance the synthesizer fabricates a connect-proxy catalog record that
//! carries the chain's identity but the gateway's reachability.

use peerlink_model::{
    CheckServiceNode, ConnectProxyConfig, IndexedCheckServiceNodes, NodeService, ServiceKind,
    ServiceName,
};

use crate::flatten::flatten_checks;

/// Suffix for synthesized proxy service names.
///
/// Matches the sidecar-service naming convention used elsewhere in the mesh
/// so the synthesized entries cannot collide with real proxies.
pub const SYNTHETIC_PROXY_NAME_SUFFIX: &str = "-sidecar-proxy";

/// The synthetic proxy service name for a discovery chain.
pub fn proxy_name_for_discovery_chain(chain: &ServiceName) -> ServiceName {
    chain.with_name(format!("{}{}", chain.name, SYNTHETIC_PROXY_NAME_SUFFIX))
}

/// Build the synthetic proxy instance set for a discovery chain from the
/// current mesh-gateway instances.
///
/// Each gateway instance yields one connect-proxy record: the proxy's
/// destination is the chain, its address, tagged addresses, port, socket
/// path, and weights are copied verbatim from the gateway, and its health is
/// the gateway's flattened health. When a gateway instance carries its own
/// service ID the synthetic ID gains an ordinal suffix, so multiple gateways
/// on one node stay distinct.
pub fn create_disco_chain_health(
    chain: &ServiceName,
    gateways: &IndexedCheckServiceNodes,
) -> IndexedCheckServiceNodes {
    let proxy_name = format!("{}{}", chain.name, SYNTHETIC_PROXY_NAME_SUFFIX);

    let mut nodes = Vec::with_capacity(gateways.nodes.len());
    for (i, gateway) in gateways.nodes.iter().enumerate() {
        let proxy_id = if gateway.service.id.is_empty() {
            proxy_name.clone()
        } else {
            format!("{}-instance-{}", proxy_name, i)
        };

        let service = NodeService {
            kind: ServiceKind::ConnectProxy,
            id: proxy_id.clone(),
            service: proxy_name.clone(),
            namespace: chain.namespace.clone(),
            partition: chain.partition.clone(),
            address: gateway.service.address.clone(),
            port: gateway.service.port,
            socket_path: gateway.service.socket_path.clone(),
            tagged_addresses: gateway.service.tagged_addresses.clone(),
            weights: gateway.service.weights,
            connect: None,
            proxy: Some(ConnectProxyConfig {
                destination_service_name: chain.name.clone(),
                destination_service_id: chain.name.clone(),
            }),
        };

        nodes.push(CheckServiceNode {
            node: gateway.node.clone(),
            service,
            checks: flatten_checks(
                &gateway.node.node,
                &proxy_id,
                &proxy_name,
                &chain.namespace,
                &chain.partition,
                &gateway.checks,
            ),
        });
    }

    // Synthetic, not store-backed: the index stays zero.
    IndexedCheckServiceNodes { index: 0, nodes }
}
