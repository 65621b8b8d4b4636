//! Connect-reference scrubbing for replicated instance lists

use peerlink_model::{IndexedCheckServiceNodes, ServiceKind};

use crate::synthesize::SYNTHETIC_PROXY_NAME_SUFFIX;

/// Strip connect/proxy material from a replicated instance set.
///
/// Removes instances whose kind is not typical (proxies and gateways are
/// never replicated directly) and instances whose name carries the synthetic
/// sidecar-proxy suffix, so they cannot collide with the entries the
/// synthesizer generates. Surviving instances have any native-connect or
/// proxy configuration stripped; replicated plain services must not appear
/// connect-enabled on the consuming side.
pub fn filter_connect_references(csn: &mut IndexedCheckServiceNodes) {
    csn.nodes.retain(|instance| {
        instance.service.kind == ServiceKind::Typical
            && !instance
                .service
                .service
                .ends_with(SYNTHETIC_PROXY_NAME_SUFFIX)
    });

    for instance in &mut csn.nodes {
        if instance.service.has_connect_references() {
            instance.service.connect = None;
            instance.service.proxy = None;
        }
    }
}
