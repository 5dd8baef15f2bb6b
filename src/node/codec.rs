//! Binary encoding of nodes
//!
//! Nodes are bincode-serialized inside a small versioned envelope. The
//! enum discriminant of [`Node`] selects the variant on decode.

use crate::error::{CoreError, Result};
use crate::node::Node;
use serde::{Deserialize, Serialize};

const NODE_FORMAT_VERSION: u16 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u16,
    node: &'a Node,
}

#[derive(Deserialize)]
struct Envelope {
    version: u16,
    node: Node,
}

pub fn encode(node: &Node) -> Result<Vec<u8>> {
    bincode::serialize(&EnvelopeRef {
        version: NODE_FORMAT_VERSION,
        node,
    })
    .map_err(|e| CoreError::bad_node(format!("failed to encode node: {}", e)))
}

pub fn decode(bytes: &[u8]) -> Result<Node> {
    let envelope: Envelope = bincode::deserialize(bytes)?;
    if envelope.version != NODE_FORMAT_VERSION {
        return Err(CoreError::bad_node(format!(
            "unsupported node format version {}",
            envelope.version
        )));
    }
    Ok(envelope.node)
}
