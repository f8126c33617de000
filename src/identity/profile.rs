use serde::{Deserialize, Serialize};

use super::content::Multihash;

/// Registry key under which profile hashes are stored
pub const REGISTRATION_IDENTIFIER: &str = "uPortProfileIPFS1220";

/// `0x`-prefixed hex of the registration identifier's ASCII bytes
pub fn registration_key() -> String {
    format!("0x{}", hex::encode(REGISTRATION_IDENTIFIER.as_bytes()))
}

/// Digest written on-chain: the content hash without its multihash prefix
pub fn registry_digest(hash: &Multihash) -> String {
    format!("0x{}", hex::encode(hash.digest()))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageObject {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    #[serde(rename = "contentURL")]
    pub content_url: String,
}

/// schema.org `Person` published for an identity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(rename = "@context", default)]
    pub context: String,
    #[serde(rename = "@type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    /// MNID of the identity proxy
    #[serde(default)]
    pub address: String,
    #[serde(rename = "publicKey", default)]
    pub public_key: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub image: Option<ImageObject>,
}

impl ProfileDocument {
    pub fn person(name: &str, identity_mnid: String, public_key: &str, network: &str, image: &Multihash) -> Self {
        Self {
            context: "http://schema.org".to_string(),
            kind: "Person".to_string(),
            name: name.to_string(),
            address: identity_mnid,
            public_key: public_key.to_string(),
            network: network.to_string(),
            image: Some(ImageObject {
                kind: "ImageObject".to_string(),
                name: "avatar".to_string(),
                content_url: format!("/ipfs/{}", image.to_base58()),
            }),
        }
    }
}
