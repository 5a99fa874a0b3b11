use std::path::Path;

use serde::{Deserialize,Serialize};

use crate::error::{Error,Result};

pub const REFERENCE_FUSED_HASH : [u64;32] =
    [13,4,13,3,4,14,12,5,12,15,6,1,9,13,1,15,12,6,11,4,8,5,9,12,13,0,2,1,9,12,15,11];

pub const REFERENCE_STREAM_KEY : [u64;32] =
    [3,14,3,13,14,4,2,15,2,5,6,11,9,1,11,5,8,6,10,7,5,6,3,10,3,0,2,9,9,12,15,11];

pub const REFERENCE_NONCE : [u64;4] = [15,9,4,6];

/// Fused-output CSPRNG: seed, lcg and the first `hci` hash words are secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusedParams {
    pub width:usize,
    pub hci:usize,
    pub hc:usize,
    pub num_obs:usize,
    pub seed:u64,
    pub lcg:u64,
    pub hash:Vec<u64>
}

impl Default for FusedParams {
    fn default()->Self {
	FusedParams{
	    width:6,
	    hci:2,
	    hc:2,
	    num_obs:64,
	    seed:4,
	    lcg:5,
	    hash:REFERENCE_FUSED_HASH.to_vec()
	}
    }
}

/// Keyed stream cipher: seed and the first `hci` words of the hash array
/// are the key, lcg starts at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamParams {
    pub width:usize,
    pub hci:usize,
    pub hc:usize,
    pub fc:usize,
    pub num_obs:usize,
    pub seed:u64,
    pub hash:Vec<u64>,
    /// Nonce words, injected in order.  The nonce length is the length of
    /// this vector, so a shorter nonce is a truncated one.
    pub iv:Vec<u64>
}

impl Default for StreamParams {
    fn default()->Self {
	StreamParams{
	    width:6,
	    hci:2,
	    hc:16,
	    fc:15,
	    num_obs:16,
	    seed:4,
	    hash:REFERENCE_STREAM_KEY.to_vec(),
	    iv:REFERENCE_NONCE.to_vec()
	}
    }
}

fn check_common(width:usize,hci:usize,hc:usize,secrets:usize)->Result<()> {
    if width < 2 || width > 64 || width % 2 != 0 {
	return Err(Error::Config(format!("state width must be even and within 2..=64, got {}",width)));
    }
    if hc == 0 {
	return Err(Error::Config("hash array length must be positive".to_string()));
    }
    if hci > hc {
	return Err(Error::Config(format!("{} attacked hash elements exceed array length {}",hci,hc)));
    }
    if secrets < hci {
	return Err(Error::Config(format!("{} hash values given, {} needed",secrets,hci)));
    }
    Ok(())
}

impl FusedParams {
    pub fn validate(&self)->Result<()> {
	check_common(self.width,self.hci,self.hc,self.hash.len())
    }
}

impl StreamParams {
    pub fn validate(&self)->Result<()> {
	check_common(self.width,self.hci,self.hc,self.hash.len())
    }
}

pub fn load<T:serde::de::DeserializeOwned,P:AsRef<Path>>(path:P)->Result<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
	FusedParams::default().validate().unwrap();
	StreamParams::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_widths() {
	for w in [0,1,7,66] {
	    let p = FusedParams{ width:w,..FusedParams::default() };
	    assert!(matches!(p.validate(),Err(Error::Config(_))));
	}
    }

    #[test]
    fn rejects_bad_hash_layout() {
	let p = FusedParams{ hci:3,hc:2,..FusedParams::default() };
	assert!(p.validate().is_err());
	let p = StreamParams{ hc:0,hci:0,..StreamParams::default() };
	assert!(p.validate().is_err());
	let p = StreamParams{ hash:vec![1],..StreamParams::default() };
	assert!(p.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("fused.json");
	std::fs::write(&path,r#"{ "width": 8, "num_obs": 12 }"#).unwrap();
	let p:FusedParams = load(&path).unwrap();
	assert_eq!(p.width,8);
	assert_eq!(p.num_obs,12);
	assert_eq!(p.hci,2);
	assert_eq!(p.hash,REFERENCE_FUSED_HASH.to_vec());
    }

    #[test]
    fn malformed_file_is_an_error() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("bad.json");
	std::fs::write(&path,"{ width: }").unwrap();
	assert!(matches!(load::<StreamParams,_>(&path),Err(Error::Json(_))));
	assert!(matches!(load::<StreamParams,_>(dir.path().join("missing.json")),Err(Error::Io(_))));
    }
}
