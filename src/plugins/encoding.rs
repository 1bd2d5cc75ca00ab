//! Base64, hex and SHA-256

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::plugins::{eval_n, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::Value;

/// Text encodings and hashing over UTF-8 strings
pub struct EncodingPlugin;

impl Plugin for EncodingPlugin {
    fn name(&self) -> &str {
        "encoding"
    }

    fn description(&self) -> &str {
        "Base64 and hex encoding, SHA-256 digests"
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        registry.define("base64-encode", "encoding", Arity::Fixed(1), "Standard base64 of a string", |ev, args, env| {
            let [s] = eval_n::<1>("base64-encode", ev, args, env)?;
            Ok(Value::String(STANDARD.encode(s.as_str()?)))
        })?;
        registry.define("base64-decode", "encoding", Arity::Fixed(1), "Decode base64 back to a string", |ev, args, env| {
            let [s] = eval_n::<1>("base64-decode", ev, args, env)?;
            let bytes = STANDARD
                .decode(s.as_str()?)
                .map_err(|e| Error::ParseError(format!("Invalid base64: {}", e)))?;
            utf8("base64-decode", bytes)
        })?;
        registry.define("hex-encode", "encoding", Arity::Fixed(1), "Lowercase hex of a string's bytes", |ev, args, env| {
            let [s] = eval_n::<1>("hex-encode", ev, args, env)?;
            Ok(Value::String(hex::encode(s.as_str()?)))
        })?;
        registry.define("hex-decode", "encoding", Arity::Fixed(1), "Decode hex back to a string", |ev, args, env| {
            let [s] = eval_n::<1>("hex-decode", ev, args, env)?;
            let bytes = hex::decode(s.as_str()?)
                .map_err(|e| Error::ParseError(format!("Invalid hex: {}", e)))?;
            utf8("hex-decode", bytes)
        })?;
        registry.define("sha256", "encoding", Arity::Fixed(1), "SHA-256 digest of a string, as hex", |ev, args, env| {
            let [s] = eval_n::<1>("sha256", ev, args, env)?;
            let digest = Sha256::digest(s.as_str()?.as_bytes());
            Ok(Value::String(hex::encode(digest)))
        })?;
        Ok(())
    }
}

fn utf8(form: &str, bytes: Vec<u8>) -> Result<Value> {
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|_| Error::invalid_args(form, "decoded bytes are not valid UTF-8"))
}
