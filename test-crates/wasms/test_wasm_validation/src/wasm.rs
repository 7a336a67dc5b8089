use guestcall_guest::*;
use serde::Deserialize;
use serde::Serialize;
use std::net::Ipv4Addr;

const ILLEGAL_HOSTNAMES: [&str; 2] = ["localhost", "batman"];

#[derive(Serialize, Deserialize)]
pub struct CreateHostParams {
    pub hostname: String,
    pub ipv4: Ipv4Addr,
}

#[derive(Serialize)]
#[serde(tag = "type")]
pub enum ValidationResult<T> {
    Success { validated: T },
    Error { error: String, path: Option<String> },
}

impl CreateHostParams {
    /// json syntax errors have no meaningful path, data errors point at the offending field
    fn parse(bytes: &[u8]) -> Result<Self, ValidationResult<Self>> {
        let deserializer = &mut serde_json::Deserializer::from_slice(bytes);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            let path = match e.inner().classify() {
                serde_json::error::Category::Data | serde_json::error::Category::Io => {
                    Some(e.path().to_string())
                }
                serde_json::error::Category::Syntax | serde_json::error::Category::Eof => None,
            };
            ValidationResult::Error {
                error: e.to_string(),
                path,
            }
        })
    }

    fn validate(&self) -> Result<(), ValidationResult<Self>> {
        if ILLEGAL_HOSTNAMES.contains(&self.hostname.as_str()) {
            return Err(ValidationResult::Error {
                error: "illegal hostname".to_string(),
                path: Some("hostname".to_string()),
            });
        }
        if self.ipv4.is_loopback() || self.ipv4.is_broadcast() {
            return Err(ValidationResult::Error {
                error: "illegal ipv4 address".to_string(),
                path: Some("ipv4".to_string()),
            });
        }
        Ok(())
    }

    fn parse_and_validate(bytes: &[u8]) -> ValidationResult<Self> {
        match Self::parse(bytes) {
            Ok(validated) => match validated.validate() {
                Ok(()) => ValidationResult::Success { validated },
                Err(rejected) => rejected,
            },
            Err(rejected) => rejected,
        }
    }
}

fn parse_and_validate_json(input: &[u8]) -> Vec<u8> {
    let result = CreateHostParams::parse_and_validate(input);
    match serde_json::to_vec(&result) {
        Ok(bytes) => bytes,
        Err(e) => format!(r#"{{"type":"Error","error":"{e}","path":null}}"#).into_bytes(),
    }
}

guest_fn!(validate_create_host_params, parse_and_validate_json);
