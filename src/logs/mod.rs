//! Canonical shapes of the monitored event and of the sharing act.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jose::FlattenedJws;
use crate::{Error, Result};

/// Record of one access to an owner's personal data, created by the
/// monitoring tool that observed it.
///
/// Field order is the canonical serialization order; `timestamp` is epoch
/// seconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessLog {
    pub monitor: String,
    pub owner: String,
    pub tool: String,
    pub justification: String,
    pub timestamp: i64,
    pub access_kind: String,
    pub data_types: Vec<String>,
    pub id: String,
}

impl AccessLog {
    /// Creates a log entry stamped with the current time and a fresh id.
    pub fn new(
        monitor: &str,
        owner: &str,
        tool: &str,
        justification: &str,
        access_kind: &str,
        data_types: Vec<String>,
    ) -> Self {
        AccessLog {
            monitor: monitor.into(),
            owner: owner.into(),
            tool: tool.into(),
            justification: justification.into(),
            timestamp: chrono::Utc::now().timestamp(),
            access_kind: access_kind.into(),
            data_types,
            id: Uuid::new_v4().to_string(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedAccessLog(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let json = std::str::from_utf8(bytes)
            .map_err(|_| Error::MalformedAccessLog("payload is not UTF-8".into()))?;
        Self::from_json(json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::MalformedAccessLog(e.to_string()))
    }
}

/// Record of a sharing act: `creator` passes the signed log to
/// `recipients`. The embedded `log` stays in its transmitted JWS form so
/// the monitor's signature keeps covering the original bytes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SharedLog {
    pub log: FlattenedJws,
    pub creator: String,
    pub owner: String,
    pub recipients: Vec<String>,
    pub id: String,
}

impl SharedLog {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedSharedLog(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let json = std::str::from_utf8(bytes)
            .map_err(|_| Error::MalformedSharedLog("payload is not UTF-8".into()))?;
        Self::from_json(json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::MalformedSharedLog(e.to_string()))
    }
}

/// Claims duplicated into the JWE protected header, signed by the sharer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SharedHeader {
    pub id: String,
    pub owner: String,
    pub recipients: Vec<String>,
}

/// An AccessLog together with the JWS it was carried in.
///
/// Construction parses the payload once; it does not verify the signature,
/// since every construction site has already done so.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedLog {
    jws: FlattenedJws,
    log: AccessLog,
}

impl SignedLog {
    pub fn new(jws: FlattenedJws) -> Result<Self> {
        let log = AccessLog::from_bytes(&jws.payload_bytes().map_err(|e| match e {
            Error::MalformedData(message) => Error::MalformedAccessLog(message),
            other => other,
        })?)?;
        Ok(SignedLog { jws, log })
    }

    /// The embedded access log.
    pub fn extract(&self) -> AccessLog {
        self.log.clone()
    }

    /// The signed carrier token.
    pub fn jws(&self) -> &FlattenedJws {
        &self.jws
    }
}
