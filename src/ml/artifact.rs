use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use strum::{Display, EnumString};
use tracing::{debug, info};
use uuid::Uuid;

/// Leading bytes of every artifact file
pub const ARTIFACT_MAGIC: &[u8; 4] = b"TPRA";

/// Current envelope layout
pub const FORMAT_VERSION: u32 = 1;

/// What an artifact file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactKind {
    PriorityPipeline,
    MaintenanceBundle,
    MaintenanceVectorizer,
    MaintenanceClassifier,
}

/// Metadata written in front of every payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub kind: ArtifactKind,
    pub model_name: String,

    /// Shared by every artifact of one training run
    pub run_id: Uuid,

    pub trained_at: DateTime<Utc>,

    /// Hex SHA-256 of the encoded payload
    pub checksum: String,
}

/// Identity of a training run, stamped on each artifact it writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub model_name: String,
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
}

impl RunInfo {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            run_id: Uuid::new_v4(),
            trained_at: Utc::now(),
        }
    }
}

fn checksum(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Encode `payload` with its header
pub fn encode<T: Serialize>(kind: ArtifactKind, run: &RunInfo, payload: &T) -> Result<Vec<u8>> {
    let body = bincode::serialize(payload)?;
    let header = ArtifactHeader {
        format_version: FORMAT_VERSION,
        kind,
        model_name: run.model_name.clone(),
        run_id: run.run_id,
        trained_at: run.trained_at,
        checksum: checksum(&body),
    };

    let mut out = Vec::with_capacity(ARTIFACT_MAGIC.len() + body.len() + 128);
    out.extend_from_slice(ARTIFACT_MAGIC);
    out.extend(bincode::serialize(&(header, body))?);
    Ok(out)
}

/// Decode an artifact of the expected kind, verifying magic, version and checksum
pub fn decode<T: DeserializeOwned>(bytes: &[u8], expected: ArtifactKind) -> Result<(ArtifactHeader, T)> {
    let rest = bytes
        .strip_prefix(ARTIFACT_MAGIC.as_slice())
        .ok_or_else(|| AppError::Artifact("not a ticket-priority artifact (bad magic)".to_string()))?;

    let (header, body): (ArtifactHeader, Vec<u8>) = bincode::deserialize(rest)
        .map_err(|e| AppError::Artifact(format!("corrupt artifact envelope: {}", e)))?;

    if header.format_version != FORMAT_VERSION {
        return Err(AppError::Artifact(format!(
            "unsupported artifact format version {} (expected {})",
            header.format_version, FORMAT_VERSION
        )));
    }
    if header.kind != expected {
        return Err(AppError::Artifact(format!(
            "expected a {} artifact, found {}",
            expected, header.kind
        )));
    }
    if checksum(&body) != header.checksum {
        return Err(AppError::Artifact("artifact checksum mismatch".to_string()));
    }

    let payload = bincode::deserialize(&body)
        .map_err(|e| AppError::Artifact(format!("corrupt {} payload: {}", header.kind, e)))?;
    Ok((header, payload))
}

/// Write an artifact, replacing any existing file
pub fn save<T: Serialize>(path: &Path, kind: ArtifactKind, run: &RunInfo, payload: &T) -> Result<()> {
    let bytes = encode(kind, run, payload)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)?;
    info!(
        path = %path.display(),
        %kind,
        run_id = %run.run_id,
        bytes = bytes.len(),
        "Artifact written"
    );
    Ok(())
}

/// Read an artifact of the expected kind
pub fn load<T: DeserializeOwned>(path: &Path, expected: ArtifactKind) -> Result<(ArtifactHeader, T)> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AppError::NotFound(format!("artifact {} does not exist; train the model first", path.display()))
        }
        _ => AppError::Io(e),
    })?;
    let (header, payload) = decode(&bytes, expected)?;
    debug!(
        path = %path.display(),
        kind = %header.kind,
        run_id = %header.run_id,
        model = %header.model_name,
        "Artifact loaded"
    );
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        weights: Vec<f64>,
        name: String,
    }

    fn payload() -> Payload {
        Payload {
            weights: vec![0.5, -1.25],
            name: "demo".to_string(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.bin");
        let run = RunInfo::new("tfidf_logreg_v1");

        save(&path, ArtifactKind::PriorityPipeline, &run, &payload()).unwrap();
        let (header, loaded): (_, Payload) = load(&path, ArtifactKind::PriorityPipeline).unwrap();

        assert_eq!(loaded, payload());
        assert_eq!(header.run_id, run.run_id);
        assert_eq!(header.model_name, "tfidf_logreg_v1");
        assert_eq!(header.format_version, FORMAT_VERSION);
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let run = RunInfo::new("m");
        let bytes = encode(ArtifactKind::MaintenanceVectorizer, &run, &payload()).unwrap();
        let err = decode::<Payload>(&bytes, ArtifactKind::MaintenanceClassifier).unwrap_err();
        assert!(matches!(err, AppError::Artifact(_)));
        assert!(err.to_string().contains("maintenance_classifier"));
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let err = decode::<Payload>(b"PK\x03\x04junk", ArtifactKind::PriorityPipeline).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_tampered_payload_fails_checksum() {
        let run = RunInfo::new("m");
        let mut bytes = encode(ArtifactKind::PriorityPipeline, &run, &payload()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let err = decode::<Payload>(&bytes, ArtifactKind::PriorityPipeline).unwrap_err();
        assert!(matches!(err, AppError::Artifact(_)));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load::<Payload>(Path::new("/nonexistent/model.bin"), ArtifactKind::PriorityPipeline)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ArtifactKind::MaintenanceBundle.to_string(), "maintenance_bundle");
        assert_eq!(
            "priority_pipeline".parse::<ArtifactKind>().unwrap(),
            ArtifactKind::PriorityPipeline
        );
    }
}
