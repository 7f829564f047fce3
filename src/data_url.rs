use crate::error::{RedesignError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Strict `data:<mime>[;param]*;base64,<payload>` parser.
pub fn parse(value: &str) -> Result<DataUrl> {
    let rest = value
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| RedesignError::InvalidInput("Data URL must start with 'data:'".into()))?;

    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| RedesignError::InvalidInput("Data URL is missing the ',' separator".into()))?;

    let mut segments = meta.split(';');
    let mime_type = segments.next().unwrap_or("").trim();
    if mime_type.is_empty() || !mime_type.contains('/') {
        return Err(RedesignError::InvalidInput(
            "Data URL is missing a mime type".into(),
        ));
    }
    if !segments.any(|s| s.trim().eq_ignore_ascii_case("base64")) {
        return Err(RedesignError::InvalidInput(
            "Data URL is missing the ';base64' marker".into(),
        ));
    }

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(RedesignError::InvalidInput(
            "Data URL payload is empty".into(),
        ));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| RedesignError::InvalidInput(format!("Data URL payload is not base64: {}", e)))?;

    Ok(DataUrl {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_round_trip() {
        let samples: [&[u8]; 4] = [b"\x89PNG\r\n\x1a\n", b"x", &[0u8, 255, 128, 7, 3], b"room photo bytes"];
        for bytes in samples {
            let url = encode("image/png", bytes);
            let parsed = parse(&url).unwrap();
            assert_eq!(parsed.mime_type, "image/png");
            assert_eq!(parsed.bytes, bytes);
            assert_eq!(encode(&parsed.mime_type, &parsed.bytes), url);
        }
    }

    #[test]
    fn test_extra_parameters_allowed() {
        let parsed = parse("data:image/jpeg;name=room.jpg;base64,AAEC").unwrap();
        assert_eq!(parsed.mime_type, "image/jpeg");
        assert_eq!(parsed.bytes, vec![0, 1, 2]);
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in [
            "data:image/png;base64AAEC",
            "data:image/png,AAEC",
            "image/png;base64,AAEC",
            "data:;base64,AAEC",
            "data:image/png;base64,",
            "data:image/png;base64,@@@",
        ] {
            let err = parse(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "accepted {:?}", bad);
        }
    }
}
