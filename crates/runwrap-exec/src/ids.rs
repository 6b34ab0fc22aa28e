//! Pseudo-unique identifiers for sessions and workspaces.

use std::io;

use rand::TryRngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};

/// Sixteen random bytes rendered as five hyphen-separated hex groups (8-4-4-4-12).
///
/// # Errors
///
/// Returns [`PipelineError::Internal`] when the OS random source fails.
pub fn pseudo_uuid() -> PipelineResult<String> {
    let mut bytes = [0_u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| PipelineError::internal("generate id", io::Error::other(err.to_string())))?;
    Ok(format_groups(bytes))
}

fn format_groups(bytes: [u8; 16]) -> String {
    format!("{:X}", Uuid::from_bytes(bytes).hyphenated())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn groups_follow_uuid_layout() {
        let bytes: [u8; 16] = [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0xff,
        ];
        assert_eq!(format_groups(bytes), "00010203-0405-0607-0809-0A0B0C0D0EFF");
    }

    #[test]
    fn generated_ids_do_not_repeat() -> PipelineResult<()> {
        let mut seen = HashSet::new();
        for _ in 0..256 {
            let id = pseudo_uuid()?;
            assert_eq!(id.len(), 36);
            assert!(seen.insert(id));
        }
        Ok(())
    }
}
