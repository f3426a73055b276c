use std::{
    env::{self, VarError},
    sync::OnceLock,
};

const VAR: &str = "HANDPOSE_PACKED_CONV";

static OVERRIDE: OnceLock<Option<bool>> = OnceLock::new();

/// Returns the packed convolution setting requested via `HANDPOSE_PACKED_CONV`, if any.
///
/// The variable is read once. Invalid values are logged and ignored.
///
/// Only networks reporting `supports_packed_convolution` are affected; the `tract`-based
/// [`OnnxLandmarkNetwork`](super::OnnxLandmarkNetwork) is not one of them.
pub(crate) fn packed_convolution_override() -> Option<bool> {
    *OVERRIDE.get_or_init(|| {
        let value = match env::var(VAR).as_deref() {
            Ok(value) => parse(value),
            Err(VarError::NotPresent) => return None,
            Err(VarError::NotUnicode(s)) => {
                log::warn!(
                    "ignoring invalid value set for `{VAR}` variable: {}",
                    s.to_string_lossy()
                );
                return None;
            }
        };
        match value {
            Some(enabled) => log::debug!("packed convolutions forced to {enabled} by `{VAR}`"),
            None => log::warn!("ignoring invalid value set for `{VAR}` variable"),
        }
        value
    })
}

fn parse(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "on" => Some(true),
        "0" | "false" | "off" => Some(false),
        _ => None,
    }
}
