//! Application id validation.
//!
//! An app id names the directory under the config root, e.g. `mxm.datakraken`.
//! It is lowercase ASCII letters and digits, in segments separated by a
//! single `.`, `_` or `-`.

use crate::error::{ConfigError, Result};
use regex_lite::Regex;
use std::sync::LazyLock;

static APP_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+([._-][a-z0-9]+)*$").expect("app id pattern compiles"));

pub fn is_valid_app_id(app_id: &str) -> bool {
    APP_ID_RE.is_match(app_id)
}

pub fn validate_app_id(app_id: &str) -> Result<()> {
    if is_valid_app_id(app_id) {
        Ok(())
    } else {
        Err(ConfigError::InvalidAppId {
            app_id: app_id.to_string(),
        })
    }
}
