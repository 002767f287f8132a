// # Prompter Trait
//
// "Prompt for a named field, return what the user typed." Any implementation
// satisfies the Config Store: a terminal prompt, a dialog box, a re-read of
// another file. Retrying until a required field is non-empty is the store's
// job, not the prompter's.

use async_trait::async_trait;

use crate::config::ConfigField;

/// Interactive source of configuration values
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask for one field
    ///
    /// - `Ok(Some(answer))`: the user answered (possibly blank)
    /// - `Ok(None)`: the user dismissed the prompt
    /// - `Err(Error)`: no further input can be obtained
    async fn prompt(&self, field: ConfigField) -> Result<Option<String>, crate::Error>;
}
