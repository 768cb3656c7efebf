use eyre::{Result, WrapErr};
use std::path::PathBuf;

/// Writes `value` as pretty JSON, truncating any existing file
pub fn write<T>(json_path: &PathBuf, value: &T) -> Result<()>
where
    T: serde::Serialize,
{
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        // Add truncate or shorter content will leave a malformed file
        .truncate(true)
        .open(json_path)
        .wrap_err_with(|| format!("{:?}", json_path))?;
    serde_json::to_writer_pretty(&mut file, value)?;
    Ok(())
}
