pub mod allocate;
pub mod config_cmd;
pub mod select;
pub mod text;

use docpack_config::AppConfig;
use std::path::Path;

/// Load from an explicit path, or from the default location.
pub fn load_config(path: Option<&Path>) -> docpack_core::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

/// Read an input file, logging which one failed.
pub fn read_input(path: &Path) -> docpack_core::Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read input");
        e.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn bad_config_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "total_budget = \"lots\"").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, docpack_core::Error::Config { .. }));
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn out_of_range_fraction_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[allocation]\nexamples = 1.5").unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, docpack_core::Error::Config { ref message } if message.contains("allocation.examples")));
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_input(&dir.path().join("facts.json")).unwrap_err();
        assert!(matches!(err, docpack_core::Error::Io(_)));
    }

    #[test]
    fn input_is_read_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "def f():\n    pass\n").unwrap();
        assert_eq!(read_input(file.path()).unwrap(), "def f():\n    pass\n");
    }
}
