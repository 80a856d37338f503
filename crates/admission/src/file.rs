//! Filter definition files.
//!
//! One filter per line, whitespace-separated: `<channel> <min> <max>`.
//! Blank lines and lines starting with `#` are skipped. A line that does not
//! fit the format is skipped with a warning rather than aborting the load.

use std::fs;
use std::path::Path;

use tracing::warn;

use contracts::BridgeError;

use crate::{FilterSet, RangeFilter};

/// Load a filter set from `path`.
///
/// An unreadable file is fatal; unusable lines inside a readable file are
/// not.
pub fn load_filter_file(path: &Path) -> Result<FilterSet, BridgeError> {
    let content = fs::read_to_string(path).map_err(|e| BridgeError::ConfigParse {
        message: format!("could not read filter file '{}': {e}", path.display()),
        source: Some(Box::new(e)),
    })?;
    Ok(parse_filter_lines(&content))
}

/// Parse filter definitions from already-read content.
pub fn parse_filter_lines(content: &str) -> FilterSet {
    let mut set = FilterSet::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 3 {
            warn!(line, "skipping filter line with unrecognized format");
            continue;
        }
        let bounds = (tokens[1].parse::<f64>(), tokens[2].parse::<f64>());
        let (min_value, max_value) = match bounds {
            (Ok(min), Ok(max)) => (min, max),
            _ => {
                warn!(line, "skipping filter line with non-numeric bounds");
                continue;
            }
        };
        match RangeFilter::new(tokens[0], min_value, max_value) {
            Ok(filter) => set.push(filter),
            Err(e) => {
                warn!(line, error = %e, "skipping unusable filter line");
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_well_formed_lines() {
        let content = "\
# wind admission thresholds
speed 0.0 25.0

direction 0 360
";
        let set = parse_filter_lines(content);
        assert_eq!(set.len(), 2);
        assert_eq!(set.filters()[0].channel().as_str(), "speed");
        assert_eq!(set.filters()[1].max_value(), 360.0);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let content = "\
speed 0.0 25.0
only two
direction 0 north
humidity 0 NaN
pressure 900 1100 extra
";
        let set = parse_filter_lines(content);
        assert_eq!(set.len(), 1);
        assert_eq!(set.filters()[0].channel().as_str(), "speed");
    }

    #[test]
    fn test_reversed_bounds_in_file_are_swapped() {
        let set = parse_filter_lines("speed 25.0 0.0\n");
        assert_eq!(set.filters()[0].min_value(), 0.0);
        assert_eq!(set.filters()[0].max_value(), 25.0);
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# thresholds").unwrap();
        writeln!(file, "speed 0 25").unwrap();
        file.flush().unwrap();

        let set = load_filter_file(file.path()).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = load_filter_file(Path::new("/nonexistent/filters.txt"));
        assert!(result.is_err());
    }
}
