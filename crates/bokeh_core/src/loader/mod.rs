//! Line-based loaders for the scene's text formats.
//!
//! All formats share the same lexical shape: `#` comment lines, blank
//! lines skipped, whitespace-separated tokens. Semantic problems are
//! configuration errors and surface as `LoadError`; the binary reports
//! them and exits.

mod mtl;
mod obj;

pub use mtl::load_mtl;
pub use obj::load_obj;

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{0}")]
    Mesh(#[from] crate::mesh::MeshError),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Read a whole file, wrapping IO failures with the path.
pub fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Per-line parse context: carries the file path and one-based line
/// number into error values.
#[derive(Clone, Copy)]
pub struct LineCtx<'a> {
    pub path: &'a Path,
    pub line: usize,
}

impl<'a> LineCtx<'a> {
    pub fn err(&self, message: impl Into<String>) -> LoadError {
        LoadError::Parse {
            path: self.path.to_path_buf(),
            line: self.line,
            message: message.into(),
        }
    }

    pub fn f32(&self, token: &str) -> LoadResult<f32> {
        token
            .parse::<f32>()
            .map_err(|_| self.err(format!("malformed number '{token}'")))
    }

    pub fn u32(&self, token: &str) -> LoadResult<u32> {
        token
            .parse::<u32>()
            .map_err(|_| self.err(format!("malformed integer '{token}'")))
    }

    pub fn vec3(&self, tokens: &[&str]) -> LoadResult<bokeh_math::Vec3> {
        if tokens.len() < 3 {
            return Err(self.err("expected three components"));
        }
        Ok(bokeh_math::Vec3::new(
            self.f32(tokens[0])?,
            self.f32(tokens[1])?,
            self.f32(tokens[2])?,
        ))
    }

    /// Require an exact token count after the directive name.
    pub fn arity(&self, directive: &str, tokens: &[&str], expected: usize) -> LoadResult<()> {
        if tokens.len() != expected {
            return Err(self.err(format!(
                "incorrect number of arguments for {directive}"
            )));
        }
        Ok(())
    }
}

/// Iterate a file's significant lines as (ctx, tokens) pairs.
pub fn significant_lines<'a>(
    path: &'a Path,
    content: &'a str,
) -> impl Iterator<Item = (LineCtx<'a>, Vec<&'a str>)> {
    content.lines().enumerate().filter_map(move |(i, raw)| {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let ctx = LineCtx { path, line: i + 1 };
        Some((ctx, line.split_whitespace().collect()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_significant_lines_skips_comments() {
        let content = "# header\n\n  a 1 2  \n#tail\nb 3\n";
        let path = Path::new("test.scn");
        let lines: Vec<_> = significant_lines(path, content).collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].1, vec!["a", "1", "2"]);
        assert_eq!(lines[0].0.line, 3);
        assert_eq!(lines[1].1, vec!["b", "3"]);
        assert_eq!(lines[1].0.line, 5);
    }

    #[test]
    fn test_malformed_number_reports_location() {
        let ctx = LineCtx {
            path: Path::new("x.mtl"),
            line: 4,
        };
        let err = ctx.f32("1.0.0").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("x.mtl:4"));
        assert!(msg.contains("1.0.0"));
    }
}
