//! File-level helpers shared by the strategies: concat lists, byte
//! concatenation and staged copies.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Quote a path for an ffmpeg concat list line.
///
/// ```
/// use segforge_av::assembly::concat::quote_list_path;
/// use std::path::Path;
///
/// assert_eq!(quote_list_path(Path::new("/s/a.ts")), "'/s/a.ts'");
/// assert_eq!(quote_list_path(Path::new("/s/it's.ts")), r"'/s/it'\''s.ts'");
/// ```
pub fn quote_list_path(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Absolute form of `path` without requiring it to exist.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    std::path::absolute(path)
}

/// Write a concat demuxer list.
///
/// Each input gets a `file` line with its absolute path. When
/// `frame_duration` is set every entry also gets a `duration` line, and the
/// last file is listed once more: the demuxer ignores the final `duration`.
pub fn write_list(list: &Path, inputs: &[PathBuf], frame_duration: Option<f64>) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(list)?);
    for input in inputs {
        writeln!(out, "file {}", quote_list_path(&absolute(input)?))?;
        if let Some(duration) = frame_duration {
            writeln!(out, "duration {duration}")?;
        }
    }
    if let (Some(_), Some(last)) = (frame_duration, inputs.last()) {
        writeln!(out, "file {}", quote_list_path(&absolute(last)?))?;
    }
    out.flush()
}

/// Append the bytes of every input to `target`, in order.
pub fn concatenate(inputs: &[PathBuf], target: &Path) -> io::Result<u64> {
    let mut out = BufWriter::new(File::create(target)?);
    let mut total = 0;
    for input in inputs {
        total += io::copy(&mut File::open(input)?, &mut out)?;
    }
    out.flush()?;
    Ok(total)
}

/// Build the `concat:` protocol input from absolute paths.
pub fn protocol_input(inputs: &[PathBuf]) -> io::Result<String> {
    let parts = inputs
        .iter()
        .map(|p| absolute(p).map(|a| a.to_string_lossy().to_string()))
        .collect::<io::Result<Vec<_>>>()?;
    Ok(format!("concat:{}", parts.join("|")))
}

/// Place `inputs` into `dir` as a contiguous numbered sequence.
///
/// `name_for` maps the position (starting at 0) to a file name. Hard links
/// are used where the filesystem allows, otherwise the file is copied.
pub fn stage_sequence(
    inputs: &[PathBuf],
    dir: &Path,
    name_for: impl Fn(usize) -> String,
) -> io::Result<()> {
    for (position, input) in inputs.iter().enumerate() {
        let staged = dir.join(name_for(position));
        if fs::hard_link(input, &staged).is_err() {
            fs::copy(input, &staged)?;
        }
        if position > 0 && position % 500 == 0 {
            tracing::debug!("staged {}/{} files", position, inputs.len());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(dir: &Path, bodies: &[&[u8]]) -> Vec<PathBuf> {
        bodies
            .iter()
            .enumerate()
            .map(|(i, body)| {
                let path = dir.join(format!("segment{i:04}.ts"));
                fs::write(&path, body).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn list_has_absolute_paths_and_durations() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(dir.path(), &[b"a", b"b"]);
        let list = dir.path().join("file_list.txt");

        write_list(&list, &files, Some(0.04)).unwrap();
        let text = fs::read_to_string(&list).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("file '/"));
        assert!(lines[0].ends_with("segment0000.ts'"));
        assert_eq!(lines[1], "duration 0.04");
        assert!(lines[2].ends_with("segment0001.ts'"));
        assert_eq!(lines[3], "duration 0.04");
        assert_eq!(lines[4], lines[2]);
    }

    #[test]
    fn list_without_duration() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(dir.path(), &[b"a"]);
        let list = dir.path().join("segment_list.txt");
        write_list(&list, &files, None).unwrap();
        assert_eq!(fs::read_to_string(&list).unwrap().lines().count(), 1);
    }

    #[test]
    fn concatenate_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(dir.path(), &[b"first-", b"second-", b"third"]);
        let target = dir.path().join("temp_concat.ts");

        let written = concatenate(&files, &target).unwrap();
        assert_eq!(written, 18);
        assert_eq!(fs::read(&target).unwrap(), b"first-second-third");
    }

    #[test]
    fn protocol_input_joins_with_pipes() {
        let dir = tempfile::tempdir().unwrap();
        let files = inputs(dir.path(), &[b"a", b"b"]);
        let input = protocol_input(&files).unwrap();
        assert!(input.starts_with("concat:/"));
        assert_eq!(input.matches('|').count(), 1);
    }

    #[test]
    fn staging_renumbers_from_zero() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let files = inputs(src.path(), &[b"x", b"y"]);

        stage_sequence(&files, dst.path(), |i| format!("frame{i:06}.jpg")).unwrap();
        assert_eq!(fs::read(dst.path().join("frame000000.jpg")).unwrap(), b"x");
        assert_eq!(fs::read(dst.path().join("frame000001.jpg")).unwrap(), b"y");
    }
}
