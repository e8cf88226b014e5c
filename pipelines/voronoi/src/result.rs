//! 批处理结果.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// 单个文件的处理结果.
pub enum FileOutcome {
    /// 成功, 包含输出路径与耗时.
    Done { output: PathBuf, elapsed: Duration },

    /// 失败, 包含错误信息.
    Failed(String),
}

/// 将 `res` 的结果写进 `w` 中.
fn describe_into<W: Write>(res: &BatchResult, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    let done: Vec<_> = res
        .data
        .iter()
        .filter_map(|(_, o)| match o {
            FileOutcome::Done { elapsed, .. } => Some(*elapsed),
            FileOutcome::Failed(_) => None,
        })
        .collect();

    writeln!(w, "White matter Voronoi subparcellation:")?;
    writeln!(w, "{S4}Files found: {}", res.data.len())?;
    writeln!(w, "{S4}Subparcellated: {}", done.len())?;
    writeln!(w, "{S4}Failed: {}", res.data.len() - done.len())?;
    writeln!(w, "{S4}Total machine time: {} ms", res.elapsed.as_millis())?;
    match done.iter().max() {
        Some(d) => write!(w, "{S4}Most time-consuming file costs {} ms", d.as_millis())?,
        None => write!(w, "{S4}Most time-consuming file costs / ms")?,
    }

    for (path, o) in res.data.iter() {
        match o {
            FileOutcome::Done { output, elapsed } => write!(
                w,
                "\n{S4}`{}` -> `{}` ({} ms)",
                path.display(),
                output.display(),
                elapsed.as_millis()
            )?,
            FileOutcome::Failed(e) => write!(w, "\n{S4}`{}` failed: {e}", path.display())?,
        }
    }
    Ok(())
}

/// 将 `res` 的结果连同上下分隔线写进 `w` 中.
fn report_into<W: Write>(res: &BatchResult, w: &mut W) -> io::Result<()> {
    utils::sep_to(&mut *w)?;
    describe_into(res, w)?;
    writeln!(w)?;
    utils::sep_to(w)
}

/// 整个目录的处理结果.
pub struct BatchResult {
    data: Vec<(PathBuf, FileOutcome)>,
    elapsed: Duration,
}

impl BatchResult {
    /// 由每个文件的处理结果和总耗时创建.
    pub fn new(data: Vec<(PathBuf, FileOutcome)>, elapsed: Duration) -> Self {
        Self { data, elapsed }
    }

    /// 是否全部成功?
    pub fn is_success(&self) -> bool {
        self.data
            .iter()
            .all(|(_, o)| matches!(o, FileOutcome::Done { .. }))
    }

    /// 输出运行结果.
    pub fn analyze(&self) {
        let mut buf = Vec::with_capacity(512);
        match report_into(self, &mut buf) {
            Ok(()) => print!("{}", String::from_utf8_lossy(&buf)),
            Err(e) => eprintln!("{e}"),
        }
    }
}
