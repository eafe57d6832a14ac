use super::timer::Stopwatch;
use super::Monitor;
use super::NodeState;
use crate::search::node::Node;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::PathBuf;

/// Tree-recording monitor. Writes the line-oriented tree-visualization
/// format, either with real-time stamps from a monotonic stopwatch
/// (optionally dilated) or as plain structure lines. The displayed
/// tree needs a single root, so a synthetic root with id 1 is written
/// first and real nodes take id `seq + 2`.
///
/// Recording is best-effort: an unusable file logs a warning and
/// disables the recorder while the search continues.
pub struct VbcMonitor {
    path: PathBuf,
    timing: bool,
    dilation: f64,
    out: Option<BufWriter<File>>,
    timer: Stopwatch,
    uncategorized: BTreeSet<usize>,
}

impl VbcMonitor {
    pub fn new(path: impl Into<PathBuf>, timing: bool, dilation: f64) -> Self {
        Self {
            path: path.into(),
            timing,
            dilation,
            out: None,
            timer: Stopwatch::new(),
            uncategorized: BTreeSet::new(),
        }
    }

    fn id(node: &Node) -> usize {
        node.seq() + 2
    }

    fn parent_id(node: &Node) -> usize {
        node.parent().map(|p| p.seq() + 2).unwrap_or(1)
    }

    fn clock(&self) -> String {
        let stamp = self.timer.secs() * self.dilation;
        let hours = (stamp / 3600.0).trunc() as u64;
        let minutes = ((stamp % 3600.0) / 60.0).trunc() as u64;
        let seconds = stamp % 60.0;
        format!("{:02}:{:02}:{:05.2}", hours, minutes, seconds)
    }

    /// run `write` against the open file, disabling the recorder on
    /// the first io failure.
    fn emit(&mut self, write: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>) {
        let Some(file) = self.out.as_mut() else { return };
        if let Err(err) = write(file) {
            log::warn!("tree recorder failed to write: {}, recording disabled", err);
            self.out = None;
        }
    }
}

impl Monitor for VbcMonitor {
    fn on_start_search(&mut self) {
        if self.path.extension().is_some_and(|ext| ext == "gz") {
            log::warn!("compressed tree output is not supported, writing plain text");
        }
        self.out = match File::create(&self.path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(err) => {
                log::warn!("tree recorder failed to open {:?}: {}", self.path, err);
                None
            }
        };
        let timing = self.timing;
        self.emit(|out| {
            writeln!(out, "#TYPE: COMPLETE TREE")?;
            writeln!(out, "#TIME: {}", if timing { "SET" } else { "NOT" })?;
            writeln!(out, "#BOUNDS: {}", if timing { "SET" } else { "NONE" })?;
            writeln!(out, "#INFORMATION: STANDARD")?;
            writeln!(out, "#NODE_NUMBER: NONE")?;
            if timing {
                writeln!(out, "00:00:00.00 N 0 1 {}", NodeState::Solved.color())?;
                writeln!(out, "00:00:00.00 I 1 \\ivirtual root node")?;
            } else {
                writeln!(out, "n 1 \\ivirtual root node")?;
            }
            Ok(())
        });
        if self.timing {
            self.timer.reset();
            self.timer.start();
        }
        self.uncategorized.clear();
    }

    fn on_create(&mut self, node: &Node) {
        let id = Self::id(node);
        let parent = Self::parent_id(node);
        let info = format!(
            "\\inode {}\\nlower bound: {}\\idepth:          {}\\nactive control: {}",
            node.seq(),
            node.lb(),
            node.depth(),
            node.b_active(),
        );
        if self.timing {
            let clock = self.clock();
            self.emit(|out| {
                writeln!(out, "{} N {} {} {}", clock, parent, id, NodeState::Active.color())?;
                writeln!(out, "{} I {} {}", clock, id, info)?;
                Ok(())
            });
        } else {
            self.emit(|out| {
                writeln!(out, "n {} {}", id, info)?;
                writeln!(out, "e {} {}", parent, id)?;
                Ok(())
            });
            if self.out.is_some() {
                self.uncategorized.insert(id);
            }
        }
    }

    fn on_select(&mut self, node: &Node) {
        self.on_change(node, NodeState::Selected);
    }

    fn on_change(&mut self, node: &Node, state: NodeState) {
        let id = Self::id(node);
        if self.timing {
            let clock = self.clock();
            let lb = node.lb();
            self.emit(|out| {
                writeln!(out, "{} P {} {}", clock, id, state.color())?;
                if let Some(message) = state.message() {
                    writeln!(out, "{} A {}\\i\\i\\n{}", clock, id, message)?;
                }
                if state == NodeState::Integer {
                    writeln!(out, "{} U {}", clock, lb)?;
                }
                out.flush()
            });
        } else if state.terminal() {
            self.emit(|out| writeln!(out, "c {} {}", id, state.color()));
            self.uncategorized.remove(&id);
        }
    }

    fn on_stop_search(&mut self) {
        self.timer.stop();
        if !self.timing && !self.uncategorized.is_empty() {
            let leftovers = std::mem::take(&mut self.uncategorized);
            self.emit(|out| {
                for id in leftovers {
                    writeln!(out, "c {} {}", id, NodeState::Active.color())?;
                }
                Ok(())
            });
        }
        self.uncategorized.clear();
        if let Some(mut out) = self.out.take() {
            let _ = out.flush();
        }
    }
}
