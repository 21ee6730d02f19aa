//! Driving a stand-alone solver executable: serialize the clause
//! stream as DIMACS, hand it to a subprocess, read the result file
//! back.  MiniSat and its many descendants all speak this protocol
//! and signal their verdict in the exit status (10 for SAT, 20 for
//! UNSAT).
//!
//! The subprocess and its scratch files are scoped resources: the
//! child handle lives in a guard that kills and reaps it on every
//! exit path, and the temporary input/output files are deleted when
//! the guard goes out of scope, whether the solve succeeded, failed,
//! or panicked.  No global process-exit hook is involved.
//!
//! There is also no timeout: a hung solver blocks the caller.  Callers
//! that cannot tolerate that should wrap the solve in their own
//! supervision.
use super::dimacs::ClauseBuffer;
use super::solver::Solver;
use super::solver::SolverStats;
use super::Literal;
use super::SolverError;
use super::TRUE;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;

/// Exit statuses in the MiniSat convention.
const EXIT_SAT: i32 = 10;
const EXIT_UNSAT: i32 = 20;

/// How to invoke the external executable.
#[derive(Clone, Debug)]
pub struct ExternalConfig {
    program: String,
    flags: Vec<String>,
    log_base: Option<PathBuf>,
}

impl ExternalConfig {
    /// Configuration for `program` with no flags.
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.into(),
            flags: Vec::new(),
            log_base: None,
        }
    }

    /// The stock MiniSat invocation.  Preprocessing is disabled by
    /// default: it rarely pays off on the highly regular instances we
    /// generate, and it renders the model unusable for decoding
    /// eliminated variables.
    #[must_use]
    pub fn minisat() -> Self {
        Self::new("minisat").flag("-no-pre")
    }

    /// Appends one command-line flag, passed to the child verbatim.
    #[must_use]
    pub fn flag(mut self, flag: &str) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Switches from ephemeral scratch files to persistent,
    /// timestamped `<base>-<stamp>.cnf` / `.out` pairs, for debugging
    /// solver behaviour after the fact.
    #[must_use]
    pub fn log_to(mut self, base: PathBuf) -> Self {
        self.log_base = Some(base);
        self
    }
}

/// A `Solver` backed by a subprocess speaking DIMACS.
pub struct ExternalSolver {
    config: ExternalConfig,
    clauses: ClauseBuffer,
    variables: u64,
    stats: SolverStats,
    model: Option<Vec<bool>>,
}

impl ExternalSolver {
    #[must_use]
    pub fn new(config: ExternalConfig) -> Self {
        let mut ret = Self {
            config,
            clauses: ClauseBuffer::new(),
            variables: 0,
            stats: SolverStats::default(),
            model: None,
        };

        ret.bootstrap();
        ret
    }

    /// Allocates variable 1 and pins it true.
    fn bootstrap(&mut self) {
        let t = self.add_variable();
        assert_eq!(t, TRUE);
        self.add_clause(&[TRUE]);
    }

    /// Picks the input/output file pair for one solve call.
    fn scratch_files(&self) -> Result<SolveFiles, SolverError> {
        match &self.config.log_base {
            None => {
                let input = tempfile::Builder::new()
                    .prefix("satlink-")
                    .suffix(".cnf")
                    .tempfile()?;
                let output = tempfile::Builder::new()
                    .prefix("satlink-")
                    .suffix(".out")
                    .tempfile()?;
                Ok(SolveFiles::Scratch { input, output })
            }
            Some(base) => {
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or(0);
                let solves = self.stats.total_solves + self.stats.session_solves;
                let name = |ext: &str| {
                    PathBuf::from(format!("{}-{}-{}.{}", base.display(), stamp, solves, ext))
                };
                Ok(SolveFiles::Logged {
                    input: name("cnf"),
                    output: name("out"),
                })
            }
        }
    }

    /// Runs the child over `input`/`output` and returns its exit
    /// status, having drained its stdout.
    fn run_child(&self, input: &Path, output: &Path) -> Result<ExitStatus, SolverError> {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.flags)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        log::debug!("external solve: {:?}", command);

        let child = command.spawn().map_err(|source| SolverError::Spawn {
            program: self.config.program.clone(),
            source,
        })?;
        let mut guard = ChildGuard::new(child);

        // Solvers chatter statistics on stdout; drain it so a large
        // report cannot fill the pipe and deadlock the child.
        let mut chatter = String::new();
        if let Some(mut stdout) = guard.stdout() {
            stdout.read_to_string(&mut chatter)?;
        }
        let status = guard.wait()?;
        log::debug!(
            "external solver exited with {:?} after {} bytes of output",
            status.code(),
            chatter.len()
        );
        Ok(status)
    }
}

impl Solver for ExternalSolver {
    fn name(&self) -> &'static str {
        "external"
    }

    fn add_variable(&mut self) -> Literal {
        self.variables += 1;
        self.stats.session_variables += 1;
        self.variables as Literal
    }

    fn add_clause(&mut self, literals: &[Literal]) {
        debug_assert!(literals
            .iter()
            .all(|&lit| lit != 0 && (lit.abs() as u64) <= self.variables));
        self.clauses.push(literals);
        self.stats.session_clauses += 1;
    }

    fn solve(&mut self) -> Result<bool, SolverError> {
        self.stats.session_solves += 1;
        self.model = None;

        let files = self.scratch_files()?;
        {
            let mut writer = BufWriter::new(std::fs::File::create(files.input_path())?);
            self.clauses.write_dimacs(self.variables, &mut writer)?;
            writer.flush()?;
        }

        let status = self.run_child(files.input_path(), files.output_path())?;
        let code = status.code();
        if code != Some(EXIT_SAT) && code != Some(EXIT_UNSAT) {
            return Err(SolverError::UnexpectedExit {
                program: self.config.program.clone(),
                status: code,
            });
        }

        let text = std::fs::read_to_string(files.output_path())?;
        let model = parse_result(&text, self.variables)?;
        if model.is_some() != (code == Some(EXIT_SAT)) {
            return Err(SolverError::MalformedResult(
                "result header disagrees with exit status",
            ));
        }

        self.model = model;
        Ok(self.model.is_some())
    }

    fn value(&self, literal: Literal) -> bool {
        let model = self
            .model
            .as_ref()
            .expect("value() before a satisfying solve()");
        let index = (literal.abs() - 1) as usize;
        model[index] == (literal > 0)
    }

    fn stats(&self) -> SolverStats {
        self.stats
    }

    fn clear(&mut self) {
        self.stats.roll_over();
        self.clauses.clear();
        self.variables = 0;
        self.model = None;
        self.bootstrap();
    }
}

/// The input/output pair for one solve.  Scratch files delete
/// themselves on drop; logged files persist for inspection.
enum SolveFiles {
    Scratch {
        input: tempfile::NamedTempFile,
        output: tempfile::NamedTempFile,
    },
    Logged {
        input: PathBuf,
        output: PathBuf,
    },
}

impl SolveFiles {
    fn input_path(&self) -> &Path {
        match self {
            SolveFiles::Scratch { input, .. } => input.path(),
            SolveFiles::Logged { input, .. } => input,
        }
    }

    fn output_path(&self) -> &Path {
        match self {
            SolveFiles::Scratch { output, .. } => output.path(),
            SolveFiles::Logged { output, .. } => output,
        }
    }
}

/// Owns the child process and guarantees it is reaped: on a normal
/// path via `wait`, on any abnormal path by kill-then-wait in `Drop`.
struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    fn stdout(&mut self) -> Option<impl Read + '_> {
        self.child
            .as_mut()
            .and_then(|child| child.stdout.as_mut())
    }

    fn wait(mut self) -> std::io::Result<ExitStatus> {
        let mut child = self.child.take().expect("guard waited twice");
        child.wait()
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Parses a solver result file: a `SAT`/`UNSAT` header, then (if SAT)
/// the assignment of every variable as signed literals terminated by
/// `0`.  Returns the model indexed by variable, or `None` for UNSAT.
fn parse_result(text: &str, variables: u64) -> Result<Option<Vec<bool>>, SolverError> {
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or(SolverError::MalformedResult("empty result file"))?;

    match header.trim() {
        "UNSAT" => Ok(None),
        "SAT" => {
            let mut model = vec![false; variables as usize];
            let mut assigned = vec![false; variables as usize];
            let mut terminated = false;

            for token in lines.flat_map(str::split_whitespace) {
                let lit: Literal = token
                    .parse()
                    .map_err(|_| SolverError::MalformedResult("malformed literal"))?;
                if lit == 0 {
                    terminated = true;
                    break;
                }

                let var = (lit as i64).abs() as u64;
                if var < 1 || var > variables {
                    return Err(SolverError::VariableOutOfRange(lit, variables));
                }
                model[(var - 1) as usize] = lit > 0;
                assigned[(var - 1) as usize] = true;
            }

            if !terminated {
                return Err(SolverError::MalformedResult("missing 0 terminator"));
            }
            if assigned.iter().any(|seen| !seen) {
                return Err(SolverError::MalformedResult(
                    "assignment does not cover every variable",
                ));
            }
            Ok(Some(model))
        }
        _ => Err(SolverError::MalformedResult("unrecognized result header")),
    }
}

#[test]
fn test_parse_result_sat() {
    // A well-formed SAT result decodes per literal sign.
    let model = parse_result("SAT\n1 -2 3 0\n", 3).expect("ok").expect("sat");
    assert_eq!(model, vec![true, false, true]);
}

#[test]
fn test_parse_result_unsat() {
    assert!(parse_result("UNSAT\n", 3).expect("ok").is_none());
}

#[test]
fn test_parse_result_garbled() {
    // Bad header, bad literal, missing sentinel, out-of-range
    // variable, and partial assignments are all fatal.
    assert!(parse_result("", 1).is_err());
    assert!(parse_result("MAYBE\n", 1).is_err());
    assert!(parse_result("SAT\n1 x 0\n", 2).is_err());
    assert!(parse_result("SAT\n1 -2 3\n", 3).is_err());
    assert!(parse_result("SAT\n1 -4 0\n", 3).is_err());
    assert!(parse_result("SAT\n1 0\n", 2).is_err());
}

#[cfg(test)]
#[cfg(unix)]
fn stub_solver(script: &str) -> ExternalSolver {
    // `sh -c <script> <input> <output>` binds the input file to $0 and
    // the output file to $1.
    ExternalSolver::new(ExternalConfig::new("sh").flag("-c").flag(script))
}

#[test]
#[cfg(unix)]
fn test_stub_sat() {
    // A stub solver claims SAT; the model decodes against both
    // polarities, and variable 1 is the pinned true variable.
    let mut solver = stub_solver(r#"printf 'SAT\n1 -2 3 0\n' > "$1"; exit 10"#);

    let a = solver.add_variable();
    let b = solver.add_variable();
    solver.add_clause(&[a, b]);

    assert!(solver.solve().expect("ok"));
    assert!(solver.value(TRUE));
    assert!(!solver.value(a));
    assert!(solver.value(-a));
    assert!(solver.value(b));
}

#[test]
#[cfg(unix)]
fn test_stub_unsat() {
    let mut solver = stub_solver(r#"printf 'UNSAT\n' > "$1"; exit 20"#);

    solver.add_clause(&[-TRUE]);
    assert!(!solver.solve().expect("ok"));
}

#[test]
#[cfg(unix)]
fn test_stub_bad_exit() {
    // Exit status 0 is not a verdict.
    let mut solver = stub_solver(r#"printf 'SAT\n1 0\n' > "$1"; exit 0"#);

    match solver.solve() {
        Err(SolverError::UnexpectedExit { status, .. }) => assert_eq!(status, Some(0)),
        other => panic!("expected UnexpectedExit, got {:?}", other.map(|_| ())),
    }
}

#[test]
#[cfg(unix)]
fn test_stub_header_mismatch() {
    // Exit status says SAT, file says UNSAT: fatal.
    let mut solver = stub_solver(r#"printf 'UNSAT\n' > "$1"; exit 10"#);

    assert!(solver.solve().is_err());
}

#[test]
#[cfg(unix)]
fn test_missing_program() {
    let mut solver =
        ExternalSolver::new(ExternalConfig::new("satlink-no-such-solver-on-path"));

    match solver.solve() {
        Err(SolverError::Spawn { .. }) => (),
        other => panic!("expected Spawn error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_clear_rolls_stats() {
    // `clear` folds session counters into the totals and re-pins the
    // true variable.
    let mut solver = ExternalSolver::new(ExternalConfig::minisat());

    solver.add_variable();
    solver.add_clause(&[TRUE, 2]);
    let before = solver.stats();
    assert_eq!(before.session_variables, 2);
    assert_eq!(before.session_clauses, 2);

    solver.clear();
    let after = solver.stats();
    assert_eq!(after.total_variables, 2);
    assert_eq!(after.total_clauses, 2);
    // The bootstrap variable and unit clause of the fresh session.
    assert_eq!(after.session_variables, 1);
    assert_eq!(after.session_clauses, 1);
}
