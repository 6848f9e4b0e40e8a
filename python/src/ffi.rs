//! Python-facing wrappers. Batches run with the GIL released.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyValueError};
use pyo3::prelude::*;
use tracing_subscriber::EnvFilter;

use envelock_core::config::{BatchConfig, BatchPlan};
use envelock_core::constants::{DEFAULT_JOURNAL_ROTATION, DEFAULT_KEY_ALIAS};
use envelock_core::executor::ExecutionContext;
use envelock_core::journal::BatchJournal;
use envelock_core::keystore::{KeyStore, PemKeyStore};
use envelock_core::result::{ExecutionResult, FileResult};
use envelock_core::transform::Operation;
use envelock_core::types::BatchError;
use envelock_core::utils;

create_exception!(envelock, EnvelockError, PyException);

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG` (default
/// `warn`). A no-op when the host already installed one.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn to_py_err(e: BatchError) -> PyErr {
    match e {
        BatchError::Validation(msg) => PyValueError::new_err(msg),
        other => EnvelockError::new_err(other.to_string()),
    }
}

#[pyclass(name = "FileResult", frozen, module = "envelock")]
#[derive(Clone)]
pub struct PyFileResult {
    #[pyo3(get)]
    success: bool,
    #[pyo3(get)]
    source_name: String,
    #[pyo3(get)]
    output_name: Option<String>,
    #[pyo3(get)]
    output_size: Option<u64>,
    #[pyo3(get)]
    error_message: Option<String>,
}

impl From<&FileResult> for PyFileResult {
    fn from(r: &FileResult) -> Self {
        Self {
            success: r.is_success(),
            source_name: r.source_name().to_string(),
            output_name: r.output_name().map(str::to_string),
            output_size: r.output_size(),
            error_message: r.error_message().map(str::to_string),
        }
    }
}

#[pymethods]
impl PyFileResult {
    fn __repr__(&self) -> String {
        match (&self.output_name, &self.error_message) {
            (Some(out), _) => format!("FileResult(ok, {:?} -> {:?})", self.source_name, out),
            (_, Some(err)) => format!("FileResult(failed, {:?}: {:?})", self.source_name, err),
            _ => format!("FileResult({:?})", self.source_name),
        }
    }
}

#[pyclass(name = "ExecutionResult", frozen, module = "envelock")]
pub struct PyExecutionResult {
    inner: ExecutionResult,
    operation: Operation,
}

#[pymethods]
impl PyExecutionResult {
    #[getter]
    fn total_files(&self) -> usize {
        self.inner.total_files()
    }

    #[getter]
    fn thread_pool_size(&self) -> usize {
        self.inner.thread_pool_size()
    }

    #[getter]
    fn success_count(&self) -> usize {
        self.inner.success_count()
    }

    #[getter]
    fn failure_count(&self) -> usize {
        self.inner.failure_count()
    }

    #[getter]
    fn results(&self) -> Vec<PyFileResult> {
        self.inner.results().iter().map(PyFileResult::from).collect()
    }

    fn summary_lines(&self) -> Vec<String> {
        self.inner.summary_lines(self.operation)
    }

    fn to_json(&self) -> PyResult<String> {
        self.inner
            .to_json(self.operation)
            .map_err(|e| EnvelockError::new_err(e.to_string()))
    }

    fn __len__(&self) -> usize {
        self.inner.results().len()
    }
}

struct BatchArgs {
    sources: Vec<PathBuf>,
    key_dir: PathBuf,
    alias: String,
    destination: Option<PathBuf>,
    workers: Option<usize>,
    timeout_secs: Option<f64>,
    journal: Option<PathBuf>,
}

fn run_batch(py: Python<'_>, args: BatchArgs, operation: Operation) -> PyResult<PyExecutionResult> {
    let mut config = BatchConfig::default();
    config.destination_dir = args.destination;
    config.workers = args.workers;
    if let Some(secs) = args.timeout_secs {
        config.timeout = match Duration::try_from_secs_f64(secs) {
            Ok(timeout) if !timeout.is_zero() => timeout,
            _ => return Err(PyValueError::new_err("timeout_secs must be a positive, representable number")),
        };
    }

    let inner = py
        .allow_threads(move || -> Result<ExecutionResult, BatchError> {
            let plan = BatchPlan::new(&args.sources, &config);
            plan.validate()?;

            let mut ctx = ExecutionContext::new(config);
            if let Some(path) = &args.journal {
                let journal = BatchJournal::open(path, DEFAULT_JOURNAL_ROTATION)
                    .map_err(|e| BatchError::Validation(format!("cannot open journal {}: {e}", path.display())))?;
                ctx = ctx.with_events(Arc::new(journal));
            }

            let store = PemKeyStore::new(&args.key_dir);
            match operation {
                Operation::Encrypt => envelock_core::encrypt_files(&plan, &store, &args.alias, &ctx),
                Operation::Decrypt => envelock_core::decrypt_files(&plan, &store, &args.alias, &ctx),
            }
        })
        .map_err(to_py_err)?;

    Ok(PyExecutionResult { inner, operation })
}

/// Encrypt `sources` for the public key `<key_dir>/<alias>.pub.pem`.
#[pyfunction]
#[pyo3(signature = (sources, key_dir, alias=DEFAULT_KEY_ALIAS.to_string(), destination=None, workers=None, timeout_secs=None, journal=None))]
#[allow(clippy::too_many_arguments)]
fn encrypt_files(
    py: Python<'_>,
    sources: Vec<PathBuf>,
    key_dir: PathBuf,
    alias: String,
    destination: Option<PathBuf>,
    workers: Option<usize>,
    timeout_secs: Option<f64>,
    journal: Option<PathBuf>,
) -> PyResult<PyExecutionResult> {
    let args = BatchArgs { sources, key_dir, alias, destination, workers, timeout_secs, journal };
    run_batch(py, args, Operation::Encrypt)
}

/// Decrypt `.rslocked` `sources` with the private key `<key_dir>/<alias>.pem`.
#[pyfunction]
#[pyo3(signature = (sources, key_dir, alias=DEFAULT_KEY_ALIAS.to_string(), destination=None, workers=None, timeout_secs=None, journal=None))]
#[allow(clippy::too_many_arguments)]
fn decrypt_files(
    py: Python<'_>,
    sources: Vec<PathBuf>,
    key_dir: PathBuf,
    alias: String,
    destination: Option<PathBuf>,
    workers: Option<usize>,
    timeout_secs: Option<f64>,
    journal: Option<PathBuf>,
) -> PyResult<PyExecutionResult> {
    let args = BatchArgs { sources, key_dir, alias, destination, workers, timeout_secs, journal };
    run_batch(py, args, Operation::Decrypt)
}

/// Whether `<key_dir>` holds a usable keypair for `alias`.
#[pyfunction]
#[pyo3(signature = (key_dir, alias=DEFAULT_KEY_ALIAS.to_string()))]
fn has_keypair(key_dir: PathBuf, alias: String) -> bool {
    PemKeyStore::new(key_dir).contains(&alias)
}

#[pyfunction]
fn format_bytes(bytes: u64) -> String {
    utils::format_bytes(bytes)
}

pub fn register(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("EnvelockError", py.get_type_bound::<EnvelockError>())?;
    m.add("LOCKED_SUFFIX", envelock_core::constants::LOCKED_SUFFIX)?;
    m.add_class::<PyFileResult>()?;
    m.add_class::<PyExecutionResult>()?;
    m.add_function(wrap_pyfunction!(encrypt_files, m)?)?;
    m.add_function(wrap_pyfunction!(decrypt_files, m)?)?;
    m.add_function(wrap_pyfunction!(has_keypair, m)?)?;
    m.add_function(wrap_pyfunction!(format_bytes, m)?)?;
    Ok(())
}
