//! envelock-python
//!
//! Python bindings for envelock-core (PyO3).

use pyo3::prelude::*;

mod ffi;

/// Python module entry point
#[pymodule]
fn envelock(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    ffi::init_logging();
    ffi::register(py, m)?;
    Ok(())
}
