//! Structured error kinds at the public core boundary.
//!
//! Mirrors the five error kinds distinguished by the reference
//! implementation (`exceptions/exceptions.hpp`): a failed I/O open, a
//! malformed file, a bad argument, a lifecycle violation, and an
//! unsatisfiable concurrency request.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
	#[error("file does not exist: {0}")]
	FileDoesNotExist(PathBuf),
	#[error("wrong file format: {0}")]
	WrongFileFormat(String),
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	#[error("logic failure: {0}")]
	LogicFailure(String),
	#[error("runtime unsupported: {0}")]
	RuntimeUnsupported(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
