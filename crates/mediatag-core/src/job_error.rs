//! Errors raised while polling an extraction job.
//!
//! A recoverable error counts as one spent poll attempt and the job is polled
//! again on the next interval. An unrecoverable error fails the job at once.

use std::fmt;

#[derive(Debug)]
pub struct JobError {
    inner: anyhow::Error,
    recoverable: bool,
}

impl JobError {
    /// The job is marked FAILED without further polling.
    ///
    /// Use for provider responses that will not change on retry, such as an
    /// unknown job id or a missing transcript location.
    pub fn unrecoverable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            recoverable: false,
        }
    }

    /// The poll is retried on the next interval.
    pub fn recoverable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            recoverable: true,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for JobError {
    /// Plain errors (network, throttling) are retried.
    fn from(err: anyhow::Error) -> Self {
        Self::recoverable(err)
    }
}

pub trait JobResultExt<T> {
    /// Mark this result as unrecoverable on error
    fn unrecoverable(self) -> Result<T, JobError>;
}

impl<T, E: Into<anyhow::Error>> JobResultExt<T> for Result<T, E> {
    fn unrecoverable(self) -> Result<T, JobError> {
        self.map_err(|e| JobError::unrecoverable(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_conversion_is_recoverable() {
        let err: JobError = anyhow::anyhow!("throttled").into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_result_ext_marks_unrecoverable() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("job not found"));
        let err = result.unrecoverable().unwrap_err();
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("job not found"));
    }
}
